use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Tags and ingredients share one schema and one contract; the kind picks
/// the table pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Tag,
    Ingredient,
}

impl LabelKind {
    pub fn table(self) -> &'static str {
        match self {
            LabelKind::Tag => "tags",
            LabelKind::Ingredient => "ingredients",
        }
    }

    pub fn link_table(self) -> &'static str {
        match self {
            LabelKind::Tag => "recipe_tags",
            LabelKind::Ingredient => "recipe_ingredients",
        }
    }

    pub fn link_column(self) -> &'static str {
        match self {
            LabelKind::Tag => "tag_id",
            LabelKind::Ingredient => "ingredient_id",
        }
    }
}

/// A user-owned tag or ingredient row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Label {
    pub id: i64,
    pub user_id: Uuid,
    pub name: String,
}

/// List the user's labels, reverse-alphabetical. With `assigned_only`, only
/// labels linked to at least one recipe; the EXISTS keeps rows unique.
pub async fn list(
    db: &PgPool,
    kind: LabelKind,
    user_id: Uuid,
    assigned_only: bool,
) -> anyhow::Result<Vec<Label>> {
    let sql = format!(
        "SELECT id, user_id, name FROM {t}
         WHERE user_id = $1
           AND ($2 = FALSE OR EXISTS (
                SELECT 1 FROM {link} l WHERE l.{col} = {t}.id))
         ORDER BY name DESC",
        t = kind.table(),
        link = kind.link_table(),
        col = kind.link_column(),
    );
    let rows = sqlx::query_as::<_, Label>(&sql)
        .bind(user_id)
        .bind(assigned_only)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

/// Rename a label the user owns. `None` when it does not exist for them.
pub async fn rename(
    db: &PgPool,
    kind: LabelKind,
    user_id: Uuid,
    id: i64,
    name: &str,
) -> anyhow::Result<Option<Label>> {
    let sql = format!(
        "UPDATE {t} SET name = $3 WHERE id = $1 AND user_id = $2
         RETURNING id, user_id, name",
        t = kind.table(),
    );
    let row = sqlx::query_as::<_, Label>(&sql)
        .bind(id)
        .bind(user_id)
        .bind(name)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

/// Delete a label the user owns; recipe links go with it via cascade.
pub async fn delete(db: &PgPool, kind: LabelKind, user_id: Uuid, id: i64) -> anyhow::Result<bool> {
    let sql = format!(
        "DELETE FROM {t} WHERE id = $1 AND user_id = $2",
        t = kind.table(),
    );
    let result = sqlx::query(&sql).bind(id).bind(user_id).execute(db).await?;
    Ok(result.rows_affected() > 0)
}

/// Reuse the user's label with this exact name, or create it. Per-user
/// scope only; two users each get their own "Dinner".
pub async fn get_or_create(
    tx: &mut Transaction<'_, Postgres>,
    kind: LabelKind,
    user_id: Uuid,
    name: &str,
) -> anyhow::Result<Label> {
    let select = format!(
        "SELECT id, user_id, name FROM {t}
         WHERE user_id = $1 AND name = $2
         LIMIT 1",
        t = kind.table(),
    );
    if let Some(existing) = sqlx::query_as::<_, Label>(&select)
        .bind(user_id)
        .bind(name)
        .fetch_optional(&mut **tx)
        .await?
    {
        return Ok(existing);
    }

    let insert = format!(
        "INSERT INTO {t} (user_id, name) VALUES ($1, $2)
         RETURNING id, user_id, name",
        t = kind.table(),
    );
    let created = sqlx::query_as::<_, Label>(&insert)
        .bind(user_id)
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;
    Ok(created)
}

/// Labels linked to a recipe, reverse-alphabetical.
pub async fn for_recipe(db: &PgPool, kind: LabelKind, recipe_id: i64) -> anyhow::Result<Vec<Label>> {
    let sql = format!(
        "SELECT t.id, t.user_id, t.name
         FROM {t} t
         JOIN {link} l ON l.{col} = t.id
         WHERE l.recipe_id = $1
         ORDER BY t.name DESC",
        t = kind.table(),
        link = kind.link_table(),
        col = kind.link_column(),
    );
    let rows = sqlx::query_as::<_, Label>(&sql)
        .bind(recipe_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

/// Replace a recipe's linked label set with the given IDs.
pub async fn replace_links(
    tx: &mut Transaction<'_, Postgres>,
    kind: LabelKind,
    recipe_id: i64,
    label_ids: &[i64],
) -> anyhow::Result<()> {
    let clear = format!(
        "DELETE FROM {link} WHERE recipe_id = $1",
        link = kind.link_table(),
    );
    sqlx::query(&clear).bind(recipe_id).execute(&mut **tx).await?;

    if label_ids.is_empty() {
        return Ok(());
    }

    let insert = format!(
        "INSERT INTO {link} (recipe_id, {col})
         SELECT $1, x FROM UNNEST($2::bigint[]) AS x
         ON CONFLICT DO NOTHING",
        link = kind.link_table(),
        col = kind.link_column(),
    );
    sqlx::query(&insert)
        .bind(recipe_id)
        .bind(label_ids)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_their_tables() {
        assert_eq!(LabelKind::Tag.table(), "tags");
        assert_eq!(LabelKind::Tag.link_table(), "recipe_tags");
        assert_eq!(LabelKind::Tag.link_column(), "tag_id");
        assert_eq!(LabelKind::Ingredient.table(), "ingredients");
        assert_eq!(LabelKind::Ingredient.link_table(), "recipe_ingredients");
        assert_eq!(LabelKind::Ingredient.link_column(), "ingredient_id");
    }
}
