use serde::{Deserialize, Serialize};
use sqlx::{types::Decimal, FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub user_id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub description: Option<String>,
    pub link: Option<String>,
    pub image_key: Option<String>,
    pub created_at: OffsetDateTime,
}

const RECIPE_COLUMNS: &str =
    "id, user_id, title, time_minutes, price, description, link, image_key, created_at";

/// List the user's recipes, newest first. When ID filters are present a
/// recipe must match at least one ID per supplied dimension; the EXISTS
/// subqueries keep each recipe unique in the result.
pub async fn list_by_user(
    db: &PgPool,
    user_id: Uuid,
    tag_ids: Option<&[i64]>,
    ingredient_ids: Option<&[i64]>,
) -> anyhow::Result<Vec<Recipe>> {
    let rows = sqlx::query_as::<_, Recipe>(&format!(
        "SELECT {RECIPE_COLUMNS}
         FROM recipes r
         WHERE r.user_id = $1
           AND ($2::bigint[] IS NULL OR EXISTS (
                SELECT 1 FROM recipe_tags rt
                WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)))
           AND ($3::bigint[] IS NULL OR EXISTS (
                SELECT 1 FROM recipe_ingredients ri
                WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)))
         ORDER BY r.id DESC"
    ))
    .bind(user_id)
    .bind(tag_ids.map(|ids| ids.to_vec()))
    .bind(ingredient_ids.map(|ids| ids.to_vec()))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Fetch one of the user's recipes; someone else's recipe is indistinguishable
/// from a missing one.
pub async fn find_by_id(db: &PgPool, user_id: Uuid, id: i64) -> anyhow::Result<Option<Recipe>> {
    let row = sqlx::query_as::<_, Recipe>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    title: &str,
    time_minutes: i32,
    price: Decimal,
    description: Option<&str>,
    link: Option<&str>,
) -> anyhow::Result<Recipe> {
    let row = sqlx::query_as::<_, Recipe>(&format!(
        "INSERT INTO recipes (user_id, title, time_minutes, price, description, link)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {RECIPE_COLUMNS}"
    ))
    .bind(user_id)
    .bind(title)
    .bind(time_minutes)
    .bind(price)
    .bind(description)
    .bind(link)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

#[allow(clippy::too_many_arguments)]
pub async fn update(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    id: i64,
    title: &str,
    time_minutes: i32,
    price: Decimal,
    description: Option<&str>,
    link: Option<&str>,
) -> anyhow::Result<Option<Recipe>> {
    let row = sqlx::query_as::<_, Recipe>(&format!(
        "UPDATE recipes
         SET title = $3, time_minutes = $4, price = $5, description = $6, link = $7
         WHERE id = $1 AND user_id = $2
         RETURNING {RECIPE_COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .bind(title)
    .bind(time_minutes)
    .bind(price)
    .bind(description)
    .bind(link)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, user_id: Uuid, id: i64) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Swap in a new image object key, returning the previous one if any.
pub async fn set_image_key(
    db: &PgPool,
    user_id: Uuid,
    id: i64,
    key: &str,
) -> anyhow::Result<Option<String>> {
    let prior = sqlx::query_scalar::<_, Option<String>>(
        r#"
        UPDATE recipes r
        SET image_key = $3
        FROM (SELECT id, image_key FROM recipes WHERE id = $1 AND user_id = $2) old
        WHERE r.id = old.id
        RETURNING old.image_key
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(key)
    .fetch_one(db)
    .await?;
    Ok(prior)
}
