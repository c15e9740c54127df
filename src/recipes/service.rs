use anyhow::Context;
use bytes::Bytes;
use sqlx::{Postgres, Transaction};
use tracing::warn;
use uuid::Uuid;

use crate::images::ImageFormat;
use crate::labels::repo::{self as labels_repo, LabelKind};
use crate::recipes::dto::{CreateRecipeRequest, LabelName, PatchRecipeRequest, RecipeDetail};
use crate::recipes::repo::{self, Recipe};
use crate::state::AppState;

const IMAGE_URL_TTL_SECS: u64 = 30 * 60;

/// Resolve nested label names to IDs against the user's own labels,
/// creating the ones that do not exist yet. Blank names are dropped,
/// repeated names collapse to one ID.
async fn resolve_labels(
    tx: &mut Transaction<'_, Postgres>,
    kind: LabelKind,
    user_id: Uuid,
    names: &[LabelName],
) -> anyhow::Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(names.len());
    for entry in names {
        let name = entry.name.trim();
        if name.is_empty() {
            continue;
        }
        let label = labels_repo::get_or_create(tx, kind, user_id, name).await?;
        if !ids.contains(&label.id) {
            ids.push(label.id);
        }
    }
    Ok(ids)
}

/// Create a recipe together with its label links in one transaction.
pub async fn create_recipe(
    state: &AppState,
    user_id: Uuid,
    body: CreateRecipeRequest,
) -> anyhow::Result<Recipe> {
    let mut tx = state.db.begin().await.context("begin tx")?;

    let recipe = repo::insert(
        &mut tx,
        user_id,
        body.title.trim(),
        body.time_minutes,
        body.price,
        body.description.as_deref(),
        body.link.as_deref(),
    )
    .await?;

    let tag_ids = resolve_labels(&mut tx, LabelKind::Tag, user_id, &body.tags).await?;
    labels_repo::replace_links(&mut tx, LabelKind::Tag, recipe.id, &tag_ids).await?;

    let ingredient_ids =
        resolve_labels(&mut tx, LabelKind::Ingredient, user_id, &body.ingredients).await?;
    labels_repo::replace_links(&mut tx, LabelKind::Ingredient, recipe.id, &ingredient_ids).await?;

    tx.commit().await.context("commit tx")?;
    Ok(recipe)
}

/// Full update: every field takes the payload value and both label sets are
/// replaced (an omitted list clears the links).
pub async fn replace_recipe(
    state: &AppState,
    user_id: Uuid,
    recipe_id: i64,
    body: CreateRecipeRequest,
) -> anyhow::Result<Option<Recipe>> {
    let mut tx = state.db.begin().await.context("begin tx")?;

    let Some(recipe) = repo::update(
        &mut tx,
        user_id,
        recipe_id,
        body.title.trim(),
        body.time_minutes,
        body.price,
        body.description.as_deref(),
        body.link.as_deref(),
    )
    .await?
    else {
        return Ok(None);
    };

    let tag_ids = resolve_labels(&mut tx, LabelKind::Tag, user_id, &body.tags).await?;
    labels_repo::replace_links(&mut tx, LabelKind::Tag, recipe.id, &tag_ids).await?;

    let ingredient_ids =
        resolve_labels(&mut tx, LabelKind::Ingredient, user_id, &body.ingredients).await?;
    labels_repo::replace_links(&mut tx, LabelKind::Ingredient, recipe.id, &ingredient_ids).await?;

    tx.commit().await.context("commit tx")?;
    Ok(Some(recipe))
}

/// Partial update over an already-fetched recipe: supplied fields override,
/// supplied label lists replace the linked sets.
pub async fn patch_recipe(
    state: &AppState,
    existing: Recipe,
    body: PatchRecipeRequest,
) -> anyhow::Result<Recipe> {
    let mut tx = state.db.begin().await.context("begin tx")?;

    let title = body.title.unwrap_or(existing.title);
    let time_minutes = body.time_minutes.unwrap_or(existing.time_minutes);
    let price = body.price.unwrap_or(existing.price);
    let description = body.description.or(existing.description);
    let link = body.link.or(existing.link);

    let recipe = repo::update(
        &mut tx,
        existing.user_id,
        existing.id,
        title.trim(),
        time_minutes,
        price,
        description.as_deref(),
        link.as_deref(),
    )
    .await?
    .context("recipe vanished during update")?;

    if let Some(names) = body.tags {
        let ids = resolve_labels(&mut tx, LabelKind::Tag, recipe.user_id, &names).await?;
        labels_repo::replace_links(&mut tx, LabelKind::Tag, recipe.id, &ids).await?;
    }
    if let Some(names) = body.ingredients {
        let ids = resolve_labels(&mut tx, LabelKind::Ingredient, recipe.user_id, &names).await?;
        labels_repo::replace_links(&mut tx, LabelKind::Ingredient, recipe.id, &ids).await?;
    }

    tx.commit().await.context("commit tx")?;
    Ok(recipe)
}

/// Assemble the detail view: linked labels plus a presigned image URL.
pub async fn load_detail(state: &AppState, recipe: Recipe) -> anyhow::Result<RecipeDetail> {
    let tags = labels_repo::for_recipe(&state.db, LabelKind::Tag, recipe.id).await?;
    let ingredients = labels_repo::for_recipe(&state.db, LabelKind::Ingredient, recipe.id).await?;

    let image = match recipe.image_key.as_deref() {
        Some(key) => Some(presign_image(state, key).await?),
        None => None,
    };

    Ok(RecipeDetail {
        id: recipe.id,
        title: recipe.title,
        time_minutes: recipe.time_minutes,
        price: recipe.price,
        description: recipe.description,
        link: recipe.link,
        tags: tags.into_iter().map(Into::into).collect(),
        ingredients: ingredients.into_iter().map(Into::into).collect(),
        image,
    })
}

pub async fn presign_image(state: &AppState, key: &str) -> anyhow::Result<String> {
    state
        .storage
        .presign_get(key, IMAGE_URL_TTL_SECS)
        .await
        .with_context(|| format!("presign url for {}", key))
}

/// Store a validated image and point the recipe at it. The previous object,
/// if any, is deleted best-effort after the row is switched over.
pub async fn store_image(
    state: &AppState,
    user_id: Uuid,
    recipe_id: i64,
    body: Bytes,
    format: ImageFormat,
) -> anyhow::Result<String> {
    let key = format!("uploads/recipe/{}.{}", Uuid::new_v4(), format.ext());

    state
        .storage
        .put_object(&key, body, format.content_type())
        .await
        .with_context(|| format!("put_object {}", key))?;

    let prior = repo::set_image_key(&state.db, user_id, recipe_id, &key).await?;

    if let Some(old_key) = prior {
        if let Err(e) = state.storage.delete_object(&old_key).await {
            warn!(error = %e, key = %old_key, "failed to delete replaced image");
        }
    }

    presign_image(state, &key).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images;

    #[tokio::test]
    async fn presign_uses_storage_client() {
        let state = AppState::fake();
        let url = presign_image(&state, "uploads/recipe/abc.jpg").await.unwrap();
        assert!(url.contains("uploads/recipe/abc.jpg"));
    }

    #[test]
    fn image_keys_follow_upload_layout() {
        let format = images::validate(&[0xFF, 0xD8, 0xFF, 0xE1]).unwrap();
        let key = format!("uploads/recipe/{}.{}", Uuid::new_v4(), format.ext());
        assert!(key.starts_with("uploads/recipe/"));
        assert!(key.ends_with(".jpg"));
    }
}
