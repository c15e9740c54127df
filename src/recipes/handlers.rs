use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::extractors::CurrentUser,
    images,
    recipes::{
        dto::{
            parse_id_list, CreateRecipeRequest, ImageUploadResponse, ListRecipesQuery,
            PatchRecipeRequest, RecipeDetail, RecipeListItem,
        },
        repo, service,
    },
    state::AppState,
};

const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/:id",
            get(get_recipe)
                .put(put_recipe)
                .patch(patch_recipe)
                .delete(delete_recipe),
        )
        .route(
            "/recipes/:id/upload-image",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
}

#[instrument(skip(state, user))]
pub async fn list_recipes(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListRecipesQuery>,
) -> Result<Json<Vec<RecipeListItem>>, (StatusCode, String)> {
    let tag_ids = match query.tags.as_deref() {
        Some(raw) => Some(parse_id_list(raw).map_err(bad_request)?),
        None => None,
    };
    let ingredient_ids = match query.ingredients.as_deref() {
        Some(raw) => Some(parse_id_list(raw).map_err(bad_request)?),
        None => None,
    };

    let recipes = repo::list_by_user(
        &state.db,
        user.id,
        tag_ids.as_deref(),
        ingredient_ids.as_deref(),
    )
    .await
    .map_err(internal)?;

    let items = recipes
        .into_iter()
        .map(|r| RecipeListItem {
            id: r.id,
            title: r.title,
            time_minutes: r.time_minutes,
            price: r.price,
            link: r.link,
        })
        .collect();
    Ok(Json(items))
}

#[instrument(skip(state, user, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<RecipeDetail>), (StatusCode, String)> {
    if payload.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title must not be empty".into()));
    }

    let recipe = service::create_recipe(&state, user.id, payload)
        .await
        .map_err(internal)?;
    info!(user_id = %user.id, recipe_id = recipe.id, "recipe created");

    let detail = service::load_detail(&state, recipe).await.map_err(internal)?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[instrument(skip(state, user))]
pub async fn get_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<RecipeDetail>, (StatusCode, String)> {
    let recipe = repo::find_by_id(&state.db, user.id, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(user.id, id))?;

    let detail = service::load_detail(&state, recipe).await.map_err(internal)?;
    Ok(Json(detail))
}

#[instrument(skip(state, user, payload))]
pub async fn put_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<CreateRecipeRequest>,
) -> Result<Json<RecipeDetail>, (StatusCode, String)> {
    if payload.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title must not be empty".into()));
    }

    let recipe = service::replace_recipe(&state, user.id, id, payload)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(user.id, id))?;

    let detail = service::load_detail(&state, recipe).await.map_err(internal)?;
    Ok(Json(detail))
}

#[instrument(skip(state, user, payload))]
pub async fn patch_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<PatchRecipeRequest>,
) -> Result<Json<RecipeDetail>, (StatusCode, String)> {
    let existing = repo::find_by_id(&state.db, user.id, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(user.id, id))?;

    if let Some(title) = payload.title.as_deref() {
        if title.trim().is_empty() {
            return Err((StatusCode::BAD_REQUEST, "Title must not be empty".into()));
        }
    }

    let recipe = service::patch_recipe(&state, existing, payload)
        .await
        .map_err(internal)?;

    let detail = service::load_detail(&state, recipe).await.map_err(internal)?;
    Ok(Json(detail))
}

#[instrument(skip(state, user))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = repo::delete(&state.db, user.id, id).await.map_err(internal)?;
    if !deleted {
        return Err(not_found(user.id, id));
    }
    info!(user_id = %user.id, recipe_id = id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /recipes/:id/upload-image — multipart with a single `image` field.
/// The payload must sniff as a real image; the stored object replaces any
/// previous one.
#[instrument(skip(state, user, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<ImageUploadResponse>, (StatusCode, String)> {
    let recipe = repo::find_by_id(&state.db, user.id, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(user.id, id))?;

    let mut image: Option<Bytes> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("image") {
            let data = field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
            image = Some(data);
        }
    }
    let Some(data) = image else {
        return Err((StatusCode::BAD_REQUEST, "image field is required".into()));
    };

    let format = images::validate(&data).map_err(|e| {
        warn!(user_id = %user.id, recipe_id = id, error = %e, "image rejected");
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;

    let url = service::store_image(&state, user.id, recipe.id, data, format)
        .await
        .map_err(internal)?;

    info!(user_id = %user.id, recipe_id = id, "image uploaded");
    Ok(Json(ImageUploadResponse {
        id: recipe.id,
        image: url,
    }))
}

fn not_found(user_id: uuid::Uuid, recipe_id: i64) -> (StatusCode, String) {
    warn!(%user_id, recipe_id, "recipe not found for user");
    (StatusCode::NOT_FOUND, "Recipe not found".to_string())
}

fn bad_request(message: String) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, message)
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
