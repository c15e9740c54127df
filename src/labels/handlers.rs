use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    auth::extractors::CurrentUser,
    labels::{
        dto::{LabelResponse, ListFilter, RenameRequest},
        repo::{self, LabelKind},
    },
    state::AppState,
};

pub fn tag_routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags))
        .route(
            "/tags/:id",
            put(update_tag).patch(update_tag).delete(delete_tag),
        )
}

pub fn ingredient_routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list_ingredients))
        .route(
            "/ingredients/:id",
            put(update_ingredient)
                .patch(update_ingredient)
                .delete(delete_ingredient),
        )
}

// Thin per-kind wrappers over one shared contract.

#[instrument(skip(state, user))]
async fn list_tags(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<LabelResponse>>, (StatusCode, String)> {
    list_labels(state, LabelKind::Tag, user.id, filter).await
}

#[instrument(skip(state, user))]
async fn list_ingredients(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<LabelResponse>>, (StatusCode, String)> {
    list_labels(state, LabelKind::Ingredient, user.id, filter).await
}

#[instrument(skip(state, user, payload))]
async fn update_tag(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<RenameRequest>,
) -> Result<Json<LabelResponse>, (StatusCode, String)> {
    update_label(state, LabelKind::Tag, user.id, id, payload).await
}

#[instrument(skip(state, user, payload))]
async fn update_ingredient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<RenameRequest>,
) -> Result<Json<LabelResponse>, (StatusCode, String)> {
    update_label(state, LabelKind::Ingredient, user.id, id, payload).await
}

#[instrument(skip(state, user))]
async fn delete_tag(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    delete_label(state, LabelKind::Tag, user.id, id).await
}

#[instrument(skip(state, user))]
async fn delete_ingredient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    delete_label(state, LabelKind::Ingredient, user.id, id).await
}

async fn list_labels(
    state: AppState,
    kind: LabelKind,
    user_id: uuid::Uuid,
    filter: ListFilter,
) -> Result<Json<Vec<LabelResponse>>, (StatusCode, String)> {
    let labels = repo::list(&state.db, kind, user_id, filter.assigned_only != 0)
        .await
        .map_err(|e| {
            error!(error = %e, ?kind, "label list failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    Ok(Json(labels.into_iter().map(LabelResponse::from).collect()))
}

async fn update_label(
    state: AppState,
    kind: LabelKind,
    user_id: uuid::Uuid,
    id: i64,
    payload: RenameRequest,
) -> Result<Json<LabelResponse>, (StatusCode, String)> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name must not be empty".into()));
    }

    let label = repo::rename(&state.db, kind, user_id, id, name)
        .await
        .map_err(|e| {
            error!(error = %e, ?kind, id, "label rename failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or_else(|| {
            warn!(?kind, id, "label not found for user");
            (StatusCode::NOT_FOUND, "Not found".to_string())
        })?;

    Ok(Json(label.into()))
}

async fn delete_label(
    state: AppState,
    kind: LabelKind,
    user_id: uuid::Uuid,
    id: i64,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = repo::delete(&state.db, kind, user_id, id)
        .await
        .map_err(|e| {
            error!(error = %e, ?kind, id, "label delete failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    if !deleted {
        warn!(?kind, id, "label not found for user");
        return Err((StatusCode::NOT_FOUND, "Not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}
