//! `/drafts` routes. Ownership is enforced by the [`letterbox_types::DraftStore`].
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use letterbox_types::{Draft, DraftInput, DraftUpdate, Principal};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::{
    AppState,
    error::{ApiError, JsonBody},
};

pub async fn list_drafts(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<Draft>>, ApiError> {
    Ok(Json(state.drafts.list(&principal).await?))
}

pub async fn get_draft(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Draft>, ApiError> {
    Ok(Json(state.drafts.get(&principal, &id).await?))
}

pub async fn create_draft(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    JsonBody(input): JsonBody<DraftInput>,
) -> Result<Json<Value>, ApiError> {
    let draft = state.drafts.create(&principal, input).await?;
    Ok(Json(json!({ "success": true, "id": draft.id })))
}

pub async fn update_draft(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<DraftUpdate>,
) -> Result<Json<Value>, ApiError> {
    let draft = state.drafts.update(&principal, &id, update).await?;
    Ok(Json(json!({ "success": true, "updatedAt": draft.updated_at })))
}

pub async fn delete_draft(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.drafts.delete(&principal, &id).await?;
    Ok(Json(json!({ "success": true })))
}
