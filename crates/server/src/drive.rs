//! `/drive` routes.
use axum::{Extension, Json, extract::State};
use letterbox_drive::{ExportReceipt, ExportRequest};
use letterbox_types::{ExportRecord, Principal, RemoteDocument};
use std::sync::Arc;

use crate::{
    AppState,
    error::{ApiError, JsonBody},
};

/// POST /drive/save
pub async fn save_to_drive(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    JsonBody(request): JsonBody<ExportRequest>,
) -> Result<Json<ExportReceipt>, ApiError> {
    Ok(Json(state.exports.export(&principal, request).await?))
}

/// GET /drive/files
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<RemoteDocument>>, ApiError> {
    let page_size = state.config.export.list_page_size;
    Ok(Json(state.exports.list_remote(&principal, page_size).await?))
}

/// GET /drive/exports
pub async fn list_exports(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<ExportRecord>>, ApiError> {
    Ok(Json(state.exports.list_exports(&principal).await?))
}
