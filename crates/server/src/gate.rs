//! Authorization gate: the only place bearer credentials are verified.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use letterbox_auth::bearer_credential;
use std::sync::Arc;

use crate::{AppState, error::ApiError};

/// Verify the caller and attach their [`letterbox_types::Principal`] to the
/// request; short-circuit with 401 otherwise.
pub async fn require_principal(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = bearer_credential(req.headers())
        .and_then(|credential| state.verifier.verify(credential))
        .map_err(|e| {
            tracing::debug!(
                error = %e,
                authentication = e.is_authentication(),
                path = %req.uri().path(),
                "rejected request"
            );
            ApiError(e)
        })?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
