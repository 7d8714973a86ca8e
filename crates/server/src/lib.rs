//! HTTP layer: axum router, authorization gate, route handlers, and error mapping.
//!
//! Public routes cover health, the OAuth consent round trip and token
//! hand-over from the browser. Everything else sits behind
//! [`gate::require_principal`], which injects the verified
//! [`letterbox_types::Principal`] as a request extension.

mod auth_routes;
mod drafts;
mod drive;
mod error;
pub mod gate;

pub use error::ApiError;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use letterbox_auth::{DelegatedAuthManager, IdentityVerifier};
use letterbox_config::Config;
use letterbox_drive::ExportPipeline;
use letterbox_types::{
    DocumentStore, DraftStore, ExportLog, OAuthProvider, TokenVault, now_millis,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

/// Whether persistent storage came up at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageStatus {
    Available,
    /// Running degraded; every storage call answers 503.
    Unavailable(String),
}

/// Shared application state passed to all route handlers.
pub struct AppState {
    pub config: Arc<Config>,
    /// Trust material is loaded once and never mutated.
    pub verifier: Arc<IdentityVerifier>,
    pub drafts: Arc<dyn DraftStore>,
    pub delegated: Arc<DelegatedAuthManager>,
    pub exports: Arc<ExportPipeline>,
    pub storage: StorageStatus,
}

impl AppState {
    /// Wire the components around one storage backend.
    pub fn new<S>(
        config: Config,
        verifier: IdentityVerifier,
        store: Arc<S>,
        oauth: Arc<dyn OAuthProvider>,
        documents: Arc<dyn DocumentStore>,
        storage: StorageStatus,
    ) -> Arc<Self>
    where
        S: TokenVault + DraftStore + ExportLog + 'static,
    {
        let delegated = Arc::new(
            DelegatedAuthManager::new(store.clone(), oauth)
                .with_default_redirect_uri(config.google.redirect_uri.clone()),
        );
        let exports = Arc::new(
            ExportPipeline::new(delegated.clone(), documents, store.clone())
                .with_share_publicly(config.export.share_publicly),
        );
        Arc::new(Self {
            config: Arc::new(config),
            verifier: Arc::new(verifier),
            drafts: store,
            delegated,
            exports,
            storage,
        })
    }
}

/// CORS for the configured browser origins.
///
/// A `*` entry allows every origin, and credentials are then not allowed.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    if origins.iter().any(|o| o.trim() == "*") {
        tracing::warn!("wildcard CORS origin configured; credentialed requests are disabled");
        return layer.allow_origin(AllowOrigin::any());
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

/// Build the full axum router.
///
/// Public:
/// - GET  /health
/// - GET  /auth/google-auth-url
/// - GET  /auth/google-callback     302 to the browser app with the code
/// - POST /auth/google-callback     exchange a code for tokens
/// - POST /auth/firebase-token
/// - POST /auth/tokens
///
/// Behind the gate:
/// - GET  /auth/profile, /auth/oauth-status
/// - POST /auth/clear-tokens, /auth/revoke-tokens
/// - GET/POST /drafts, GET/PUT/DELETE /drafts/{id}
/// - POST /drive/save, GET /drive/files, GET /drive/exports
pub fn make_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/auth/profile", get(auth_routes::profile))
        .route("/auth/oauth-status", get(auth_routes::oauth_status))
        .route("/auth/clear-tokens", post(auth_routes::clear_tokens))
        .route("/auth/revoke-tokens", post(auth_routes::revoke_tokens))
        .route(
            "/drafts",
            get(drafts::list_drafts).post(drafts::create_draft),
        )
        .route(
            "/drafts/{id}",
            get(drafts::get_draft)
                .put(drafts::update_draft)
                .delete(drafts::delete_draft),
        )
        .route("/drive/save", post(drive::save_to_drive))
        .route("/drive/files", get(drive::list_files))
        .route("/drive/exports", get(drive::list_exports))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            gate::require_principal,
        ));

    let cors = cors_layer(&state.config.cors.allowed_origins);

    Router::new()
        .route("/health", get(health))
        .route("/auth/google-auth-url", get(auth_routes::google_auth_url))
        .route(
            "/auth/google-callback",
            get(auth_routes::google_callback_redirect).post(auth_routes::exchange_code),
        )
        .route("/auth/firebase-token", post(auth_routes::store_browser_tokens))
        .route("/auth/tokens", post(auth_routes::store_tokens))
        .merge(protected)
        .with_state(state)
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (status, storage) = match &state.storage {
        StorageStatus::Available => ("ok", "available".to_string()),
        StorageStatus::Unavailable(reason) => ("degraded", format!("unavailable: {reason}")),
    };
    Json(json!({
        "status": status,
        "storage": storage,
        "timestamp": now_millis(),
    }))
}
