//! `/auth/*` routes: consent, code exchange, token storage and status.
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use letterbox_types::{LetterboxError, Principal, TokenPair, TokenState};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::{
    AppState,
    error::{ApiError, JsonBody},
};

/// Lifetime assumed for an access token handed over by the browser.
const BROWSER_TOKEN_TTL_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentQuery {
    redirect_uri: Option<String>,
    force: Option<String>,
}

/// GET /auth/google-auth-url
pub async fn google_auth_url(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ConsentQuery>,
) -> Result<Json<Value>, ApiError> {
    let force = matches!(q.force.as_deref(), Some("true" | "1"));
    let url = state
        .delegated
        .build_consent_url(q.redirect_uri.as_deref(), force)?;
    Ok(Json(json!({ "url": url })))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
}

/// GET /auth/google-callback
///
/// Hands the authorization code to the browser app.
pub async fn google_callback_redirect(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CallbackQuery>,
) -> Response {
    let params = match (q.code, q.error) {
        (Some(code), _) if !code.is_empty() => vec![("code", code)],
        (_, Some(error)) => vec![("error", error)],
        _ => vec![("error", "missing_code".to_string())],
    };
    let query = serde_urlencoded::to_string(&params).unwrap_or_default();
    let frontend = state.config.google.frontend_url.trim_end_matches('/');
    let location = format!("{frontend}/auth-callback?{query}");
    match HeaderValue::from_str(&location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(_) => ApiError(LetterboxError::Config(format!(
            "invalid frontend url: {frontend}"
        )))
        .into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// POST /auth/google-callback
///
/// Exchanges a code; the tokens are returned, not stored.
pub async fn exchange_code(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<ExchangeBody>,
) -> Result<Json<Value>, ApiError> {
    let code = body
        .code
        .ok_or_else(|| LetterboxError::Validation("authorization code is required".into()))?;
    let tokens = state
        .delegated
        .exchange_code(&code, body.redirect_uri.as_deref())
        .await?;
    Ok(Json(json!({ "success": true, "tokens": tokens })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserTokenBody {
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

/// POST /auth/firebase-token
///
/// Stores tokens obtained by the browser sign-in.
///
/// Trusts the caller-supplied `uid`.
pub async fn store_browser_tokens(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<BrowserTokenBody>,
) -> Result<Json<Value>, ApiError> {
    let uid = body
        .uid
        .filter(|u| !u.is_empty())
        .ok_or_else(|| LetterboxError::Validation("uid is required".into()))?;
    let mut tokens = TokenPair::default();
    if let Some(access) = body.access_token.filter(|t| !t.is_empty()) {
        tokens = TokenPair::new(access).with_expiry_in(BROWSER_TOKEN_TTL_SECS);
    }
    if let Some(id) = body.id_token.filter(|t| !t.is_empty()) {
        tokens = tokens.with_id_token(id);
    }
    if tokens.is_empty() {
        tracing::debug!(principal = %uid, "no browser tokens to store");
    } else {
        state.delegated.save_tokens(&uid, &tokens).await?;
        tracing::info!(principal = %uid, "stored browser-issued tokens");
    }
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreTokensBody {
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    tokens: Option<TokenPair>,
}

/// POST /auth/tokens
///
/// Merges a provider token object into the vault.
pub async fn store_tokens(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<StoreTokensBody>,
) -> Result<Json<Value>, ApiError> {
    let (Some(uid), Some(tokens)) = (body.uid.filter(|u| !u.is_empty()), body.tokens) else {
        return Err(LetterboxError::Validation("uid and tokens are required".into()).into());
    };
    state.delegated.save_tokens(&uid, &tokens).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /auth/profile
pub async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, ApiError> {
    let status = state.delegated.connection_status(&principal.id).await?;
    Ok(Json(json!({
        "uid": principal.id,
        "email": principal.email.unwrap_or_default(),
        "displayName": principal.display_name.unwrap_or_default(),
        "photoURL": principal.picture_url.unwrap_or_default(),
        "driveConnected": status.is_connected(),
    })))
}

/// GET /auth/oauth-status
pub async fn oauth_status(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, ApiError> {
    let status = state.delegated.connection_status(&principal.id).await?;
    let mut body = json!({
        "status": if status.is_connected() { "connected" } else { "not_connected" },
    });
    if status.state != TokenState::Missing
        && let Some(expiry) = status.expiry_epoch_millis
    {
        body["expiryDate"] = json!(expiry);
    }
    Ok(Json(body))
}

/// POST /auth/clear-tokens
pub async fn clear_tokens(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, ApiError> {
    state.delegated.disconnect(&principal.id).await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /auth/revoke-tokens
pub async fn revoke_tokens(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, ApiError> {
    state.delegated.revoke(&principal.id).await?;
    Ok(Json(json!({ "success": true })))
}
