//! Google OAuth 2.0 endpoints for delegated Drive access.
//!
//! Uses the authorization-code grant with offline access so a refresh token
//! is issued on first consent.

use letterbox_types::{LetterboxError, TokenPair, traits::Result};

/// Google OAuth 2.0 authorization endpoint.
pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth 2.0 token endpoint.
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google OAuth 2.0 revocation endpoint.
pub const REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";

/// OAuth scopes requested during authorization.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/drive.file",
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Build the consent URL.
///
/// `force_reconsent` adds `prompt=consent` so Google re-issues a refresh token
/// even for a user who has already granted access.
#[must_use]
pub fn build_auth_url(client_id: &str, redirect_uri: &str, force_reconsent: bool) -> String {
    let scope = SCOPES.join(" ");
    let mut params = vec![
        ("response_type", "code"),
        ("client_id", client_id),
        ("redirect_uri", redirect_uri),
        ("scope", scope.as_str()),
        ("access_type", "offline"),
        ("include_granted_scopes", "true"),
    ];
    if force_reconsent {
        params.push(("prompt", "consent"));
    }
    // Encoding a list of string pairs cannot fail.
    let query = serde_urlencoded::to_string(&params).unwrap_or_default();
    format!("{AUTH_URL}?{query}")
}

/// Build the form parameters for the code exchange request.
#[must_use]
pub fn token_form_params(
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> Vec<(String, String)> {
    vec![
        ("grant_type".into(), "authorization_code".into()),
        ("client_id".into(), client_id.into()),
        ("client_secret".into(), client_secret.into()),
        ("code".into(), code.into()),
        ("redirect_uri".into(), redirect_uri.into()),
    ]
}

/// Build the form parameters for the refresh request.
#[must_use]
pub fn refresh_form_params(
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Vec<(String, String)> {
    vec![
        ("grant_type".into(), "refresh_token".into()),
        ("client_id".into(), client_id.into()),
        ("client_secret".into(), client_secret.into()),
        ("refresh_token".into(), refresh_token.into()),
    ]
}

/// Parse the token endpoint JSON response into a [`TokenPair`].
///
/// `expires_in` (seconds) becomes an absolute expiry in epoch milliseconds.
///
/// # Errors
///
/// Returns an error if the response is missing the `access_token` field.
pub fn parse_token_response(json: &serde_json::Value) -> Result<TokenPair> {
    let access_token = json
        .get("access_token")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| LetterboxError::CodeExchangeFailed("missing access_token".into()))?;

    let mut token = TokenPair::new(access_token);
    if let Some(r) = json
        .get("refresh_token")
        .and_then(serde_json::Value::as_str)
    {
        token = token.with_refresh(r);
    }
    if let Some(id) = json.get("id_token").and_then(serde_json::Value::as_str) {
        token = token.with_id_token(id);
    }
    if let Some(exp) = json.get("expires_in").and_then(serde_json::Value::as_u64) {
        token = token.with_expiry_in(exp);
    }
    Ok(token)
}
