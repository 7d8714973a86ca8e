//! [`OAuthProvider`] implementation over Google's token endpoints.

use crate::google;
use async_trait::async_trait;
use letterbox_types::{LetterboxError, OAuthProvider, TokenPair, traits::Result};

/// Talks to Google's OAuth endpoints with the configured client credentials.
pub struct GoogleOAuthClient {
    http: rquest::Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    token_url: String,
    revoke_url: String,
}

impl GoogleOAuthClient {
    #[must_use]
    pub fn new(
        http: rquest::Client,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Self {
        Self {
            http,
            client_id,
            client_secret,
            token_url: google::TOKEN_URL.to_string(),
            revoke_url: google::REVOKE_URL.to_string(),
        }
    }

    /// Point the client at different token and revocation endpoints.
    #[must_use]
    pub fn with_endpoints(
        mut self,
        token_url: impl Into<String>,
        revoke_url: impl Into<String>,
    ) -> Self {
        self.token_url = token_url.into();
        self.revoke_url = revoke_url.into();
        self
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok((id, secret)),
            _ => Err(LetterboxError::Config(
                "google.client_id and google.client_secret must be set".into(),
            )),
        }
    }

    async fn post_form(&self, url: &str, params: &[(String, String)]) -> Result<(u16, String)> {
        let resp = self.http.post(url).form(params).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok((status, body))
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

#[async_trait]
impl OAuthProvider for GoogleOAuthClient {
    fn consent_url(&self, redirect_uri: &str, force_reconsent: bool) -> Result<String> {
        let (client_id, _) = self.credentials()?;
        Ok(google::build_auth_url(client_id, redirect_uri, force_reconsent))
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenPair> {
        let (client_id, client_secret) = self.credentials()?;
        let params = google::token_form_params(client_id, client_secret, code, redirect_uri);
        let (status, body) = self
            .post_form(&self.token_url, &params)
            .await
            .map_err(|e| LetterboxError::CodeExchangeFailed(e.to_string()))?;
        if !is_success(status) {
            tracing::warn!(status, "authorization code exchange rejected");
            return Err(LetterboxError::CodeExchangeFailed(format!(
                "token endpoint returned {status}: {body}"
            )));
        }
        let json: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            LetterboxError::CodeExchangeFailed(format!("failed to parse token response: {e}"))
        })?;
        google::parse_token_response(&json)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let (client_id, client_secret) = self.credentials()?;
        let params = google::refresh_form_params(client_id, client_secret, refresh_token);
        let (status, body) = self.post_form(&self.token_url, &params).await?;
        if !is_success(status) {
            return Err(LetterboxError::Upstream { status, body });
        }
        let json: serde_json::Value = serde_json::from_str(&body)?;
        google::parse_token_response(&json)
    }

    async fn revoke(&self, token: &str) -> Result<()> {
        let params = vec![("token".to_string(), token.to_string())];
        let (status, body) = self.post_form(&self.revoke_url, &params).await?;
        if !is_success(status) {
            return Err(LetterboxError::Upstream { status, body });
        }
        Ok(())
    }
}
