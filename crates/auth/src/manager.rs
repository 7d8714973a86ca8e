//! Lifecycle of per-principal delegated Google tokens.
//!
//! Responsibilities:
//! - Load tokens from a [`TokenVault`].
//! - Detect expiration and perform exactly one refresh exchange per call.
//! - Persist refreshed tokens before handing out a client.
//! - Report "re-consent needed" as a value, never as a provider error.
use letterbox_types::{
    AuthorizedClient, LetterboxError, OAuthProvider, TokenPair, TokenState, TokenVault,
    now_millis, traits::Result,
};
use std::sync::Arc;

/// Lifetime assumed when a refresh response does not report `expires_in`.
const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 3600;

/// Why the user has to go through the consent screen again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentReason {
    /// Nothing usable is stored for the principal.
    NotConnected,
    /// The access token expired and there is no refresh token.
    NoRefreshToken,
    /// The provider rejected the refresh exchange.
    RefreshFailed(String),
}

/// Outcome of [`DelegatedAuthManager::get_client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delegation {
    Authorized(AuthorizedClient),
    NeedsConsent(ConsentReason),
}

/// Snapshot of a principal's stored delegation, without touching the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: TokenState,
    pub expiry_epoch_millis: Option<i64>,
}

impl ConnectionStatus {
    /// `true` when a client can be produced without re-consent.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self.state, TokenState::Valid | TokenState::Expired)
    }
}

pub struct DelegatedAuthManager {
    vault: Arc<dyn TokenVault>,
    oauth: Arc<dyn OAuthProvider>,
    default_redirect_uri: Option<String>,
}

impl DelegatedAuthManager {
    pub fn new(vault: Arc<dyn TokenVault>, oauth: Arc<dyn OAuthProvider>) -> Self {
        Self {
            vault,
            oauth,
            default_redirect_uri: None,
        }
    }

    /// Redirect URI used when a caller does not supply one.
    #[must_use]
    pub fn with_default_redirect_uri(mut self, redirect_uri: Option<String>) -> Self {
        self.default_redirect_uri = redirect_uri;
        self
    }

    fn redirect_uri<'a>(&'a self, requested: Option<&'a str>) -> Result<&'a str> {
        requested
            .filter(|r| !r.is_empty())
            .or(self.default_redirect_uri.as_deref())
            .ok_or_else(|| {
                LetterboxError::Config(
                    "no redirectUri supplied and google.redirect_uri is not configured".into(),
                )
            })
    }

    /// Produce a client for `principal_id`, refreshing an expired token once.
    ///
    /// # Errors
    ///
    /// Only storage faults are errors; every consent problem is reported as
    /// [`Delegation::NeedsConsent`].
    pub async fn get_client(&self, principal_id: &str) -> Result<Delegation> {
        let Some(stored) = self.vault.read(principal_id).await? else {
            return Ok(Delegation::NeedsConsent(ConsentReason::NotConnected));
        };

        match stored.state_at(now_millis()) {
            TokenState::Missing => Ok(Delegation::NeedsConsent(ConsentReason::NotConnected)),
            TokenState::Invalid => {
                tracing::debug!(principal = %principal_id, "token expired without refresh token");
                Ok(Delegation::NeedsConsent(ConsentReason::NoRefreshToken))
            }
            TokenState::Valid => Ok(authorized(principal_id, &stored, false)
                .map_or(Delegation::NeedsConsent(ConsentReason::NotConnected), Delegation::Authorized)),
            TokenState::Expired => self.refresh(principal_id, stored).await,
        }
    }

    async fn refresh(&self, principal_id: &str, stored: TokenPair) -> Result<Delegation> {
        let Some(refresh_token) = stored.refresh_token.as_deref() else {
            return Ok(Delegation::NeedsConsent(ConsentReason::NoRefreshToken));
        };

        let patch = match self.oauth.refresh(refresh_token).await {
            Ok(patch) if patch.access_token.is_some() => patch,
            Ok(_) => {
                return Ok(Delegation::NeedsConsent(ConsentReason::RefreshFailed(
                    "refresh response carried no access token".into(),
                )));
            }
            Err(e) => {
                tracing::warn!(principal = %principal_id, error = %e, "token refresh failed");
                return Ok(Delegation::NeedsConsent(ConsentReason::RefreshFailed(
                    e.to_string(),
                )));
            }
        };

        // The stored expiry is already past; never keep it for the new token.
        let patch = if patch.expiry_epoch_millis.is_some() {
            patch
        } else {
            patch.with_expiry_in(DEFAULT_ACCESS_TOKEN_TTL_SECS)
        };
        self.vault.upsert(principal_id, &patch).await?;
        let merged = stored.merged(&patch);
        tracing::info!(principal = %principal_id, "refreshed delegated token");
        Ok(authorized(principal_id, &merged, true)
            .map_or(Delegation::NeedsConsent(ConsentReason::NotConnected), Delegation::Authorized))
    }

    /// Authorization-request URL for the fixed Drive scope set.
    ///
    /// # Errors
    ///
    /// Returns `Config` when no redirect URI is available or the OAuth client
    /// is not configured.
    pub fn build_consent_url(
        &self,
        redirect_uri: Option<&str>,
        force_reconsent: bool,
    ) -> Result<String> {
        let redirect_uri = self.redirect_uri(redirect_uri)?;
        self.oauth.consent_url(redirect_uri, force_reconsent)
    }

    /// Exchange an authorization code. The result is not stored.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty code, `Config` when no redirect URI
    /// is available and `CodeExchangeFailed` when the exchange fails.
    pub async fn exchange_code(&self, code: &str, redirect_uri: Option<&str>) -> Result<TokenPair> {
        if code.trim().is_empty() {
            return Err(LetterboxError::Validation("code is required".into()));
        }
        let redirect_uri = self.redirect_uri(redirect_uri)?;
        let tokens = self.oauth.exchange_code(code, redirect_uri).await?;
        tracing::info!(
            has_refresh_token = tokens.refresh_token.is_some(),
            "authorization code exchanged"
        );
        Ok(tokens)
    }

    /// Merge `tokens` into the principal's stored record.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty patch; storage faults propagate.
    pub async fn save_tokens(&self, principal_id: &str, tokens: &TokenPair) -> Result<()> {
        if principal_id.is_empty() {
            return Err(LetterboxError::Validation("uid is required".into()));
        }
        if tokens.is_empty() {
            return Err(LetterboxError::Validation("tokens are required".into()));
        }
        self.vault.upsert(principal_id, tokens).await
    }

    /// Stored delegation state, evaluated locally.
    ///
    /// # Errors
    ///
    /// Storage faults propagate.
    pub async fn connection_status(&self, principal_id: &str) -> Result<ConnectionStatus> {
        let stored = self.vault.read(principal_id).await?.unwrap_or_default();
        Ok(ConnectionStatus {
            state: stored.state(),
            expiry_epoch_millis: stored.expiry_epoch_millis,
        })
    }

    /// Forget the principal's tokens.
    ///
    /// # Errors
    ///
    /// Storage faults propagate.
    pub async fn disconnect(&self, principal_id: &str) -> Result<()> {
        self.vault.clear(principal_id).await?;
        tracing::info!(principal = %principal_id, "delegated tokens cleared");
        Ok(())
    }

    /// Revoke the grant at the provider, then forget the tokens.
    ///
    /// Revocation is best-effort: a provider failure is logged and the local
    /// record is cleared regardless.
    ///
    /// # Errors
    ///
    /// Storage faults propagate.
    pub async fn revoke(&self, principal_id: &str) -> Result<()> {
        if let Some(stored) = self.vault.read(principal_id).await? {
            // Revoking the refresh token also invalidates its access tokens.
            let token = stored.refresh_token.as_deref().or(stored.access_token.as_deref());
            if let Some(token) = token
                && let Err(e) = self.oauth.revoke(token).await
            {
                tracing::warn!(principal = %principal_id, error = %e, "provider revocation failed");
            }
        }
        self.disconnect(principal_id).await
    }
}

fn authorized(principal_id: &str, tokens: &TokenPair, refreshed: bool) -> Option<AuthorizedClient> {
    let access_token = tokens.access_token.clone().filter(|t| !t.is_empty())?;
    Some(AuthorizedClient {
        principal_id: principal_id.to_string(),
        access_token,
        expiry_epoch_millis: tokens.expiry_epoch_millis,
        refreshed,
    })
}
