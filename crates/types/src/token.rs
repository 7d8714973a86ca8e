//! Delegated-auth token representation, merge rules, and expiry logic.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Refreshable tokens expiring within this window are renewed early.
const EXPIRY_MARGIN_MILLIS: i64 = 60_000;

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
}

/// A third-party OAuth token pair stored per principal.
///
/// Every field is optional so the same type doubles as the partial update
/// passed to [`crate::TokenVault::upsert`]. Wire names follow the provider's
/// token JSON (`expiry_date` is epoch milliseconds).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(
        default,
        rename = "expiry_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry_epoch_millis: Option<i64>,
}

impl TokenPair {
    /// Create a pair holding only an access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            ..Self::default()
        }
    }

    /// Set the expiry to `expires_in_secs` seconds from now.
    #[must_use]
    pub fn with_expiry_in(mut self, expires_in_secs: u64) -> Self {
        let delta = i64::try_from(expires_in_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        self.expiry_epoch_millis = Some(now_millis().saturating_add(delta));
        self
    }

    /// Set an absolute expiry in epoch milliseconds.
    #[must_use]
    pub fn with_expiry_at(mut self, epoch_millis: i64) -> Self {
        self.expiry_epoch_millis = Some(epoch_millis);
        self
    }

    /// Attach a refresh token.
    #[must_use]
    pub fn with_refresh(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Attach an identity token.
    #[must_use]
    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    /// Returns `true` when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none()
            && self.refresh_token.is_none()
            && self.id_token.is_none()
            && self.expiry_epoch_millis.is_none()
    }

    /// Overwrite the fields present in `patch`, leaving the others untouched.
    ///
    /// A patch can never null out a field; only [`crate::TokenVault::clear`]
    /// removes a stored refresh token.
    pub fn merge(&mut self, patch: &TokenPair) {
        if let Some(v) = &patch.access_token {
            self.access_token = Some(v.clone());
        }
        if let Some(v) = &patch.refresh_token {
            self.refresh_token = Some(v.clone());
        }
        if let Some(v) = &patch.id_token {
            self.id_token = Some(v.clone());
        }
        if let Some(v) = patch.expiry_epoch_millis {
            self.expiry_epoch_millis = Some(v);
        }
    }

    /// Consuming variant of [`TokenPair::merge`].
    #[must_use]
    pub fn merged(mut self, patch: &TokenPair) -> Self {
        self.merge(patch);
        self
    }

    /// Return `true` once the recorded expiry has passed at `now`.
    ///
    /// A pair without a recorded expiry is never considered expired.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expiry_epoch_millis.is_some_and(|expiry| now >= expiry)
    }

    /// Return `true` if the access token expires within the refresh margin of `now`.
    #[must_use]
    pub fn is_expiring_at(&self, now: i64) -> bool {
        self.is_expired_at(now.saturating_add(EXPIRY_MARGIN_MILLIS))
    }

    /// Determine the usability state of this pair at `now`.
    ///
    /// With a refresh token the pair counts as `Expired` inside the margin so
    /// it is renewed early; without one it stays `Valid` until the expiry
    /// actually passes.
    #[must_use]
    pub fn state_at(&self, now: i64) -> TokenState {
        if self.access_token.as_deref().is_none_or(str::is_empty) {
            return TokenState::Missing;
        }
        let refreshable = self.refresh_token.as_deref().is_some_and(|r| !r.is_empty());
        if refreshable {
            if self.is_expiring_at(now) {
                TokenState::Expired
            } else {
                TokenState::Valid
            }
        } else if self.is_expired_at(now) {
            TokenState::Invalid
        } else {
            TokenState::Valid
        }
    }

    /// Determine the usability state of this pair right now.
    #[must_use]
    pub fn state(&self) -> TokenState {
        self.state_at(now_millis())
    }
}

/// Describes the usability state of a [`TokenPair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// No access token has been stored.
    Missing,
    Valid,
    /// Expired but a refresh token is available for renewal.
    Expired,
    /// Expired with no refresh token; re-consent is the only way forward.
    Invalid,
}

/// A ready-to-use delegated credential bound to one principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedClient {
    pub principal_id: String,
    pub access_token: String,
    pub expiry_epoch_millis: Option<i64>,
    /// Whether a refresh exchange produced this credential.
    pub refreshed: bool,
}

impl AuthorizedClient {
    /// Value for the `Authorization` header of provider API calls.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}
