//! Unified error type for the letterbox workspace.

use thiserror::Error;

/// Enumerates all error kinds that can occur across letterbox crates.
#[derive(Debug, Error)]
pub enum LetterboxError {
    /// The bearer credential is absent, malformed, or fails signature/issuer checks.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// The bearer credential verified structurally but its expiry has passed.
    #[error("credential expired")]
    ExpiredCredential,

    /// The caller is authenticated but does not own the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// No delegated-auth tokens are stored for the caller.
    #[error("google drive is not connected; authorize access first")]
    NotConnected,

    /// Stored delegated-auth tokens can no longer be used; the user must reconnect.
    #[error("reauthorization required: {0}")]
    ReauthRequired(String),

    /// Delegated-auth tokens lack a permission the operation needs.
    #[error("insufficient scope: {0}")]
    InsufficientScope(String),

    /// A required input field is missing or empty.
    #[error("validation error: {0}")]
    Validation(String),

    /// The authorization code could not be exchanged for tokens.
    #[error("code exchange failed: {0}")]
    CodeExchangeFailed(String),

    /// The document store rejected the export for a reason other than auth.
    #[error("export failed: {0}")]
    ExportFailed(String),

    /// Persistent storage (`SQLite`) error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Storage could not be initialised; the service is running degraded.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(String),

    /// JSON serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The upstream provider returned a non-success status.
    #[error("upstream error: status={status}, body={body}")]
    Upstream { status: u16, body: String },
}

// ── Feature-gated From impls ──────────────────────────────────────────────────

#[cfg(feature = "rquest")]
impl From<rquest::Error> for LetterboxError {
    fn from(e: rquest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for LetterboxError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl LetterboxError {
    /// Returns `true` for errors raised while authenticating the caller.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::InvalidCredential(_) | Self::ExpiredCredential)
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, LetterboxError>;
