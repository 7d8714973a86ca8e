//! Async traits shared across all letterbox crates.
//!
//! Every cross-crate abstraction is defined here so that higher layers depend
//! only on `letterbox-types`, not on each other.

use crate::{
    AuthorizedClient, Draft, DraftInput, DraftUpdate, ExportRecord, NewDocument, Principal,
    RemoteDocument, TokenPair,
};
use async_trait::async_trait;

pub use crate::error::Result;

/// Durable per-principal storage of a delegated-auth [`TokenPair`].
#[async_trait]
pub trait TokenVault: Send + Sync {
    /// Merge the fields present in `tokens` into the stored record, creating it if absent.
    ///
    /// Concurrent upserts for one principal resolve last-writer-wins per field.
    async fn upsert(&self, principal_id: &str, tokens: &TokenPair) -> Result<()>;
    /// Load the stored record.
    async fn read(&self, principal_id: &str) -> Result<Option<TokenPair>>;
    /// Remove the stored record. Clearing an absent record is not an error.
    async fn clear(&self, principal_id: &str) -> Result<()>;
}

/// Repository of drafts that enforces ownership on every call.
///
/// `get`, `update` and `delete` fail with `NotFound` for unknown ids and with
/// `Forbidden` when the draft belongs to someone else. Ownership is evaluated
/// against the current record inside the same operation that mutates it.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn create(&self, principal: &Principal, input: DraftInput) -> Result<Draft>;
    async fn get(&self, principal: &Principal, id: &str) -> Result<Draft>;
    async fn update(&self, principal: &Principal, id: &str, update: DraftUpdate) -> Result<Draft>;
    async fn delete(&self, principal: &Principal, id: &str) -> Result<()>;
    /// All drafts owned by `principal`, most recently updated first.
    async fn list(&self, principal: &Principal) -> Result<Vec<Draft>>;
}

/// Append-only log of successful exports.
#[async_trait]
pub trait ExportLog: Send + Sync {
    async fn append(&self, record: &ExportRecord) -> Result<()>;
    /// Records owned by `owner_id`, newest first.
    async fn list_exports(&self, owner_id: &str) -> Result<Vec<ExportRecord>>;
}

/// The narrow seam to a third-party OAuth provider.
///
/// Implementations perform exactly one network exchange per call and never
/// retry or cache on their own; refresh policy belongs to the caller.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Build the authorization-request URL for the fixed scope set.
    ///
    /// # Errors
    ///
    /// Returns `Config` when the client credentials are not configured.
    fn consent_url(&self, redirect_uri: &str, force_reconsent: bool) -> Result<String>;
    /// Exchange a one-time authorization code for a token pair.
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenPair>;
    /// Exchange a refresh token for a fresh access token.
    ///
    /// The returned pair may omit `refresh_token` when the provider does not rotate it.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair>;
    /// Revoke a token at the provider.
    async fn revoke(&self, token: &str) -> Result<()>;
}

/// An external document store acting under a delegated credential.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a new file. Never overwrites an existing one.
    async fn create_document(
        &self,
        client: &AuthorizedClient,
        document: &NewDocument,
    ) -> Result<RemoteDocument>;
    /// Grant read access to anyone holding the link.
    async fn share_with_link(&self, client: &AuthorizedClient, file_id: &str) -> Result<()>;
    /// List documents visible to the credential.
    async fn list_documents(
        &self,
        client: &AuthorizedClient,
        page_size: u32,
    ) -> Result<Vec<RemoteDocument>>;
}
