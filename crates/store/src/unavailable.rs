//! Stand-in store used when the database could not be opened at startup.

use async_trait::async_trait;
use letterbox_types::{
    Draft, DraftInput, DraftStore, DraftUpdate, ExportLog, ExportRecord, LetterboxError,
    Principal, TokenPair, TokenVault, traits::Result,
};

/// Rejects every call with [`LetterboxError::StorageUnavailable`].
///
/// Lets the HTTP surface come up in degraded mode: routes that touch storage
/// answer 503 instead of the process refusing to start.
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn err(&self) -> LetterboxError {
        LetterboxError::StorageUnavailable(self.reason.clone())
    }
}

#[async_trait]
impl TokenVault for UnavailableStore {
    async fn upsert(&self, _principal_id: &str, _tokens: &TokenPair) -> Result<()> {
        Err(self.err())
    }

    async fn read(&self, _principal_id: &str) -> Result<Option<TokenPair>> {
        Err(self.err())
    }

    async fn clear(&self, _principal_id: &str) -> Result<()> {
        Err(self.err())
    }
}

#[async_trait]
impl DraftStore for UnavailableStore {
    async fn create(&self, _principal: &Principal, _input: DraftInput) -> Result<Draft> {
        Err(self.err())
    }

    async fn get(&self, _principal: &Principal, _id: &str) -> Result<Draft> {
        Err(self.err())
    }

    async fn update(&self, _principal: &Principal, _id: &str, _update: DraftUpdate) -> Result<Draft> {
        Err(self.err())
    }

    async fn delete(&self, _principal: &Principal, _id: &str) -> Result<()> {
        Err(self.err())
    }

    async fn list(&self, _principal: &Principal) -> Result<Vec<Draft>> {
        Err(self.err())
    }
}

#[async_trait]
impl ExportLog for UnavailableStore {
    async fn append(&self, _record: &ExportRecord) -> Result<()> {
        Err(self.err())
    }

    async fn list_exports(&self, _owner_id: &str) -> Result<Vec<ExportRecord>> {
        Err(self.err())
    }
}
