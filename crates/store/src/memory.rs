//! In-memory store backed by `HashMap`s behind a `Mutex`.

use async_trait::async_trait;
use letterbox_types::{
    Draft, DraftInput, DraftStore, DraftUpdate, ExportLog, ExportRecord, LetterboxError,
    Principal, TokenPair, TokenVault, now_millis, traits::Result,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    tokens: HashMap<String, TokenPair>,
    drafts: HashMap<String, Draft>,
    exports: Vec<ExportRecord>,
}

/// An in-memory [`TokenVault`], [`DraftStore`] and [`ExportLog`] for tests and
/// ephemeral use.
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| LetterboxError::Storage("in-memory store lock poisoned".into()))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(id: &str) -> LetterboxError {
    LetterboxError::NotFound(format!("draft {id}"))
}

#[async_trait]
impl TokenVault for InMemoryStore {
    async fn upsert(&self, principal_id: &str, tokens: &TokenPair) -> Result<()> {
        self.lock()?
            .tokens
            .entry(principal_id.to_string())
            .or_default()
            .merge(tokens);
        Ok(())
    }

    async fn read(&self, principal_id: &str) -> Result<Option<TokenPair>> {
        Ok(self.lock()?.tokens.get(principal_id).cloned())
    }

    async fn clear(&self, principal_id: &str) -> Result<()> {
        self.lock()?.tokens.remove(principal_id);
        Ok(())
    }
}

#[async_trait]
impl DraftStore for InMemoryStore {
    async fn create(&self, principal: &Principal, input: DraftInput) -> Result<Draft> {
        input.validate()?;
        let now = now_millis();
        let draft = Draft {
            id: uuid::Uuid::new_v4().simple().to_string(),
            owner_id: principal.id.clone(),
            title: input.title,
            content: input.content,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.drafts.insert(draft.id.clone(), draft.clone());
        Ok(draft)
    }

    async fn get(&self, principal: &Principal, id: &str) -> Result<Draft> {
        let inner = self.lock()?;
        let draft = inner.drafts.get(id).ok_or_else(|| not_found(id))?;
        draft.ensure_owned_by(principal)?;
        Ok(draft.clone())
    }

    async fn update(&self, principal: &Principal, id: &str, update: DraftUpdate) -> Result<Draft> {
        update.validate()?;
        let mut inner = self.lock()?;
        let draft = inner.drafts.get_mut(id).ok_or_else(|| not_found(id))?;
        draft.ensure_owned_by(principal)?;
        draft.apply(update, now_millis());
        Ok(draft.clone())
    }

    async fn delete(&self, principal: &Principal, id: &str) -> Result<()> {
        let mut inner = self.lock()?;
        let draft = inner.drafts.get(id).ok_or_else(|| not_found(id))?;
        draft.ensure_owned_by(principal)?;
        inner.drafts.remove(id);
        Ok(())
    }

    async fn list(&self, principal: &Principal) -> Result<Vec<Draft>> {
        let inner = self.lock()?;
        let mut drafts: Vec<Draft> = inner
            .drafts
            .values()
            .filter(|d| d.owner_id == principal.id)
            .cloned()
            .collect();
        drafts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(drafts)
    }
}

#[async_trait]
impl ExportLog for InMemoryStore {
    async fn append(&self, record: &ExportRecord) -> Result<()> {
        self.lock()?.exports.push(record.clone());
        Ok(())
    }

    async fn list_exports(&self, owner_id: &str) -> Result<Vec<ExportRecord>> {
        let inner = self.lock()?;
        Ok(inner
            .exports
            .iter()
            .rev()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Principal {
        Principal::new("u1")
    }

    fn bob() -> Principal {
        Principal::new("u2")
    }

    #[tokio::test]
    async fn test_upsert_and_read() {
        let store = InMemoryStore::new();
        store
            .upsert("u1", &TokenPair::new("acc").with_refresh("ref"))
            .await
            .unwrap();
        let loaded = store.read("u1").await.unwrap().unwrap();
        assert_eq!(loaded.access_token.as_deref(), Some("acc"));
        assert_eq!(loaded.refresh_token.as_deref(), Some("ref"));
    }

    #[tokio::test]
    async fn test_upsert_merges_fields() {
        let store = InMemoryStore::new();
        store
            .upsert("u1", &TokenPair::new("a1").with_refresh("r1"))
            .await
            .unwrap();
        store
            .upsert("u1", &TokenPair::new("a2").with_expiry_at(99))
            .await
            .unwrap();
        let loaded = store.read("u1").await.unwrap().unwrap();
        assert_eq!(loaded.access_token.as_deref(), Some("a2"));
        assert_eq!(loaded.refresh_token.as_deref(), Some("r1"));
        assert_eq!(loaded.expiry_epoch_millis, Some(99));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = InMemoryStore::new();
        store.upsert("u1", &TokenPair::new("tok")).await.unwrap();
        store.clear("u1").await.unwrap();
        store.clear("u1").await.unwrap();
        assert!(store.read("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_vault_isolated_per_principal() {
        let store = InMemoryStore::new();
        store.upsert("u1", &TokenPair::new("one")).await.unwrap();
        assert!(store.read("u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryStore::new();
        let d = store
            .create(&alice(), DraftInput::new("Hi", "<p>x</p>"))
            .await
            .unwrap();
        assert_eq!(d.owner_id, "u1");
        assert_eq!(d.created_at, d.updated_at);
        let got = store.get(&alice(), &d.id).await.unwrap();
        assert_eq!(got, d);
    }

    #[tokio::test]
    async fn test_create_rejects_missing_fields() {
        let store = InMemoryStore::new();
        let err = store
            .create(&alice(), DraftInput::new("", "body"))
            .await
            .unwrap_err();
        assert!(matches!(err, LetterboxError::Validation(_)));
        assert!(store.list(&alice()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cross_owner_access_is_forbidden() {
        let store = InMemoryStore::new();
        let d = store
            .create(&alice(), DraftInput::new("Hi", "x"))
            .await
            .unwrap();
        let update = DraftUpdate {
            title: Some("stolen".into()),
            content: None,
        };
        assert!(matches!(
            store.get(&bob(), &d.id).await.unwrap_err(),
            LetterboxError::Forbidden(_)
        ));
        assert!(matches!(
            store.update(&bob(), &d.id, update).await.unwrap_err(),
            LetterboxError::Forbidden(_)
        ));
        assert!(matches!(
            store.delete(&bob(), &d.id).await.unwrap_err(),
            LetterboxError::Forbidden(_)
        ));
        assert_eq!(store.get(&alice(), &d.id).await.unwrap().title, "Hi");
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.get(&alice(), "nope").await.unwrap_err(),
            LetterboxError::NotFound(_)
        ));
        assert!(matches!(
            store.delete(&alice(), "nope").await.unwrap_err(),
            LetterboxError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_update_bumps_updated_at() {
        let store = InMemoryStore::new();
        let d = store
            .create(&alice(), DraftInput::new("Hi", "x"))
            .await
            .unwrap();
        let updated = store
            .update(
                &alice(),
                &d.id,
                DraftUpdate {
                    title: None,
                    content: Some("y".into()),
                },
            )
            .await
            .unwrap();
        assert!(updated.updated_at > d.updated_at);
        assert_eq!(updated.title, "Hi");
        assert_eq!(updated.content, "y");
    }

    #[tokio::test]
    async fn test_delete_then_get_not_found() {
        let store = InMemoryStore::new();
        let d = store
            .create(&alice(), DraftInput::new("Hi", "x"))
            .await
            .unwrap();
        store.delete(&alice(), &d.id).await.unwrap();
        assert!(matches!(
            store.get(&alice(), &d.id).await.unwrap_err(),
            LetterboxError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_list_only_own_newest_first() {
        let store = InMemoryStore::new();
        let first = store
            .create(&alice(), DraftInput::new("first", "x"))
            .await
            .unwrap();
        let second = store
            .create(&alice(), DraftInput::new("second", "x"))
            .await
            .unwrap();
        store
            .create(&bob(), DraftInput::new("bob", "x"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .update(
                &alice(),
                &first.id,
                DraftUpdate {
                    title: Some("first again".into()),
                    content: None,
                },
            )
            .await
            .unwrap();

        let drafts = store.list(&alice()).await.unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].id, first.id);
        assert_eq!(drafts[1].id, second.id);
    }

    #[tokio::test]
    async fn test_export_log_newest_first() {
        let store = InMemoryStore::new();
        for (i, title) in ["a", "b"].iter().enumerate() {
            store
                .append(&ExportRecord {
                    owner_id: "u1".into(),
                    remote_file_id: format!("f{i}"),
                    title: (*title).to_string(),
                    created_at: i64::try_from(i).unwrap(),
                })
                .await
                .unwrap();
        }
        let records = store.list_exports("u1").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].remote_file_id, "f1");
        assert!(store.list_exports("u2").await.unwrap().is_empty());
    }
}
