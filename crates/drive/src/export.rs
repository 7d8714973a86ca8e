//! Export of a letter to the user's Drive.
//!
//! One export is one create call: the pipeline never looks up or overwrites an
//! existing file, so a retried request produces a second document rather than
//! clobbering the first.

use letterbox_auth::{ConsentReason, DelegatedAuthManager, Delegation};
use letterbox_types::{
    AuthorizedClient, DocumentStore, ExportLog, ExportRecord, LetterboxError, NewDocument,
    Principal, RemoteDocument, now_millis, traits::Result,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// MIME type of exported letters.
pub const EXPORT_MIME_TYPE: &str = "text/html; charset=UTF-8";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Where the exported letter ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReceipt {
    pub file_id: String,
    pub file_name: String,
    pub view_link: String,
}

pub struct ExportPipeline {
    delegated: Arc<DelegatedAuthManager>,
    documents: Arc<dyn DocumentStore>,
    log: Arc<dyn ExportLog>,
    share_publicly: bool,
}

impl ExportPipeline {
    pub fn new(
        delegated: Arc<DelegatedAuthManager>,
        documents: Arc<dyn DocumentStore>,
        log: Arc<dyn ExportLog>,
    ) -> Self {
        Self {
            delegated,
            documents,
            log,
            share_publicly: true,
        }
    }

    /// Grant link-holders read access to every exported file.
    #[must_use]
    pub fn with_share_publicly(mut self, share_publicly: bool) -> Self {
        self.share_publicly = share_publicly;
        self
    }

    async fn client_for(&self, principal: &Principal) -> Result<AuthorizedClient> {
        match self.delegated.get_client(&principal.id).await? {
            Delegation::Authorized(client) => Ok(client),
            Delegation::NeedsConsent(ConsentReason::NotConnected) => {
                Err(LetterboxError::NotConnected)
            }
            Delegation::NeedsConsent(ConsentReason::NoRefreshToken) => Err(
                LetterboxError::ReauthRequired("drive access expired; reconnect google drive".into()),
            ),
            Delegation::NeedsConsent(ConsentReason::RefreshFailed(reason)) => Err(
                LetterboxError::ReauthRequired(format!("token refresh failed: {reason}")),
            ),
        }
    }

    /// Create a new HTML document from `request` in the principal's Drive.
    ///
    /// # Errors
    ///
    /// - `Validation` when the title is empty.
    /// - `NotConnected` / `ReauthRequired` when no usable delegation exists or
    ///   the provider rejects the token.
    /// - `InsufficientScope` when the grant lacks Drive write access.
    /// - `ExportFailed` for any other provider failure.
    pub async fn export(
        &self,
        principal: &Principal,
        request: ExportRequest,
    ) -> Result<ExportReceipt> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(LetterboxError::Validation("title is required".into()));
        }

        let client = self.client_for(principal).await?;
        let document = NewDocument {
            name: format!("{title}.html"),
            mime_type: EXPORT_MIME_TYPE.to_string(),
            body: html_document(title, &request.content),
        };

        let file = self
            .documents
            .create_document(&client, &document)
            .await
            .map_err(translate_error)?;

        if self.share_publicly
            && let Err(e) = self.documents.share_with_link(&client, &file.id).await
        {
            tracing::warn!(file_id = %file.id, error = %e, "failed to share exported file");
        }

        let record = ExportRecord {
            owner_id: principal.id.clone(),
            remote_file_id: file.id.clone(),
            title: title.to_string(),
            created_at: now_millis(),
        };
        if let Err(e) = self.log.append(&record).await {
            tracing::warn!(file_id = %file.id, error = %e, "failed to record export");
        }

        tracing::info!(principal = %principal.id, file_id = %file.id, "letter exported");
        let view_link = file
            .web_view_link
            .clone()
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", file.id));
        Ok(ExportReceipt {
            file_name: if file.name.is_empty() {
                document.name
            } else {
                file.name
            },
            file_id: file.id,
            view_link,
        })
    }

    /// Exported letters currently in the principal's Drive.
    ///
    /// # Errors
    ///
    /// Same consent and provider errors as [`ExportPipeline::export`].
    pub async fn list_remote(
        &self,
        principal: &Principal,
        page_size: u32,
    ) -> Result<Vec<RemoteDocument>> {
        let client = self.client_for(principal).await?;
        self.documents
            .list_documents(&client, page_size)
            .await
            .map_err(translate_error)
    }

    /// The principal's export history, newest first.
    ///
    /// # Errors
    ///
    /// Storage faults propagate.
    pub async fn list_exports(&self, principal: &Principal) -> Result<Vec<ExportRecord>> {
        self.log.list_exports(&principal.id).await
    }
}

/// Map a document-store failure onto the export error taxonomy.
fn translate_error(err: LetterboxError) -> LetterboxError {
    match err {
        LetterboxError::Upstream { status: 401, .. } => {
            LetterboxError::ReauthRequired("google rejected the stored access token".into())
        }
        LetterboxError::Upstream { status: 403, body } => LetterboxError::InsufficientScope(body),
        LetterboxError::Upstream { status, body } => {
            LetterboxError::ExportFailed(format!("drive returned {status}: {body}"))
        }
        LetterboxError::Http(msg) => LetterboxError::ExportFailed(msg),
        other => other,
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap rich-text `content` in a standalone UTF-8 HTML document.
#[must_use]
pub fn html_document(title: &str, content: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>{}</title>\n</head>\n<body>\n{content}\n</body>\n</html>\n",
        escape_html(title)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use letterbox_store::InMemoryStore;
    use letterbox_types::{OAuthProvider, TokenPair, TokenVault};
    use std::sync::Mutex;

    struct NoOAuth;

    #[async_trait]
    impl OAuthProvider for NoOAuth {
        fn consent_url(&self, _redirect_uri: &str, _force: bool) -> Result<String> {
            Err(LetterboxError::Config("unused".into()))
        }
        async fn exchange_code(&self, _code: &str, _redirect_uri: &str) -> Result<TokenPair> {
            Err(LetterboxError::Config("unused".into()))
        }
        async fn refresh(&self, _refresh_token: &str) -> Result<TokenPair> {
            Err(LetterboxError::Upstream {
                status: 400,
                body: "invalid_grant".into(),
            })
        }
        async fn revoke(&self, _token: &str) -> Result<()> {
            Ok(())
        }
    }

    /// Drive stand-in: fails creation with `create_status` when set.
    #[derive(Default)]
    struct FakeDrive {
        create_status: Option<u16>,
        share_fails: bool,
        created: Mutex<Vec<NewDocument>>,
        shared: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DocumentStore for FakeDrive {
        async fn create_document(
            &self,
            client: &AuthorizedClient,
            document: &NewDocument,
        ) -> Result<RemoteDocument> {
            if let Some(status) = self.create_status {
                return Err(LetterboxError::Upstream {
                    status,
                    body: "nope".into(),
                });
            }
            assert_eq!(client.access_token, "live");
            self.created.lock().unwrap().push(document.clone());
            Ok(RemoteDocument {
                id: "file-1".into(),
                name: document.name.clone(),
                mime_type: Some("text/html".into()),
                web_view_link: Some("https://drive.google.com/file/d/file-1/view".into()),
                created_time: None,
            })
        }

        async fn share_with_link(&self, _client: &AuthorizedClient, file_id: &str) -> Result<()> {
            if self.share_fails {
                return Err(LetterboxError::Upstream {
                    status: 500,
                    body: "boom".into(),
                });
            }
            self.shared.lock().unwrap().push(file_id.to_string());
            Ok(())
        }

        async fn list_documents(
            &self,
            _client: &AuthorizedClient,
            _page_size: u32,
        ) -> Result<Vec<RemoteDocument>> {
            Ok(Vec::new())
        }
    }

    struct Fixture {
        pipeline: ExportPipeline,
        store: Arc<InMemoryStore>,
        drive: Arc<FakeDrive>,
    }

    async fn fixture(drive: FakeDrive, tokens: Option<TokenPair>) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        if let Some(tokens) = tokens {
            store.upsert("u1", &tokens).await.unwrap();
        }
        let drive = Arc::new(drive);
        let manager = Arc::new(DelegatedAuthManager::new(store.clone(), Arc::new(NoOAuth)));
        let pipeline = ExportPipeline::new(manager, drive.clone(), store.clone());
        Fixture {
            pipeline,
            store,
            drive,
        }
    }

    fn live_tokens() -> TokenPair {
        TokenPair::new("live").with_refresh("r").with_expiry_in(3600)
    }

    fn request() -> ExportRequest {
        ExportRequest {
            title: "Hello".into(),
            content: "<p>Hi</p>".into(),
        }
    }

    fn u1() -> Principal {
        Principal::new("u1")
    }

    #[tokio::test]
    async fn test_export_success_records_and_shares() {
        let f = fixture(FakeDrive::default(), Some(live_tokens())).await;
        let receipt = f.pipeline.export(&u1(), request()).await.unwrap();
        assert_eq!(receipt.file_id, "file-1");
        assert_eq!(receipt.file_name, "Hello.html");
        assert!(receipt.view_link.contains("file-1"));

        {
            let created = f.drive.created.lock().unwrap();
            assert_eq!(created[0].mime_type, EXPORT_MIME_TYPE);
            assert!(created[0].body.contains("<p>Hi</p>"));
            assert_eq!(f.drive.shared.lock().unwrap().as_slice(), ["file-1"]);
        }

        let records = f.store.list_exports("u1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].remote_file_id, "file-1");
    }

    #[tokio::test]
    async fn test_export_without_tokens_not_connected() {
        let f = fixture(FakeDrive::default(), None).await;
        let err = f.pipeline.export(&u1(), request()).await.unwrap_err();
        assert!(matches!(err, LetterboxError::NotConnected));
        assert!(f.store.list_exports("u1").await.unwrap().is_empty());
        assert!(f.drive.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_export_failed_refresh_requires_reauth() {
        let stale = TokenPair::new("stale")
            .with_refresh("r")
            .with_expiry_at(now_millis() - 3_600_000);
        let f = fixture(FakeDrive::default(), Some(stale)).await;
        let err = f.pipeline.export(&u1(), request()).await.unwrap_err();
        assert!(matches!(err, LetterboxError::ReauthRequired(_)));
        assert!(f.store.list_exports("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_export_rejected_token_requires_reauth() {
        let drive = FakeDrive {
            create_status: Some(401),
            ..FakeDrive::default()
        };
        let f = fixture(drive, Some(live_tokens())).await;
        let err = f.pipeline.export(&u1(), request()).await.unwrap_err();
        assert!(matches!(err, LetterboxError::ReauthRequired(_)));
        assert!(f.store.list_exports("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_export_scope_and_other_failures() {
        let drive = FakeDrive {
            create_status: Some(403),
            ..FakeDrive::default()
        };
        let f = fixture(drive, Some(live_tokens())).await;
        assert!(matches!(
            f.pipeline.export(&u1(), request()).await.unwrap_err(),
            LetterboxError::InsufficientScope(_)
        ));

        let drive = FakeDrive {
            create_status: Some(500),
            ..FakeDrive::default()
        };
        let f = fixture(drive, Some(live_tokens())).await;
        assert!(matches!(
            f.pipeline.export(&u1(), request()).await.unwrap_err(),
            LetterboxError::ExportFailed(_)
        ));
    }

    #[tokio::test]
    async fn test_share_failure_does_not_fail_export() {
        let drive = FakeDrive {
            share_fails: true,
            ..FakeDrive::default()
        };
        let f = fixture(drive, Some(live_tokens())).await;
        assert!(f.pipeline.export(&u1(), request()).await.is_ok());
        assert_eq!(f.store.list_exports("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sharing_disabled() {
        let f = fixture(FakeDrive::default(), Some(live_tokens())).await;
        let pipeline = f.pipeline.with_share_publicly(false);
        pipeline.export(&u1(), request()).await.unwrap();
        assert!(f.drive.shared.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_title_required() {
        let f = fixture(FakeDrive::default(), Some(live_tokens())).await;
        let err = f
            .pipeline
            .export(
                &u1(),
                ExportRequest {
                    title: "  ".into(),
                    content: "x".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LetterboxError::Validation(_)));
    }

    #[test]
    fn test_html_document_escapes_title() {
        let html = html_document("A <b> & \"c\"", "<p>body</p>");
        assert!(html.contains("<title>A &lt;b&gt; &amp; &quot;c&quot;</title>"));
        assert!(html.contains("<p>body</p>"));
        assert!(html.contains("charset=\"UTF-8\""));
    }
}
