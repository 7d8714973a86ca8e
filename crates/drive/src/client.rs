//! Google Drive API v3 client implementing [`DocumentStore`].
//!
//! Every call runs under the caller's delegated access token; nothing is
//! retried here. Non-2xx answers surface as [`LetterboxError::Upstream`] so the
//! export pipeline can translate them.

use async_trait::async_trait;
use letterbox_types::{
    AuthorizedClient, DocumentStore, LetterboxError, NewDocument, RemoteDocument,
    traits::Result,
};
use serde::Deserialize;

/// Google Drive API base URL
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Google Drive upload base URL
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Fields returned for a created file
const CREATE_FIELDS: &str = "id,name,mimeType,webViewLink";

/// Fields returned when listing
const LIST_FIELDS: &str = "files(id,name,mimeType,webViewLink,createdTime)";

/// Only exported letters are listed.
const LIST_QUERY: &str = "mimeType='text/html' and trashed=false";

#[derive(Debug, Deserialize)]
struct FilesListResponse {
    #[serde(default)]
    files: Vec<RemoteDocument>,
}

/// Build a `multipart/related` upload body: JSON metadata part, then the media part.
#[must_use]
pub fn multipart_related_body(
    boundary: &str,
    metadata: &serde_json::Value,
    mime_type: &str,
    body: &str,
) -> String {
    format!(
        "--{boundary}\r\n\
         Content-Type: application/json; charset=UTF-8\r\n\r\n\
         {metadata}\r\n\
         --{boundary}\r\n\
         Content-Type: {mime_type}\r\n\r\n\
         {body}\r\n\
         --{boundary}--\r\n"
    )
}

/// Drive client over rquest.
pub struct GoogleDriveClient {
    http: rquest::Client,
    api_base: String,
    upload_base: String,
}

impl GoogleDriveClient {
    #[must_use]
    pub fn new(http: rquest::Client) -> Self {
        Self {
            http,
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: DRIVE_UPLOAD_BASE.to_string(),
        }
    }

    /// Use different metadata and upload base URLs (no trailing slash).
    #[must_use]
    pub fn with_base_urls(
        mut self,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        self.api_base = api_base.into();
        self.upload_base = upload_base.into();
        self
    }

    async fn read_success(resp: rquest::Response) -> Result<String> {
        let status = resp.status();
        let body = resp.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            tracing::debug!(status = status.as_u16(), "drive api returned an error");
            Err(LetterboxError::Upstream {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl DocumentStore for GoogleDriveClient {
    async fn create_document(
        &self,
        client: &AuthorizedClient,
        document: &NewDocument,
    ) -> Result<RemoteDocument> {
        let boundary = format!("letterbox-{}", uuid::Uuid::new_v4().simple());
        let metadata = serde_json::json!({
            "name": document.name,
            "mimeType": document.mime_type,
        });
        let payload =
            multipart_related_body(&boundary, &metadata, &document.mime_type, &document.body);

        let url = format!(
            "{}/files?uploadType=multipart&fields={CREATE_FIELDS}",
            self.upload_base
        );
        let resp = self
            .http
            .post(&url)
            .header("Authorization", client.bearer())
            .header(
                "Content-Type",
                format!("multipart/related; boundary={boundary}"),
            )
            .body(payload)
            .send()
            .await?;
        let body = Self::read_success(resp).await?;
        let file: RemoteDocument = serde_json::from_str(&body)?;
        tracing::info!(file_id = %file.id, principal = %client.principal_id, "drive file created");
        Ok(file)
    }

    async fn share_with_link(&self, client: &AuthorizedClient, file_id: &str) -> Result<()> {
        let url = format!("{}/files/{file_id}/permissions", self.api_base);
        let resp = self
            .http
            .post(&url)
            .header("Authorization", client.bearer())
            .json(&serde_json::json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await?;
        Self::read_success(resp).await?;
        Ok(())
    }

    async fn list_documents(
        &self,
        client: &AuthorizedClient,
        page_size: u32,
    ) -> Result<Vec<RemoteDocument>> {
        let url = format!("{}/files", self.api_base);
        let page_size = page_size.clamp(1, 1000).to_string();
        let resp = self
            .http
            .get(&url)
            .header("Authorization", client.bearer())
            .query(&[
                ("q", LIST_QUERY),
                ("fields", LIST_FIELDS),
                ("orderBy", "createdTime desc"),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await?;
        let body = Self::read_success(resp).await?;
        let list: FilesListResponse = serde_json::from_str(&body)?;
        Ok(list.files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_body_layout() {
        let meta = serde_json::json!({"name": "Hello.html", "mimeType": "text/html"});
        let body = multipart_related_body("b1", &meta, "text/html; charset=UTF-8", "<p>Hi</p>");
        let parts: Vec<&str> = body.split("--b1").collect();
        // preamble, metadata, media, closing
        assert_eq!(parts.len(), 4);
        assert!(parts[1].contains("application/json"));
        assert!(parts[1].contains("\"name\":\"Hello.html\""));
        assert!(parts[2].contains("Content-Type: text/html; charset=UTF-8\r\n\r\n<p>Hi</p>"));
        assert!(body.ends_with("--b1--\r\n"));
    }

    #[test]
    fn test_files_list_parsing() {
        let json = r#"{"files":[{"id":"f1","name":"A.html","mimeType":"text/html",
            "webViewLink":"https://drive.google.com/file/d/f1/view","createdTime":"2024-01-01T00:00:00Z"}]}"#;
        let list: FilesListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(list.files.len(), 1);
        assert_eq!(list.files[0].id, "f1");
        assert_eq!(
            list.files[0].web_view_link.as_deref(),
            Some("https://drive.google.com/file/d/f1/view")
        );
    }

    #[test]
    fn test_empty_files_list() {
        let list: FilesListResponse = serde_json::from_str("{}").unwrap();
        assert!(list.files.is_empty());
    }
}
