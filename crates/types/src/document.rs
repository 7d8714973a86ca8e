//! Documents exported to the external document store.

use serde::{Deserialize, Serialize};

/// A document to be created in the external store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub name: String,
    pub mime_type: String,
    /// Full UTF-8 body of the file.
    pub body: String,
}

/// A document as reported by the external store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}

/// Append-only bookkeeping entry for a successful export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub owner_id: String,
    pub remote_file_id: String,
    pub title: String,
    /// Epoch milliseconds.
    pub created_at: i64,
}
