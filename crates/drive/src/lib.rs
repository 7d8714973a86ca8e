//! Google Drive document store and the export pipeline built on it.

pub mod client;
pub mod export;

pub use client::GoogleDriveClient;
pub use export::{ExportPipeline, ExportReceipt, ExportRequest};
