//! DocumentStore trait: opaque fetch-by-id access to documents and sheets.
//!
//! The system prompt, the phone directory and the attendance sheet all live
//! in an external document store. Everything here is read fresh on every
//! call; nothing is cached between agent runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use crate::error::DocumentError;

/// Listing metadata for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub shared: bool,
}

/// A document reduced to plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub text: String,
}

/// One attendance column: date, optional run name, attendee names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub date: String,
    #[serde(default)]
    pub run_name: Option<String>,
    #[serde(default)]
    pub names: Vec<String>,
}

impl AttendanceRecord {
    /// Column cells top to bottom: date, run name (blank if none), then names.
    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![self.date.clone(), self.run_name.clone().unwrap_or_default()];
        cells.extend(self.names.iter().cloned());
        cells
    }
}

/// What the store reports back after writing an attendance column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceReceipt {
    pub spreadsheet_id: String,
    pub updated_range: String,
    pub updated_cells: u32,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Up to `limit` documents, most recently modified first.
    async fn list_documents(&self, limit: u32) -> Result<Vec<DocumentSummary>, DocumentError>;

    async fn read_document(&self, document_id: &str) -> Result<Document, DocumentError>;

    /// Cell values for an A1-notation range. Rows may be ragged.
    async fn read_range(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>, DocumentError>;

    /// Insert a fresh column C in the first sheet and fill it with `record`.
    async fn insert_attendance_column(
        &self,
        spreadsheet_id: &str,
        record: &AttendanceRecord,
    ) -> Result<AttendanceReceipt, DocumentError>;
}

/// Fetch the system prompt text. Called once per agent construction.
///
/// An unset id is `NotConfigured`; a document with no text is `EmptyDocument`.
pub async fn fetch_system_prompt(store: &dyn DocumentStore, document_id: &str) -> Result<String, DocumentError> {
    let document_id = document_id.trim();
    if document_id.is_empty() {
        return Err(DocumentError::NotConfigured("system prompt document id is not set".into()));
    }

    info!(document_id, "Fetching system prompt");
    let doc = store.read_document(document_id).await?;
    let text = doc.text.trim();
    if text.is_empty() {
        return Err(DocumentError::EmptyDocument(document_id.to_string()));
    }
    Ok(text.to_string())
}
