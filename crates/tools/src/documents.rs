//! Read-only Google document tools, including the calendar shortcut.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use textpilot_core::document::DocumentStore;
use textpilot_core::error::ToolError;
use textpilot_core::tool::{Tool, ToolOutput};

use crate::{configured, required_str};

const DEFAULT_LIST_LIMIT: u32 = 20;
const MAX_LIST_LIMIT: u32 = 100;
const DEFAULT_RANGE: &str = "A1:Z100";

/// List recently modified documents.
pub struct ListDocumentsTool {
    store: Option<Arc<dyn DocumentStore>>,
}

impl ListDocumentsTool {
    pub fn new(store: Option<Arc<dyn DocumentStore>>) -> Self {
        Self { store }
    }
}

/// `limit` within 1..=100, anything else falls back to the default.
fn list_limit(arguments: &Value) -> u32 {
    arguments["limit"]
        .as_u64()
        .filter(|n| (1..=MAX_LIST_LIMIT as u64).contains(n))
        .map(|n| n as u32)
        .unwrap_or(DEFAULT_LIST_LIMIT)
}

#[async_trait]
impl Tool for ListDocumentsTool {
    fn name(&self) -> &str {
        "list_google_documents"
    }

    fn description(&self) -> &str {
        "List Google Docs the assistant can read, most recently modified first. \
         Use the returned id with read_google_document."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "description": "How many documents to return (1-100, default 20)",
                    "default": DEFAULT_LIST_LIMIT
                }
            }
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let store = configured(&self.store, self.name(), "Google document access")?;
        let documents = store
            .list_documents(list_limit(&arguments))
            .await
            .map_err(|e| ToolError::execution(self.name(), e))?;

        if documents.is_empty() {
            return Ok(ToolOutput::text("No documents found."));
        }
        Ok(ToolOutput::json(json!({
            "count": documents.len(),
            "documents": documents,
        })))
    }
}

/// Read a document's full text.
pub struct ReadDocumentTool {
    store: Option<Arc<dyn DocumentStore>>,
}

impl ReadDocumentTool {
    pub fn new(store: Option<Arc<dyn DocumentStore>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ReadDocumentTool {
    fn name(&self) -> &str {
        "read_google_document"
    }

    fn description(&self) -> &str {
        "Read the full text of a Google Doc by its id."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "document_id": {
                    "type": "string",
                    "description": "The Google Doc id (from list_google_documents or the document URL)"
                }
            },
            "required": ["document_id"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let document_id = required_str(&arguments, "document_id")?;
        let store = configured(&self.store, self.name(), "Google document access")?;
        let document = store
            .read_document(document_id)
            .await
            .map_err(|e| ToolError::execution(self.name(), e))?;
        Ok(ToolOutput::text(format!("Document: {}\n\n{}", document.title, document.text)))
    }
}

/// Read a range of cells.
pub struct ReadSpreadsheetTool {
    store: Option<Arc<dyn DocumentStore>>,
}

impl ReadSpreadsheetTool {
    pub fn new(store: Option<Arc<dyn DocumentStore>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ReadSpreadsheetTool {
    fn name(&self) -> &str {
        "read_spreadsheet"
    }

    fn description(&self) -> &str {
        "Read a range of cells from a Google Sheet. Rows come back one per line, cells separated by tabs."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "spreadsheet_id": {
                    "type": "string",
                    "description": "The Google Sheet id"
                },
                "range": {
                    "type": "string",
                    "description": "A1 notation range, e.g. 'Sheet1!A1:D20' (default A1:Z100)"
                }
            },
            "required": ["spreadsheet_id"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let spreadsheet_id = required_str(&arguments, "spreadsheet_id")?;
        let range = arguments["range"]
            .as_str()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_RANGE);
        let store = configured(&self.store, self.name(), "Google document access")?;

        let rows = store
            .read_range(spreadsheet_id, range)
            .await
            .map_err(|e| ToolError::execution(self.name(), e))?;
        if rows.is_empty() {
            return Ok(ToolOutput::text(format!("No data in range {range}.")));
        }
        let text = rows.iter().map(|row| row.join("\t")).collect::<Vec<_>>().join("\n");
        Ok(ToolOutput::text(text))
    }
}

/// Read the configured calendar document.
pub struct ReadCalendarTool {
    store: Option<Arc<dyn DocumentStore>>,
    doc_id: Option<String>,
}

impl ReadCalendarTool {
    pub fn new(store: Option<Arc<dyn DocumentStore>>, doc_id: Option<String>) -> Self {
        Self { store, doc_id }
    }
}

#[async_trait]
impl Tool for ReadCalendarTool {
    fn name(&self) -> &str {
        "read_calendar"
    }

    fn description(&self) -> &str {
        "Read the calendar document with upcoming events and practices."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: Value) -> Result<ToolOutput, ToolError> {
        let doc_id = self
            .doc_id
            .as_deref()
            .ok_or_else(|| ToolError::execution(self.name(), "CALENDAR_DOC_ID is not configured"))?;
        let store = configured(&self.store, self.name(), "Google document access")?;
        let document = store
            .read_document(doc_id)
            .await
            .map_err(|e| ToolError::execution(self.name(), e))?;
        Ok(ToolOutput::text(format!("# {}\n\n{}", document.title, document.text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use textpilot_core::error::DocumentError;
    use textpilot_documents::InMemoryDocumentStore;

    fn store() -> Option<Arc<dyn DocumentStore>> {
        let store = InMemoryDocumentStore::new()
            .with_document("cal", "Fall Calendar", "Oct 21: hill repeats")
            .with_document("old", "Old Notes", "stale")
            .with_document("run", "Run Plan", "Tempo on Tuesday")
            .with_sheet(
                "sheet",
                vec![
                    vec!["Date".into(), "1/15/2024".into()],
                    vec!["Alex".into(), "x".into()],
                ],
            );
        Some(Arc::new(store))
    }

    #[test]
    fn limit_out_of_range_uses_default() {
        assert_eq!(list_limit(&json!({})), 20);
        assert_eq!(list_limit(&json!({"limit": 0})), 20);
        assert_eq!(list_limit(&json!({"limit": 101})), 20);
        assert_eq!(list_limit(&json!({"limit": 100})), 100);
        assert_eq!(list_limit(&json!({"limit": 3})), 3);
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let output = ListDocumentsTool::new(store()).execute(json!({"limit": 1})).await.unwrap();
        let data = output.data.unwrap();
        assert_eq!(data["count"], 1);
        assert_eq!(data["documents"][0]["id"], "run");
    }

    #[tokio::test]
    async fn reads_document_with_title() {
        let output = ReadDocumentTool::new(store())
            .execute(json!({"document_id": "run"}))
            .await
            .unwrap();
        assert_eq!(output.content, "Document: Run Plan\n\nTempo on Tuesday");
    }

    #[tokio::test]
    async fn missing_document_is_execution_failure() {
        let err = ReadDocumentTool::new(store())
            .execute(json!({"document_id": "nope"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[tokio::test]
    async fn permission_denied_surfaces_reason() {
        let failing: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::failing(
            DocumentError::PermissionDenied {
                document_id: "doc".into(),
                reason: "not shared with the service account".into(),
            },
        ));
        let err = ReadDocumentTool::new(Some(failing))
            .execute(json!({"document_id": "doc"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not shared"));
    }

    #[tokio::test]
    async fn spreadsheet_rows_are_tab_separated() {
        let output = ReadSpreadsheetTool::new(store())
            .execute(json!({"spreadsheet_id": "sheet"}))
            .await
            .unwrap();
        assert_eq!(output.content, "Date\t1/15/2024\nAlex\tx");
    }

    #[tokio::test]
    async fn calendar_renders_title_as_heading() {
        let output = ReadCalendarTool::new(store(), Some("cal".into()))
            .execute(json!({}))
            .await
            .unwrap();
        assert_eq!(output.content, "# Fall Calendar\n\nOct 21: hill repeats");
    }

    #[tokio::test]
    async fn calendar_without_doc_id_fails() {
        let err = ReadCalendarTool::new(store(), None).execute(json!({})).await.unwrap_err();
        assert_eq!(err.kind(), textpilot_core::ToolErrorKind::ExecutionFailed);
        assert!(err.to_string().contains("CALENDAR_DOC_ID"));
    }
}
