//! In-memory document store.
//!
//! Useful for testing and offline runs. Documents and sheets are seeded up
//! front; attendance writes land in an inspectable list.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use textpilot_core::document::{
    AttendanceReceipt, AttendanceRecord, Document, DocumentStore, DocumentSummary,
};
use textpilot_core::error::DocumentError;

#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: Vec<Document>,
    sheets: HashMap<String, Vec<Vec<String>>>,
    /// When set, every call fails with a clone of this error.
    failure: Option<DocumentError>,
    reads: AtomicUsize,
    attendance: Mutex<Vec<(String, AttendanceRecord)>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, id: &str, title: &str, text: &str) -> Self {
        self.documents.push(Document {
            id: id.into(),
            title: title.into(),
            text: text.into(),
        });
        self
    }

    pub fn with_sheet(mut self, id: &str, rows: Vec<Vec<String>>) -> Self {
        self.sheets.insert(id.into(), rows);
        self
    }

    /// A store that is unreachable.
    pub fn failing(error: DocumentError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// How many document reads were served.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Attendance columns written so far, oldest first.
    pub fn attendance_writes(&self) -> Vec<(String, AttendanceRecord)> {
        self.attendance.lock().map(|w| w.clone()).unwrap_or_default()
    }

    fn check(&self) -> Result<(), DocumentError> {
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list_documents(&self, limit: u32) -> Result<Vec<DocumentSummary>, DocumentError> {
        self.check()?;
        // Seeding order stands in for modification time: last added is newest.
        Ok(self
            .documents
            .iter()
            .rev()
            .take(limit as usize)
            .map(|d| DocumentSummary {
                id: d.id.clone(),
                name: d.title.clone(),
                modified_time: None,
                created_time: None,
                owner: None,
                web_view_link: None,
                shared: false,
            })
            .collect())
    }

    async fn read_document(&self, document_id: &str) -> Result<Document, DocumentError> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.documents
            .iter()
            .find(|d| d.id == document_id)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound(document_id.to_string()))
    }

    async fn read_range(&self, spreadsheet_id: &str, _range: &str) -> Result<Vec<Vec<String>>, DocumentError> {
        self.check()?;
        self.sheets
            .get(spreadsheet_id)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound(spreadsheet_id.to_string()))
    }

    async fn insert_attendance_column(
        &self,
        spreadsheet_id: &str,
        record: &AttendanceRecord,
    ) -> Result<AttendanceReceipt, DocumentError> {
        self.check()?;
        let cells = record.cells().len() as u32;
        self.attendance
            .lock()
            .map_err(|_| DocumentError::Api { status_code: 500, message: "store poisoned".into() })?
            .push((spreadsheet_id.to_string(), record.clone()));
        Ok(AttendanceReceipt {
            spreadsheet_id: spreadsheet_id.to_string(),
            updated_range: format!("Sheet1!C1:C{cells}"),
            updated_cells: cells,
        })
    }
}
