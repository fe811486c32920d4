//! Google Docs / Drive / Sheets client implementing [`DocumentStore`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use textpilot_core::document::{
    AttendanceReceipt, AttendanceRecord, Document, DocumentStore, DocumentSummary,
};
use textpilot_core::error::DocumentError;
use tracing::{info, warn};

use crate::auth::{ServiceAccountAuth, ServiceAccountKey};
use crate::extract::extract_text;

/// API roots, overridable for tests against a local stub.
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub docs: String,
    pub drive: String,
    pub sheets: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            docs: "https://docs.googleapis.com/v1".into(),
            drive: "https://www.googleapis.com/drive/v3".into(),
            sheets: "https://sheets.googleapis.com/v4".into(),
        }
    }
}

pub struct GoogleDocuments {
    auth: ServiceAccountAuth,
    endpoints: GoogleEndpoints,
    client: reqwest::Client,
}

impl GoogleDocuments {
    pub fn new(key: ServiceAccountKey) -> Result<Self, DocumentError> {
        Self::with_endpoints(key, GoogleEndpoints::default())
    }

    pub fn with_endpoints(key: ServiceAccountKey, endpoints: GoogleEndpoints) -> Result<Self, DocumentError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| DocumentError::Network(e.to_string()))?;
        Ok(Self {
            auth: ServiceAccountAuth::new(key, client.clone()),
            endpoints,
            client,
        })
    }

    /// Build from the base64 service-account blob kept in configuration.
    pub fn from_base64(encoded: Option<&str>) -> Result<Self, DocumentError> {
        let encoded = encoded
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| DocumentError::NotConfigured("GOOGLE_SERVICE_ACCOUNT_B64 is not set".into()))?;
        Self::new(ServiceAccountKey::from_base64(encoded)?)
    }

    async fn send(&self, request: reqwest::RequestBuilder, resource: &str) -> Result<Value, DocumentError> {
        let token = self.auth.token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| DocumentError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if (200..300).contains(&status) {
            return response.json().await.map_err(|e| DocumentError::Api {
                status_code: status,
                message: format!("Failed to parse response: {e}"),
            });
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status, resource, "Google API returned error");
        Err(map_status(status, resource, &body))
    }

    /// Sheets URL with the A1 range encoded as a single path segment.
    fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<reqwest::Url, DocumentError> {
        let mut url = reqwest::Url::parse(&format!(
            "{}/spreadsheets/{spreadsheet_id}/values/",
            self.endpoints.sheets.trim_end_matches('/')
        ))
        .map_err(|e| DocumentError::Api { status_code: 0, message: e.to_string() })?;
        url.path_segments_mut()
            .map_err(|_| DocumentError::Api { status_code: 0, message: "invalid sheets URL".into() })?
            .pop_if_empty()
            .push(range);
        Ok(url)
    }
}

fn map_status(status: u16, resource: &str, body: &str) -> DocumentError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.to_string());
    match status {
        401 => DocumentError::Auth(message),
        403 => DocumentError::PermissionDenied {
            document_id: resource.to_string(),
            reason: message,
        },
        404 => DocumentError::NotFound(format!("{resource}: {message}")),
        _ => DocumentError::Api { status_code: status, message },
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default)]
    modified_time: Option<String>,
    #[serde(default)]
    created_time: Option<String>,
    #[serde(default)]
    web_view_link: Option<String>,
    #[serde(default)]
    shared: bool,
    #[serde(default)]
    owners: Vec<DriveOwner>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveOwner {
    #[serde(default)]
    display_name: Option<String>,
}

impl From<DriveFile> for DocumentSummary {
    fn from(f: DriveFile) -> Self {
        DocumentSummary {
            id: f.id,
            name: f.name,
            modified_time: f.modified_time,
            created_time: f.created_time,
            owner: f.owners.into_iter().next().and_then(|o| o.display_name),
            web_view_link: f.web_view_link,
            shared: f.shared,
        }
    }
}

/// Rows of a `values.get` response as strings.
fn values_to_rows(payload: &Value) -> Vec<Vec<String>> {
    payload
        .get("values")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .map(|row| {
            row.as_array()
                .into_iter()
                .flatten()
                .map(|cell| match cell {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

/// An A1 range on a named sheet. The name is always quoted so titles with
/// spaces or apostrophes survive.
fn sheet_range(sheet_title: &str, cells: &str) -> String {
    format!("'{}'!{cells}", sheet_title.replace('\'', "''"))
}

#[async_trait]
impl DocumentStore for GoogleDocuments {
    async fn list_documents(&self, limit: u32) -> Result<Vec<DocumentSummary>, DocumentError> {
        let url = format!("{}/files", self.endpoints.drive.trim_end_matches('/'));
        let request = self.client.get(&url).query(&[
            ("q", "mimeType='application/vnd.google-apps.document'".to_string()),
            ("pageSize", limit.to_string()),
            ("orderBy", "modifiedTime desc".to_string()),
            (
                "fields",
                "files(id,name,modifiedTime,createdTime,owners,webViewLink,shared)".to_string(),
            ),
        ]);
        let payload = self.send(request, "drive").await?;

        let files: Vec<DriveFile> = serde_json::from_value(payload.get("files").cloned().unwrap_or(json!([])))
            .map_err(|e| DocumentError::Api { status_code: 200, message: e.to_string() })?;
        info!(count = files.len(), "Listed documents");
        Ok(files.into_iter().map(DocumentSummary::from).collect())
    }

    async fn read_document(&self, document_id: &str) -> Result<Document, DocumentError> {
        let url = format!("{}/documents/{document_id}", self.endpoints.docs.trim_end_matches('/'));
        let payload = self.send(self.client.get(&url), document_id).await?;
        let title = payload
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("Untitled Document")
            .to_string();
        info!(document_id, title = %title, "Read document");
        Ok(Document {
            id: document_id.to_string(),
            title,
            text: extract_text(&payload),
        })
    }

    async fn read_range(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>, DocumentError> {
        let url = self.values_url(spreadsheet_id, range)?;
        let payload = self.send(self.client.get(url), spreadsheet_id).await?;
        Ok(values_to_rows(&payload))
    }

    async fn insert_attendance_column(
        &self,
        spreadsheet_id: &str,
        record: &AttendanceRecord,
    ) -> Result<AttendanceReceipt, DocumentError> {
        let base = format!(
            "{}/spreadsheets/{spreadsheet_id}",
            self.endpoints.sheets.trim_end_matches('/')
        );

        let meta = self
            .send(
                self.client.get(&base).query(&[("fields", "sheets.properties")]),
                spreadsheet_id,
            )
            .await?;
        let first = meta
            .pointer("/sheets/0/properties")
            .ok_or_else(|| DocumentError::NotFound(format!("{spreadsheet_id}: no sheets in spreadsheet")))?;
        let sheet_title = first.get("title").and_then(Value::as_str).unwrap_or("Sheet1").to_string();
        let sheet_id = first.get("sheetId").and_then(Value::as_i64).unwrap_or(0);

        let insert = json!({
            "requests": [{
                "insertDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "COLUMNS",
                        "startIndex": 2,
                        "endIndex": 3
                    },
                    "inheritFromBefore": false
                }
            }]
        });
        self.send(
            self.client.post(format!("{base}:batchUpdate")).json(&insert),
            spreadsheet_id,
        )
        .await?;

        let cells = record.cells();
        let range = sheet_range(&sheet_title, &format!("C1:C{}", cells.len()));
        let values: Vec<Vec<String>> = cells.into_iter().map(|c| vec![c]).collect();
        let cell_count = values.len() as u64;
        let url = self.values_url(spreadsheet_id, &range)?;
        let result = self
            .send(
                self.client
                    .put(url)
                    .query(&[("valueInputOption", "USER_ENTERED")])
                    .json(&json!({ "values": values })),
                spreadsheet_id,
            )
            .await?;

        let updated_cells = result
            .get("updatedCells")
            .and_then(Value::as_u64)
            .unwrap_or(cell_count) as u32;
        info!(spreadsheet_id, attendees = record.names.len(), "Wrote attendance column");
        Ok(AttendanceReceipt {
            spreadsheet_id: spreadsheet_id.to_string(),
            updated_range: result
                .get("updatedRange")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or(range),
            updated_cells,
        })
    }
}
