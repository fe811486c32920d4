//! Attendance sheet writer.
//!
//! Each call inserts a fresh column C in the first sheet: the date on top,
//! then the run name, then one attendee per row. Older columns shift right.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use textpilot_core::clock::ClockSource;
use textpilot_core::document::{AttendanceRecord, DocumentStore};
use textpilot_core::error::ToolError;
use textpilot_core::tool::{Tool, ToolOutput};
use tracing::info;

use crate::configured;

#[derive(Debug, Deserialize)]
struct AttendanceArgs {
    names: Vec<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    run_name: Option<String>,
}

pub struct WriteAttendanceTool {
    store: Option<Arc<dyn DocumentStore>>,
    sheet_id: Option<String>,
    clock: ClockSource,
}

impl WriteAttendanceTool {
    pub fn new(store: Option<Arc<dyn DocumentStore>>, sheet_id: Option<String>, clock: ClockSource) -> Self {
        Self {
            store,
            sheet_id: sheet_id.filter(|id| !id.trim().is_empty()),
            clock,
        }
    }

    fn record(&self, args: AttendanceArgs) -> Result<AttendanceRecord, ToolError> {
        let names: Vec<String> = args
            .names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            return Err(ToolError::InvalidArguments("'names' must list at least one attendee".into()));
        }
        let date = args
            .date
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| self.clock.now().format("%-m/%-d/%Y").to_string());
        Ok(AttendanceRecord {
            date,
            run_name: args.run_name.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            names,
        })
    }
}

#[async_trait]
impl Tool for WriteAttendanceTool {
    fn name(&self) -> &str {
        "write_attendance"
    }

    fn description(&self) -> &str {
        "Record who attended a run in the attendance spreadsheet. Adds a new column with the \
         date, the run name and one attendee per row."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "names": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Names of everyone who attended"
                },
                "date": {
                    "type": "string",
                    "description": "Date of the run, e.g. 1/15/2024 (defaults to today)"
                },
                "run_name": {
                    "type": "string",
                    "description": "Optional name of the run or workout"
                }
            },
            "required": ["names"]
        })
    }

    fn side_effect(&self) -> bool {
        true
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let args: AttendanceArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let record = self.record(args)?;
        let sheet_id = self
            .sheet_id
            .as_deref()
            .ok_or_else(|| ToolError::execution(self.name(), "ATTENDANCE_SHEET_ID is not configured"))?;
        let store = configured(&self.store, self.name(), "Google document access")?;

        let receipt = store
            .insert_attendance_column(sheet_id, &record)
            .await
            .map_err(|e| ToolError::execution(self.name(), e))?;
        info!(attendees = record.names.len(), range = %receipt.updated_range, "Attendance recorded");

        Ok(ToolOutput::json(json!({
            "status": "recorded",
            "date": record.date,
            "run_name": record.run_name,
            "attendee_count": record.names.len(),
            "updated_range": receipt.updated_range,
            "updated_cells": receipt.updated_cells,
        })))
    }
}
