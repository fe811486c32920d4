//! The tools the textpilot agent can call.
//!
//! Every tool is a small struct holding the collaborators it needs
//! (clock, document store, messaging service) behind `Arc`s, so one
//! [`ToolDeps`] value wires the whole set.

pub mod attendance;
pub mod contacts;
pub mod documents;
pub mod messaging;
pub mod time;

use std::sync::Arc;
use textpilot_core::tool::{RegistrationError, ToolRegistry};
use textpilot_core::{ClockSource, DocumentStore, MessagingService, ToolError};

pub use contacts::ContactDirectory;

/// Everything the tool set talks to.
#[derive(Clone)]
pub struct ToolDeps {
    pub clock: ClockSource,
    /// `None` when no document credentials are configured.
    pub documents: Option<Arc<dyn DocumentStore>>,
    /// `None` when no SMS account is configured.
    pub messaging: Option<Arc<dyn MessagingService>>,
    /// Recipient of `text_me`.
    pub owner_number: Option<String>,
    pub phone_directory_doc_id: Option<String>,
    pub attendance_sheet_id: Option<String>,
    /// Document read by `read_calendar`.
    pub calendar_doc_id: Option<String>,
}

impl ToolDeps {
    /// Deps with nothing external configured: only the clock and the
    /// built-in contacts work.
    pub fn offline(clock: ClockSource) -> Self {
        Self {
            clock,
            documents: None,
            messaging: None,
            owner_number: None,
            phone_directory_doc_id: None,
            attendance_sheet_id: None,
            calendar_doc_id: None,
        }
    }

    pub fn contact_directory(&self) -> ContactDirectory {
        ContactDirectory::new(self.documents.clone(), self.phone_directory_doc_id.clone())
    }
}

/// Build the registry with every tool the agent is offered.
pub fn default_registry(deps: &ToolDeps, dry_run: bool) -> Result<ToolRegistry, RegistrationError> {
    let mut registry = ToolRegistry::new().with_dry_run(dry_run);
    let directory = deps.contact_directory();

    registry.register(Box::new(time::GetCurrentTimeTool::new(deps.clock)))?;
    registry.register(Box::new(contacts::GetContactTool::new(directory.clone())))?;
    registry.register(Box::new(contacts::GetPhoneNumbersTool::new(directory.clone())))?;
    registry.register(Box::new(documents::ListDocumentsTool::new(deps.documents.clone())))?;
    registry.register(Box::new(documents::ReadDocumentTool::new(deps.documents.clone())))?;
    registry.register(Box::new(documents::ReadSpreadsheetTool::new(deps.documents.clone())))?;
    registry.register(Box::new(documents::ReadCalendarTool::new(
        deps.documents.clone(),
        deps.calendar_doc_id.clone(),
    )))?;
    registry.register(Box::new(messaging::ConversationHistoryTool::new(
        deps.messaging.clone(),
    )))?;
    registry.register(Box::new(messaging::SendTextTool::new(
        deps.messaging.clone(),
        directory,
    )))?;
    registry.register(Box::new(messaging::TextMeTool::new(
        deps.messaging.clone(),
        deps.owner_number.clone(),
    )))?;
    registry.register(Box::new(attendance::WriteAttendanceTool::new(
        deps.documents.clone(),
        deps.attendance_sheet_id.clone(),
        deps.clock,
    )))?;
    Ok(registry)
}

/// A required string argument, trimmed and non-empty.
pub(crate) fn required_str<'a>(arguments: &'a serde_json::Value, field: &str) -> Result<&'a str, ToolError> {
    arguments[field]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("'{field}' must be a non-empty string")))
}

/// The configured collaborator, or an execution failure naming what is missing.
pub(crate) fn configured<'a, T: ?Sized>(
    dep: &'a Option<Arc<T>>,
    tool: &str,
    what: &str,
) -> Result<&'a T, ToolError> {
    dep.as_deref()
        .ok_or_else(|| ToolError::execution(tool, format!("{what} is not configured")))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_the_full_tool_set() {
        let registry = default_registry(&ToolDeps::offline(ClockSource::System), false).unwrap();
        assert_eq!(
            registry.names(),
            vec![
                "get_contact",
                "get_conversation_history",
                "get_current_time",
                "get_phone_numbers",
                "list_google_documents",
                "read_calendar",
                "read_google_document",
                "read_spreadsheet",
                "send_text",
                "text_me",
                "write_attendance",
            ]
        );
    }

    #[test]
    fn only_outbound_tools_have_side_effects() {
        let registry = default_registry(&ToolDeps::offline(ClockSource::System), true).unwrap();
        let mut effectful: Vec<&str> = registry
            .names()
            .into_iter()
            .filter(|n| registry.get(n).is_some_and(|t| t.side_effect()))
            .collect();
        effectful.sort();
        assert_eq!(effectful, vec!["send_text", "text_me", "write_attendance"]);
        assert!(registry.is_dry_run());
    }

    #[tokio::test]
    async fn unconfigured_collaborators_fail_softly() {
        let registry = default_registry(&ToolDeps::offline(ClockSource::System), false).unwrap();
        let err = registry
            .dispatch("read_google_document", serde_json::json!({"document_id": "abc"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), textpilot_core::ToolErrorKind::ExecutionFailed);
        assert!(err.to_string().contains("not configured"));
    }
}
