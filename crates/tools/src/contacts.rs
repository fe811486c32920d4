//! Contact lookup tools and the directory they share with `send_text`.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use textpilot_core::contact::{ContactBook, ContactMatch};
use textpilot_core::document::DocumentStore;
use textpilot_core::error::{DocumentError, ToolError};
use textpilot_core::tool::{Tool, ToolOutput};
use textpilot_documents::parse_phone_directory;
use tracing::warn;

use crate::required_str;

/// Where contacts come from: the built-in list plus, when configured, the
/// phone-directory document. The document is read on every lookup so edits
/// show up without a restart.
#[derive(Clone)]
pub struct ContactDirectory {
    documents: Option<Arc<dyn DocumentStore>>,
    doc_id: Option<String>,
}

impl ContactDirectory {
    pub fn new(documents: Option<Arc<dyn DocumentStore>>, doc_id: Option<String>) -> Self {
        Self {
            documents,
            doc_id: doc_id.filter(|id| !id.trim().is_empty()),
        }
    }

    /// Only the contacts parsed from the directory document.
    pub async fn directory(&self) -> Result<ContactBook, DocumentError> {
        let (Some(store), Some(doc_id)) = (&self.documents, &self.doc_id) else {
            return Err(DocumentError::NotConfigured("PHONE_DIRECTORY_DOC_ID is not set".into()));
        };
        let document = store.read_document(doc_id).await?;
        Ok(ContactBook::new(parse_phone_directory(&document.text)))
    }

    /// Built-in contacts merged with the directory. A directory that cannot
    /// be read leaves just the built-in list.
    pub async fn book(&self) -> ContactBook {
        let mut book = ContactBook::builtin();
        if self.doc_id.is_none() {
            return book;
        }
        match self.directory().await {
            Ok(directory) => book.merge(directory.contacts().iter().cloned()),
            Err(e) => warn!(error = %e, "Phone directory unavailable, using built-in contacts"),
        }
        book
    }
}

/// Resolve a name to a phone number.
pub struct GetContactTool {
    directory: ContactDirectory,
}

impl GetContactTool {
    pub fn new(directory: ContactDirectory) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for GetContactTool {
    fn name(&self) -> &str {
        "get_contact"
    }

    fn description(&self) -> &str {
        "Look up a contact's phone number by name. Matching is case-insensitive and \
         accepts partial names; if several contacts match, ask the user which one they mean."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Full or partial name of the contact"
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let name = required_str(&arguments, "name")?;
        let book = self.directory.book().await;

        let result = match book.resolve(name) {
            ContactMatch::Found(contact) => json!({
                "status": "found",
                "name": contact.name,
                "phone": contact.phone,
                "notes": contact.notes,
            }),
            ContactMatch::NotFound => json!({
                "status": "not_found",
                "query": name,
                "message": format!("No contact matches '{name}'.\n{}", book.describe()),
            }),
            ContactMatch::Ambiguous(candidates) => json!({
                "status": "ambiguous",
                "query": name,
                "candidates": candidates,
            }),
        };
        Ok(ToolOutput::json(result))
    }
}

/// Dump the phone directory.
pub struct GetPhoneNumbersTool {
    directory: ContactDirectory,
}

impl GetPhoneNumbersTool {
    pub fn new(directory: ContactDirectory) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for GetPhoneNumbersTool {
    fn name(&self) -> &str {
        "get_phone_numbers"
    }

    fn description(&self) -> &str {
        "Get every name and phone number from the phone directory document."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: Value) -> Result<ToolOutput, ToolError> {
        let book = self
            .directory
            .directory()
            .await
            .map_err(|e| ToolError::execution(self.name(), e))?;

        let contacts: Vec<Value> = book
            .contacts()
            .iter()
            .map(|c| json!({ "name": c.name, "phone_number": c.phone }))
            .collect();
        Ok(ToolOutput::json(json!({
            "count": contacts.len(),
            "contacts": contacts,
        })))
    }
}
