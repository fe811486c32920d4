//! SMS tools: send to contacts, text the owner, read back a thread.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use textpilot_core::channel::MessagingService;
use textpilot_core::error::{MessagingError, ToolError};
use textpilot_core::tool::{Tool, ToolOutput};
use tracing::{info, warn};

use crate::contacts::ContactDirectory;
use crate::{configured, required_str};

const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
struct SendTextArgs {
    to_numbers: Vec<String>,
    message: String,
}

/// Text one or more people from the contact directory.
pub struct SendTextTool {
    messaging: Option<Arc<dyn MessagingService>>,
    directory: ContactDirectory,
}

impl SendTextTool {
    pub fn new(messaging: Option<Arc<dyn MessagingService>>, directory: ContactDirectory) -> Self {
        Self { messaging, directory }
    }
}

#[async_trait]
impl Tool for SendTextTool {
    fn name(&self) -> &str {
        "send_text"
    }

    fn description(&self) -> &str {
        "Send a text message. One number sends a normal SMS; two or more start a group \
         thread where everyone sees replies. Every number must be in the contact directory \
         (use get_contact to look numbers up)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "to_numbers": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Recipient phone numbers in E.164 format, e.g. +12035551234"
                },
                "message": {
                    "type": "string",
                    "description": "The message text"
                }
            },
            "required": ["to_numbers", "message"]
        })
    }

    fn side_effect(&self) -> bool {
        true
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let args: SendTextArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        if args.message.trim().is_empty() {
            return Err(ToolError::InvalidArguments("'message' must not be empty".into()));
        }

        let mut recipients: Vec<String> = Vec::new();
        for number in args.to_numbers.iter().map(|n| n.trim()) {
            if !number.is_empty() && !recipients.iter().any(|r| r == number) {
                recipients.push(number.to_string());
            }
        }
        if recipients.is_empty() {
            return Err(ToolError::InvalidArguments("'to_numbers' must list at least one number".into()));
        }

        let book = self.directory.book().await;
        let unauthorized: Vec<String> = recipients
            .iter()
            .filter(|n| !book.contains_phone(n))
            .cloned()
            .collect();
        if !unauthorized.is_empty() {
            warn!(numbers = ?unauthorized, "Refusing to text numbers outside the contact directory");
            let error = MessagingError::UnauthorizedRecipients { numbers: unauthorized };
            return Err(ToolError::execution(self.name(), format!("{error}\n\n{}", book.describe())));
        }

        if recipients.len() > 1 {
            let non_us: Vec<&str> = recipients
                .iter()
                .filter(|n| !n.starts_with("+1"))
                .map(String::as_str)
                .collect();
            if !non_us.is_empty() {
                return Err(ToolError::InvalidArguments(format!(
                    "group texts only support US/Canada (+1) numbers; not supported: {}",
                    non_us.join(", ")
                )));
            }
        }

        let messaging = configured(&self.messaging, self.name(), "SMS sending")?;
        let sent = match recipients.as_slice() {
            [single] => messaging.send_sms(single, &args.message).await,
            group => messaging.send_group(group, &args.message).await,
        };
        let delivery = sent.map_err(|e| ToolError::execution(self.name(), e))?;

        let names: Vec<&str> = recipients
            .iter()
            .filter_map(|n| book.find_by_phone(n).map(|c| c.name.as_str()))
            .collect();
        info!(recipients = recipients.len(), sid = %delivery.message_sid, "Text sent");

        let mut data = serde_json::to_value(&delivery).map_err(|e| ToolError::execution(self.name(), e))?;
        data["recipient_names"] = json!(names);
        data["status"] = json!(delivery.status.as_deref().unwrap_or("sent"));
        Ok(ToolOutput::json(data))
    }
}

/// Text the owner of the assistant.
pub struct TextMeTool {
    messaging: Option<Arc<dyn MessagingService>>,
    owner_number: Option<String>,
}

impl TextMeTool {
    pub fn new(messaging: Option<Arc<dyn MessagingService>>, owner_number: Option<String>) -> Self {
        Self {
            messaging,
            owner_number: owner_number.filter(|n| !n.trim().is_empty()),
        }
    }
}

#[async_trait]
impl Tool for TextMeTool {
    fn name(&self) -> &str {
        "text_me"
    }

    fn description(&self) -> &str {
        "Send a text message to the owner of this assistant."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message text"
                }
            },
            "required": ["message"]
        })
    }

    fn side_effect(&self) -> bool {
        true
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let message = required_str(&arguments, "message")?;
        let owner = self
            .owner_number
            .as_deref()
            .ok_or_else(|| ToolError::execution(self.name(), "MY_PHONE_NUMBER is not configured"))?;
        let messaging = configured(&self.messaging, self.name(), "SMS sending")?;

        let delivery = messaging
            .send_sms(owner, message)
            .await
            .map_err(|e| ToolError::execution(self.name(), e))?;
        info!(sid = %delivery.message_sid, "Texted owner");
        Ok(ToolOutput::text(format!("Message sent to {owner} (sid {}).", delivery.message_sid)))
    }
}

/// Recent messages with a number or group thread.
pub struct ConversationHistoryTool {
    messaging: Option<Arc<dyn MessagingService>>,
}

impl ConversationHistoryTool {
    pub fn new(messaging: Option<Arc<dyn MessagingService>>) -> Self {
        Self { messaging }
    }
}

#[async_trait]
impl Tool for ConversationHistoryTool {
    fn name(&self) -> &str {
        "get_conversation_history"
    }

    fn description(&self) -> &str {
        "Get recent text messages exchanged with a phone number (or a group conversation id), newest first."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "phone_number": {
                    "type": "string",
                    "description": "Phone number in E.164 format, or a group conversation id"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum messages to return (default 20)",
                    "default": DEFAULT_HISTORY_LIMIT
                }
            },
            "required": ["phone_number"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let identifier = required_str(&arguments, "phone_number")?;
        let limit = arguments["limit"]
            .as_u64()
            .filter(|n| *n > 0)
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_HISTORY_LIMIT);
        let messaging = configured(&self.messaging, self.name(), "SMS history")?;

        let records = messaging
            .history(identifier, limit)
            .await
            .map_err(|e| ToolError::execution(self.name(), e))?;
        if records.is_empty() {
            return Ok(ToolOutput::text(format!("No messages found with {identifier}.")));
        }
        Ok(ToolOutput::json(json!({
            "with": identifier,
            "count": records.len(),
            "messages": records,
        })))
    }
}
