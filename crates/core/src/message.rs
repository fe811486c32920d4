//! Message and Transcript domain types.
//!
//! These are the value objects that flow through a single agent run:
//! inbound text → Transcript → Provider → tool calls → tool results → final text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (fetched prompt)
    System,
    /// The inbound text or synthetic trigger
    User,
    /// The model
    Assistant,
    /// Tool execution result
    Tool,
}

/// A single message in a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content (assistant turns that only request tools carry none)
    #[serde(default)]
    pub content: Option<String>,

    /// Tool calls requested by the assistant, in the order the model issued them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn build(role: Role, content: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::build(Role::System, Some(content.into()))
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::build(Role::User, Some(content.into()))
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::build(Role::Assistant, Some(content.into()))
    }

    /// Create an assistant message that requests tool calls.
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<MessageToolCall>) -> Self {
        let mut msg = Self::build(Role::Assistant, content);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::build(Role::Tool, Some(content.into()));
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// The text content, or `""` when the message has none.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call (unique within a turn)
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as a JSON string, exactly as the model produced them
    pub arguments: String,
}

/// The ordered, append-only record of one agent run.
///
/// Messages can only be added, never edited or removed. Tool results for a
/// turn go in through [`Transcript::push_tool_turn`] so the model never sees
/// a partial batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Start a transcript with the system prompt and the user message.
    pub fn new(system_prompt: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::user(user_message)],
        }
    }

    /// Append a single message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append an assistant tool-call message together with all of its results.
    pub fn push_tool_turn(&mut self, request: Message, results: Vec<Message>) {
        self.messages.push(request);
        self.messages.extend(results);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The last message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "Hello, agent!");
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn tool_call_message_may_have_no_content() {
        let msg = Message::assistant_tool_calls(
            None,
            vec![MessageToolCall {
                id: "call_1".into(),
                name: "get_current_time".into(),
                arguments: "{}".into(),
            }],
        );
        assert_eq!(msg.text(), "");
        assert_eq!(msg.tool_calls.len(), 1);
    }

    #[test]
    fn transcript_starts_with_system_then_user() {
        let t = Transcript::new("You are helpful", "hi");
        assert_eq!(t.len(), 2);
        assert_eq!(t.messages()[0].role, Role::System);
        assert_eq!(t.messages()[1].role, Role::User);
    }

    #[test]
    fn tool_turn_is_appended_as_one_batch() {
        let mut t = Transcript::new("sys", "user");
        let request = Message::assistant_tool_calls(
            None,
            vec![
                MessageToolCall { id: "a".into(), name: "x".into(), arguments: "{}".into() },
                MessageToolCall { id: "b".into(), name: "y".into(), arguments: "{}".into() },
            ],
        );
        t.push_tool_turn(
            request,
            vec![Message::tool_result("a", "1"), Message::tool_result("b", "2")],
        );
        assert_eq!(t.len(), 5);
        assert_eq!(t.messages()[3].tool_call_id.as_deref(), Some("a"));
        assert_eq!(t.messages()[4].tool_call_id.as_deref(), Some("b"));
    }

    #[test]
    fn message_serialization_uses_lowercase_roles() {
        let msg = Message::tool_result("call_1", "ok");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"tool\""));
        assert!(json.contains("call_1"));
    }
}
