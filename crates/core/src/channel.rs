//! MessagingService trait: the abstraction over the SMS provider.
//!
//! The gateway receives inbound texts directly over HTTP; this trait covers the
//! outbound side (sending, reading back history) that tools need.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::MessagingError;

/// How a message went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryKind {
    /// Plain SMS to one recipient
    Individual,
    /// Group MMS where every participant sees the thread
    Group,
}

/// Provider receipt for an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    #[serde(rename = "type")]
    pub kind: DeliveryKind,

    /// Provider message id
    pub message_sid: String,

    /// Group conversation id, for group sends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_sid: Option<String>,

    /// Group sends only: an existing thread with the same people was used.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reused_existing: bool,

    pub to: Vec<String>,
    pub from: String,
    pub body: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// One message in a conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsRecord {
    pub sid: String,
    pub from: String,
    pub to: String,
    pub body: String,
    /// `inbound` or `outbound`
    pub direction: String,
    /// RFC 3339 when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_sent: Option<String>,
}

/// Outbound SMS operations.
#[async_trait]
pub trait MessagingService: Send + Sync {
    /// Provider name for logs (e.g. "twilio").
    fn name(&self) -> &str;

    /// The sender's own addressable number.
    fn from_number(&self) -> &str;

    /// Send one SMS to one recipient.
    async fn send_sms(&self, to: &str, body: &str) -> Result<Delivery, MessagingError>;

    /// Send one message to a group thread (two or more recipients).
    async fn send_group(&self, to: &[String], body: &str) -> Result<Delivery, MessagingError>;

    /// Recent messages exchanged with `identifier` (a phone number or a
    /// group conversation id), newest first, at most `limit`.
    async fn history(&self, identifier: &str, limit: usize) -> Result<Vec<SmsRecord>, MessagingError>;
}
