//! # textpilot core
//!
//! Domain types, traits, and error definitions for the textpilot SMS agent.
//! Every external collaborator (language model, SMS provider, document store)
//! is a trait here; the other crates implement against it.

pub mod error;
pub mod message;
pub mod provider;
pub mod channel;
pub mod clock;
pub mod contact;
pub mod document;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{
    DocumentError, Error, MessagingError, ProviderError, Result, SignatureError, ToolError,
    ToolErrorKind,
};
pub use message::{Message, MessageToolCall, Role, Transcript};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use channel::{Delivery, DeliveryKind, MessagingService, SmsRecord};
pub use clock::{ClockSource, SimulatedTimeError, TimeSnapshot, EASTERN};
pub use contact::{Contact, ContactBook, ContactMatch};
pub use document::{
    fetch_system_prompt, AttendanceReceipt, AttendanceRecord, Document, DocumentStore,
    DocumentSummary,
};
pub use tool::{RegistrationError, Tool, ToolOutput, ToolRegistry, ToolResult};
