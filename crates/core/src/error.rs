//! Error types for the textpilot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all textpilot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Messaging errors ---
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    // --- Document store errors ---
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Webhook authentication ---
    #[error("Signature error: {0}")]
    Signature(#[from] SignatureError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures talking to the SMS provider.
#[derive(Debug, Clone, Error)]
pub enum MessagingError {
    #[error("Messaging not configured: {0}")]
    NotConfigured(String),

    #[error("Cannot send messages to unauthorized phone numbers: {}", numbers.join(", "))]
    UnauthorizedRecipients { numbers: Vec<String> },

    #[error("Messaging API error (status {status_code}): {message}")]
    Api { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures reading from (or writing to) the document store.
#[derive(Debug, Clone, Error)]
pub enum DocumentError {
    #[error("Document store not configured: {0}")]
    NotConfigured(String),

    #[error("Document store authentication failed: {0}")]
    Auth(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Access denied to document {document_id}: {reason}")]
    PermissionDenied { document_id: String, reason: String },

    #[error("Document {0} is empty")]
    EmptyDocument(String),

    #[error("Document API error (status {status_code}): {message}")]
    Api { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),
}

/// Why an inbound webhook request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Missing request signature header")]
    Missing,

    #[error("Malformed request signature: {0}")]
    Malformed(String),

    #[error("Request signature does not match")]
    Mismatch,

    #[error("No signing secret configured")]
    NoSecret,
}

/// The closed set of failure kinds a tool dispatch can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    NotFound,
    InvalidArguments,
    ExecutionFailed,
    DisabledInDryRun,
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ToolErrorKind::NotFound => "not_found",
            ToolErrorKind::InvalidArguments => "invalid_arguments",
            ToolErrorKind::ExecutionFailed => "execution_failed",
            ToolErrorKind::DisabledInDryRun => "disabled_in_dry_run",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool {0} is disabled in dry-run mode; nothing was sent or written")]
    DisabledInDryRun(String),
}

impl ToolError {
    pub fn kind(&self) -> ToolErrorKind {
        match self {
            ToolError::NotFound(_) => ToolErrorKind::NotFound,
            ToolError::InvalidArguments(_) => ToolErrorKind::InvalidArguments,
            ToolError::ExecutionFailed { .. } => ToolErrorKind::ExecutionFailed,
            ToolError::DisabledInDryRun(_) => ToolErrorKind::DisabledInDryRun,
        }
    }

    /// Wrap any handler-side failure as `ExecutionFailed`.
    pub fn execution(tool_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ToolError::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: reason.to_string(),
        }
    }
}
