//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what let the agent act: send a text, read a document, check the
//! time. Every tool declares a JSON-schema parameter object; the registry
//! validates arguments against it before the handler ever runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// What a handler hands back on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Text fed back to the model
    pub content: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            data: None,
        }
    }

    /// Render a serializable value as pretty JSON and keep it as structured data.
    pub fn json(value: Value) -> Self {
        Self {
            content: serde_json::to_string_pretty(&value).unwrap_or_default(),
            data: Some(value),
        }
    }
}

/// The result paired 1:1 with a model tool call by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// The content fed back into the transcript
    pub content: String,
}

impl ToolResult {
    /// Build the transcript-facing result for one dispatch outcome.
    pub fn from_dispatch(call_id: impl Into<String>, outcome: Result<ToolOutput, ToolError>) -> Self {
        match outcome {
            Ok(output) => Self {
                call_id: call_id.into(),
                success: true,
                content: output.content,
            },
            Err(e) => Self {
                call_id: call_id.into(),
                success: false,
                content: format!("Error ({}): {e}", e.kind()),
            },
        }
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "send_text").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Whether calling this tool changes something outside the process.
    /// Side-effecting tools are refused in dry-run mode.
    fn side_effect(&self) -> bool {
        false
    }

    /// Execute the tool with already-validated arguments.
    async fn execute(&self, arguments: Value) -> std::result::Result<ToolOutput, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Why a tool could not be registered.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistrationError {
    #[error("Tool '{0}' is already registered")]
    Duplicate(String),

    #[error("Tool '{name}' has an invalid parameter schema: {reason}")]
    InvalidSchema { name: String, reason: String },
}

/// A fixed mapping from tool name to handler.
///
/// Built once per process (or per request) and read-only afterwards, so it
/// can be shared behind an `Arc` by concurrent requests.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
    dry_run: bool,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            dry_run: false,
        }
    }

    /// Refuse every side-effecting tool with `DisabledInDryRun`.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Register a tool. Names are unique and schemas must describe an object.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), RegistrationError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistrationError::Duplicate(name));
        }
        let schema = tool.parameters_schema();
        if schema.get("type").and_then(Value::as_str) != Some("object") {
            return Err(RegistrationError::InvalidSchema {
                name,
                reason: "top-level type must be \"object\"".into(),
            });
        }
        if let Some(props) = schema.get("properties")
            && !props.is_object()
        {
            return Err(RegistrationError::InvalidSchema {
                name,
                reason: "\"properties\" must be an object".into(),
            });
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the model), ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up, validate, and run a tool.
    ///
    /// Never panics and never returns anything outside the closed
    /// [`ToolError`] kind set: handler failures other than argument
    /// problems come back as `ExecutionFailed`.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(format!("{name} (available: {})", self.names().join(", "))))?;

        validate_arguments(&tool.parameters_schema(), &arguments)
            .map_err(|reason| ToolError::InvalidArguments(format!("{name}: {reason}")))?;

        if self.dry_run && tool.side_effect() {
            debug!(tool = %name, "Refusing side-effecting tool in dry-run mode");
            return Err(ToolError::DisabledInDryRun(name.to_string()));
        }

        match tool.execute(arguments).await {
            Ok(output) => Ok(output),
            Err(e @ (ToolError::InvalidArguments(_) | ToolError::ExecutionFailed { .. })) => Err(e),
            Err(other) => {
                warn!(tool = %name, error = %other, "Tool handler returned an unexpected error kind");
                Err(ToolError::execution(name, other))
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check `arguments` against the subset of JSON Schema tools declare:
/// object shape, required fields, primitive types, `enum`, and array item types.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Result<(), String> {
    let Some(args) = arguments.as_object() else {
        return Err(format!("arguments must be a JSON object, got {}", type_name(arguments)));
    };

    let mut errors = Vec::new();

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if args.get(field).is_none_or(Value::is_null) {
                errors.push(format!("missing required parameter '{field}'"));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (field, field_schema) in properties {
            let Some(value) = args.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            if let Err(e) = check_value(field, field_schema, value) {
                errors.push(e);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

fn check_value(field: &str, schema: &Value, value: &Value) -> Result<(), String> {
    if let Some(expected) = schema.get("type").and_then(Value::as_str)
        && !type_matches(expected, value)
    {
        return Err(format!(
            "parameter '{field}' should be {expected} but got {}",
            type_name(value)
        ));
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array)
        && !allowed.contains(value)
    {
        return Err(format!("parameter '{field}' must be one of {}", Value::Array(allowed.clone())));
    }

    if let (Some(items), Some(array)) = (schema.get("items"), value.as_array()) {
        for (i, item) in array.iter().enumerate() {
            check_value(&format!("{field}[{i}]"), items, item)?;
        }
    }

    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Null => "null",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolErrorKind;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" },
                    "times": { "type": "integer" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: Value) -> std::result::Result<ToolOutput, ToolError> {
            let text = arguments["text"].as_str().unwrap_or("").to_string();
            Ok(ToolOutput::text(text))
        }
    }

    /// Counts how often its handler actually ran.
    struct EffectTool {
        effects: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Tool for EffectTool {
        fn name(&self) -> &str { "effect" }
        fn description(&self) -> &str { "Changes the world" }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({ "type": "object", "properties": {} })
        }
        fn side_effect(&self) -> bool { true }
        async fn execute(&self, _arguments: Value) -> std::result::Result<ToolOutput, ToolError> {
            self.effects.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ToolError::NotFound("remote resource".into()));
            }
            Ok(ToolOutput::text("done"))
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        let err = registry.register(Box::new(EchoTool)).unwrap_err();
        assert!(matches!(err, RegistrationError::Duplicate(_)));
    }

    #[test]
    fn registry_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
    }

    #[tokio::test]
    async fn dispatch_runs_handler() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        let out = registry
            .dispatch("echo", serde_json::json!({"text": "hello world"}))
            .await
            .unwrap();
        assert_eq!(out.content, "hello world");
    }

    #[tokio::test]
    async fn dispatch_missing_tool() {
        let registry = ToolRegistry::new();
        let err = registry.dispatch("nonexistent", serde_json::json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::NotFound);
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_handler() {
        let effects = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        registry
            .register(Box::new(EffectTool { effects: effects.clone(), fail: false }))
            .unwrap();

        let err = registry.dispatch("echo", serde_json::json!({"times": 2})).await.unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::InvalidArguments);
        assert!(err.to_string().contains("text"));

        let err = registry.dispatch("effect", serde_json::json!("not an object")).await.unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::InvalidArguments);
        assert_eq!(effects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dry_run_blocks_side_effects() {
        let effects = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new().with_dry_run(true);
        registry
            .register(Box::new(EffectTool { effects: effects.clone(), fail: false }))
            .unwrap();
        registry.register(Box::new(EchoTool)).unwrap();

        let err = registry.dispatch("effect", serde_json::json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::DisabledInDryRun);
        assert_eq!(effects.load(Ordering::SeqCst), 0);

        // Read-only tools still work.
        let out = registry.dispatch("echo", serde_json::json!({"text": "ok"})).await.unwrap();
        assert_eq!(out.content, "ok");
    }

    #[tokio::test]
    async fn handler_faults_become_execution_failed() {
        let effects = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry
            .register(Box::new(EffectTool { effects: effects.clone(), fail: true }))
            .unwrap();
        let err = registry.dispatch("effect", serde_json::json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::ExecutionFailed);
        assert_eq!(effects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn validation_checks_enum_and_items() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "units": { "type": "string", "enum": ["a", "b"] },
                "numbers": { "type": "array", "items": { "type": "string" } }
            }
        });
        assert!(validate_arguments(&schema, &serde_json::json!({"units": "a"})).is_ok());
        assert!(validate_arguments(&schema, &serde_json::json!({"units": "c"})).is_err());
        assert!(validate_arguments(&schema, &serde_json::json!({"numbers": ["+1", 2]})).is_err());
    }

    #[test]
    fn failed_dispatch_renders_kind() {
        let r = ToolResult::from_dispatch("c1", Err(ToolError::DisabledInDryRun("send_text".into())));
        assert!(!r.success);
        assert!(r.content.starts_with("Error (disabled_in_dry_run)"));
    }
}
