//! Shared test doubles for the agent tests.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use textpilot_core::error::{ProviderError, ToolError};
use textpilot_core::message::{Message, MessageToolCall};
use textpilot_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use textpilot_core::tool::{Tool, ToolOutput};

/// A provider that plays back scripted responses in order.
///
/// Once the script runs out the last response repeats, so a script of one
/// tool-call response loops forever.
pub struct ScriptedProvider {
    script: Vec<Result<ProviderResponse, ProviderError>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<ProviderResponse>) -> Self {
        Self::with_results(script.into_iter().map(Ok).collect())
    }

    pub fn with_results(script: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request seen, in order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        let step = self
            .script
            .get(n)
            .or_else(|| self.script.last())
            .expect("ScriptedProvider needs at least one response");
        step.clone()
    }
}

pub fn text_response(text: &str) -> ProviderResponse {
    respond(Message::assistant(text))
}

pub fn tool_call_response(calls: Vec<MessageToolCall>) -> ProviderResponse {
    respond(Message::assistant_tool_calls(None, calls))
}

fn respond(message: Message) -> ProviderResponse {
    ProviderResponse {
        message,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "scripted-model".into(),
    }
}

pub fn tool_call(id: &str, name: &str, args: Value) -> MessageToolCall {
    MessageToolCall {
        id: id.into(),
        name: name.into(),
        arguments: args.to_string(),
    }
}

/// A side-effecting tool that counts how often it really ran.
#[derive(Clone, Default)]
pub struct CountingEffect {
    pub runs: Arc<AtomicUsize>,
}

impl CountingEffect {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for CountingEffect {
    fn name(&self) -> &str {
        "effect"
    }

    fn description(&self) -> &str {
        "Changes something outside the process"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    fn side_effect(&self) -> bool {
        true
    }

    async fn execute(&self, _arguments: Value) -> Result<ToolOutput, ToolError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(ToolOutput::text("done"))
    }
}
