//! The agent reasoning loop implementation.

use serde_json::Value;
use std::sync::Arc;
use textpilot_core::error::ToolError;
use textpilot_core::message::{Message, MessageToolCall, Transcript};
use textpilot_core::provider::{Provider, ProviderRequest};
use textpilot_core::tool::{ToolRegistry, ToolResult};
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_TURNS: usize = 10;
pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "Sorry, I wasn't able to finish that request. Please try again in a bit.";

/// Terminal state of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// The model produced a final text reply.
    Done,
    /// The turn cap was hit or the model could not be reached.
    Failed,
}

/// Why a run ended in [`LoopState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopFailure {
    TurnBudgetExhausted { turns: usize },
    Provider(String),
}

/// Everything a caller needs to know about a finished run.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub state: LoopState,
    /// The final reply, or the fallback message when the run failed.
    pub text: String,
    /// Number of model invocations made.
    pub turns: usize,
    pub transcript: Transcript,
    pub failure: Option<LoopFailure>,
}

impl AgentOutcome {
    pub fn is_done(&self) -> bool {
        self.state == LoopState::Done
    }
}

/// The core agent loop that orchestrates model calls and tool execution.
///
/// One `AgentLoop` may serve many runs; each [`AgentLoop::run`] builds its
/// own transcript and shares nothing with other runs.
pub struct AgentLoop {
    /// The model provider to use
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Max tokens per response
    max_tokens: Option<u32>,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    /// Maximum model invocations per run
    max_turns: usize,

    /// Reply used when the run fails
    fallback_message: String,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.1,
            max_tokens: None,
            tools,
            max_turns: DEFAULT_MAX_TURNS,
            fallback_message: DEFAULT_FALLBACK_MESSAGE.into(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the maximum number of model invocations. Values below 1 are raised to 1.
    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max.max(1);
        self
    }

    pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_message = message.into();
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Run one conversation to completion.
    ///
    /// Never returns an error: tool failures become tool results the model
    /// can react to, and a provider failure or an exhausted turn budget
    /// ends the run in [`LoopState::Failed`] with the fallback message.
    pub async fn run(&self, system_prompt: &str, user_message: &str) -> AgentOutcome {
        let mut transcript = Transcript::new(system_prompt, user_message);
        let tool_definitions = self.tools.definitions();

        info!(
            model = %self.model,
            tools = tool_definitions.len(),
            dry_run = self.tools.is_dry_run(),
            "Starting agent run"
        );

        for turn in 1..=self.max_turns {
            debug!(turn, messages = transcript.len(), "Agent loop iteration");

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: transcript.messages().to_vec(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_definitions.clone(),
            };

            let response = match self.provider.complete(request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(turn, provider = self.provider.name(), error = %e, "Model call failed");
                    return self.failed(transcript, turn, LoopFailure::Provider(e.to_string()));
                }
            };

            if response.message.tool_calls.is_empty() {
                let text = response.message.text().trim().to_string();
                transcript.push(response.message);
                info!(turn, "Agent run finished");
                return AgentOutcome {
                    state: LoopState::Done,
                    text,
                    turns: turn,
                    transcript,
                    failure: None,
                };
            }

            debug!(turn, tool_count = response.message.tool_calls.len(), "Executing tool calls");
            let mut results = Vec::with_capacity(response.message.tool_calls.len());
            for call in &response.message.tool_calls {
                let result = self.execute_call(call).await;
                results.push(Message::tool_result(&result.call_id, result.content));
            }
            // The request and its whole batch of results land together.
            transcript.push_tool_turn(response.message, results);
        }

        warn!(turns = self.max_turns, "Turn budget exhausted without a final reply");
        let turns = self.max_turns;
        self.failed(transcript, turns, LoopFailure::TurnBudgetExhausted { turns })
    }

    async fn execute_call(&self, call: &MessageToolCall) -> ToolResult {
        let outcome = match parse_arguments(&call.arguments) {
            Ok(arguments) => self.tools.dispatch(&call.name, arguments).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            warn!(tool = %call.name, kind = %e.kind(), error = %e, "Tool call failed");
        } else {
            debug!(tool = %call.name, "Tool call succeeded");
        }
        ToolResult::from_dispatch(&call.id, outcome)
    }

    fn failed(&self, transcript: Transcript, turns: usize, failure: LoopFailure) -> AgentOutcome {
        AgentOutcome {
            state: LoopState::Failed,
            text: self.fallback_message.clone(),
            turns,
            transcript,
            failure: Some(failure),
        }
    }
}

/// Decode the model's argument string. An empty string means no arguments.
fn parse_arguments(raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw)
        .map_err(|e| ToolError::InvalidArguments(format!("arguments are not valid JSON: {e}")))
}
