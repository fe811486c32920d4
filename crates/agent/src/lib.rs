//! The textpilot agent: a bounded tool-calling loop.
//!
//! 1. **Receive** a user message (an inbound text or a scheduled trigger)
//! 2. **Send** the transcript and tool schema to the model
//! 3. **If tool calls**: dispatch them, append every result, go back to 2
//! 4. **If text**: that is the answer
//!
//! The loop stops at the first text-only reply or when the turn cap is
//! reached, whichever comes first.

pub mod factory;
pub mod loop_runner;
pub mod prompts;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use factory::{AgentFactory, AgentSettings};
pub use loop_runner::{AgentLoop, AgentOutcome, LoopFailure, LoopState};
pub use prompts::{InboundText, DEFAULT_SYSTEM_PROMPT};
pub use scheduler::{PingOptions, PingOutcome, Scheduler, SchedulerError};
