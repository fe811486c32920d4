//! Scheduled check-in runs (the `ping` command).
//!
//! A run parses the optional simulated time, checks the active-hours
//! window, fetches the system prompt and drives the agent loop once.

use std::sync::Arc;
use textpilot_config::AppConfig;
use textpilot_core::clock::{ClockSource, SimulatedTimeError};
use textpilot_core::error::DocumentError;
use textpilot_core::provider::Provider;
use textpilot_core::tool::RegistrationError;
use textpilot_tools::ToolDeps;
use tracing::{error, info, warn};

use crate::factory::{AgentFactory, AgentSettings};
use crate::loop_runner::{AgentOutcome, LoopState};
use crate::prompts::scheduled_check_in;

/// Command-line options for one scheduled run.
#[derive(Debug, Clone, Default)]
pub struct PingOptions {
    pub dry_run: bool,
    /// `YYYY-MM-DD,HH:MM` or `YYYY-MM-DD`, interpreted in Eastern time.
    pub simulate_time: Option<String>,
}

/// Fatal conditions that stop a run before the loop starts.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid --simulate-time: {0}")]
    InvalidSimulatedTime(#[from] SimulatedTimeError),

    #[error("could not fetch the system prompt: {0}")]
    PromptFetch(#[from] DocumentError),

    #[error("model provider unavailable: {0}")]
    Provider(String),

    #[error("tool registry could not be built: {0}")]
    Registration(#[from] RegistrationError),
}

impl SchedulerError {
    /// Process exit code for a fatal configuration problem.
    pub fn exit_code(&self) -> u8 {
        2
    }
}

/// How a run that got past configuration ended.
#[derive(Debug)]
pub enum PingOutcome {
    /// Outside active hours; nothing was fetched or dispatched.
    Skipped,
    Completed(AgentOutcome),
}

impl PingOutcome {
    /// `0` for a skip or a finished loop, `1` when the loop failed.
    pub fn exit_code(&self) -> u8 {
        match self {
            PingOutcome::Skipped => 0,
            PingOutcome::Completed(outcome) if outcome.state == LoopState::Done => 0,
            PingOutcome::Completed(_) => 1,
        }
    }
}

/// Everything a scheduled run needs except the clock, which comes from
/// the run's options.
pub struct Scheduler {
    provider: Arc<dyn Provider>,
    settings: AgentSettings,
    deps: ToolDeps,
    prompt_doc_id: Option<String>,
    active_hours: (u32, u32),
}

impl Scheduler {
    pub fn new(
        provider: Arc<dyn Provider>,
        settings: AgentSettings,
        deps: ToolDeps,
        prompt_doc_id: Option<String>,
    ) -> Self {
        Self {
            provider,
            settings,
            deps,
            prompt_doc_id,
            active_hours: (9, 21),
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig, deps: ToolDeps) -> Self {
        Self::new(
            provider,
            AgentSettings::from_config(config),
            deps,
            config.documents.system_prompt_doc_id.clone(),
        )
        .with_active_hours(config.scheduler.active_start_hour, config.scheduler.active_end_hour)
    }

    /// Eastern-time window `[start, end)` in which runs do anything.
    pub fn with_active_hours(mut self, start: u32, end: u32) -> Self {
        self.active_hours = (start, end);
        self
    }

    /// Run one scheduled check-in.
    pub async fn run(&self, options: &PingOptions) -> Result<PingOutcome, SchedulerError> {
        let clock = match options.simulate_time.as_deref() {
            Some(input) => ClockSource::simulated(input)?,
            None => ClockSource::System,
        };
        if clock.is_simulated() {
            info!(time = %clock.snapshot().display, "Using simulated time");
        }

        let (start, end) = self.active_hours;
        if !clock.within_hours(start, end) {
            info!(start, end, "Outside active hours, nothing to do");
            return Ok(PingOutcome::Skipped);
        }

        let deps = ToolDeps {
            clock,
            ..self.deps.clone()
        };
        let factory = AgentFactory::new(
            self.provider.clone(),
            self.settings.clone(),
            &deps,
            options.dry_run,
            self.prompt_doc_id.clone(),
        )?;

        let system_prompt = factory.system_prompt().await.inspect_err(|e| {
            error!(error = %e, "Cannot run scheduled check-in without a system prompt");
        })?;

        if options.dry_run {
            info!("Dry run: side-effecting tools are disabled");
        }
        let outcome = factory.agent().run(&system_prompt, &scheduled_check_in(&clock)).await;
        match outcome.state {
            LoopState::Done => info!(turns = outcome.turns, response = %outcome.text, "Scheduled check-in completed"),
            LoopState::Failed => warn!(turns = outcome.turns, failure = ?outcome.failure, "Scheduled check-in failed"),
        }
        Ok(PingOutcome::Completed(outcome))
    }
}

/// Exit code for any run result.
pub fn exit_code(result: &Result<PingOutcome, SchedulerError>) -> u8 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => e.exit_code(),
    }
}
