//! `textpilot ping`: one scheduled check-in, meant to be run from cron.
//!
//! Exit codes: `0` finished or outside active hours, `1` the agent loop
//! failed, `2` configuration problem.

use std::path::Path;
use std::process::ExitCode;

use textpilot_agent::scheduler::exit_code;
use textpilot_agent::{PingOptions, PingOutcome, Scheduler, SchedulerError};
use textpilot_core::ClockSource;
use tracing::error;

use crate::wiring;

pub async fn run(config_path: Option<&Path>, options: PingOptions) -> ExitCode {
    let config = match wiring::load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Scheduled check-in aborted");
            return ExitCode::from(2);
        }
    };
    let provider = match wiring::provider(&config) {
        Ok(provider) => provider,
        Err(e) => {
            let e = SchedulerError::Provider(e);
            error!(error = %e, "Scheduled check-in aborted");
            return ExitCode::from(e.exit_code());
        }
    };

    // The scheduler swaps in the simulated clock when one is requested.
    let deps = wiring::tool_deps(&config, ClockSource::System);
    let result = Scheduler::from_config(provider, &config, deps).run(&options).await;
    match &result {
        Ok(PingOutcome::Completed(outcome)) => println!("{}", outcome.text),
        Ok(PingOutcome::Skipped) => {}
        Err(e) => error!(error = %e, "Scheduled check-in aborted"),
    }
    ExitCode::from(exit_code(&result))
}
