//! `textpilot ask`: run the agent once from the terminal.

use std::path::Path;

use textpilot_agent::prompts::direct_query;
use textpilot_agent::{AgentFactory, AgentSettings};
use textpilot_core::ClockSource;

use crate::wiring;

pub async fn run(config_path: Option<&Path>, query: &str, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = wiring::load_config(config_path)?;
    let provider = wiring::provider(&config)?;
    let deps = wiring::tool_deps(&config, ClockSource::System);
    let factory = AgentFactory::new(
        provider,
        AgentSettings::from_config(&config),
        &deps,
        dry_run,
        config.documents.system_prompt_doc_id.clone(),
    )?;

    let prompt = factory.system_prompt_or_default().await;
    eprint!("  Thinking...");
    let outcome = factory.agent().run(&prompt, &direct_query(query)).await;
    eprint!("\r              \r");
    println!("{}", outcome.text);

    if outcome.is_done() {
        Ok(())
    } else {
        Err(format!("agent did not finish: {:?}", outcome.failure).into())
    }
}
