//! `textpilot serve`: start the webhook server.

use std::path::Path;
use std::sync::Arc;

use textpilot_agent::{AgentFactory, AgentSettings};
use textpilot_core::ClockSource;
use tracing::info;

use crate::wiring;

pub async fn run(config_path: Option<&Path>, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = wiring::load_config(config_path)?;
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let provider = wiring::provider(&config)?;
    // The webhook path always reads the real clock.
    let deps = wiring::tool_deps(&config, ClockSource::System);
    let factory = AgentFactory::new(
        provider,
        AgentSettings::from_config(&config),
        &deps,
        false,
        config.documents.system_prompt_doc_id.clone(),
    )?;
    info!(
        model = %config.model.name,
        tools = ?factory.tools().names(),
        max_turns = config.agent.max_turns,
        "Agent ready"
    );

    textpilot_gateway::start(&config, Arc::new(factory)).await
}
