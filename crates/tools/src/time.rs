//! Current time tool. Reads the injected clock, never the system clock.

use async_trait::async_trait;
use serde_json::{json, Value};
use textpilot_core::clock::ClockSource;
use textpilot_core::error::ToolError;
use textpilot_core::tool::{Tool, ToolOutput};

pub struct GetCurrentTimeTool {
    clock: ClockSource,
}

impl GetCurrentTimeTool {
    pub fn new(clock: ClockSource) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl Tool for GetCurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time in US Eastern time (EST/EDT)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: Value) -> Result<ToolOutput, ToolError> {
        let snapshot = self.clock.snapshot();
        let mut content = format!("Current time: {} ({})", snapshot.display, snapshot.iso);
        if snapshot.simulated {
            content.push_str(" [simulated]");
        }
        Ok(ToolOutput {
            content,
            data: serde_json::to_value(&snapshot).ok(),
        })
    }
}
