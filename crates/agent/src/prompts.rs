//! Built-in prompt text and the synthetic user messages the agent is fed.

use textpilot_core::clock::ClockSource;

/// Used when the system-prompt document cannot be fetched on the live path.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers text messages. \
You can read Google Docs and Sheets, look up contacts, check the time and send texts \
using the tools provided. Keep replies short and plain: they are delivered as SMS.";

/// The parts of an inbound text the agent is told about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundText {
    pub from: String,
    pub to: String,
    pub message_sid: String,
    pub body: String,
}

impl InboundText {
    /// The context block handed to the agent as the user message.
    ///
    /// The body is passed through untouched, even when empty.
    pub fn to_prompt(&self) -> String {
        format!(
            "You have received a text message:\n\
             - From: {}\n\
             - To: {}\n\
             - Message ID: {}\n\
             - Message: {}\n\n\
             Based on this message, decide what to do. You can look up contacts, read \
             documents for missing context, text the owner with text_me, or simply reply. \
             Your final answer is sent back to the sender as a text.",
            or_unknown(&self.from),
            or_unknown(&self.to),
            or_unknown(&self.message_sid),
            self.body,
        )
    }
}

fn or_unknown(s: &str) -> &str {
    if s.trim().is_empty() { "(unknown)" } else { s }
}

/// The synthetic trigger for a scheduled run.
pub fn scheduled_check_in(clock: &ClockSource) -> String {
    let now = clock.now();
    let kind = if clock.is_simulated() { "simulated" } else { "actual" };
    format!(
        "The current time is {} ({kind} Eastern time).\n\n\
         You are running as a scheduled check-in. Execute the instructions in your system prompt.\n\n\
         Use your available tools as needed to complete your tasks.",
        now.format("%Y-%m-%d %I:%M %p %Z"),
    )
}

/// The user message for the unauthenticated `/agent?query=` test endpoint.
pub fn direct_query(query: &str) -> String {
    InboundText {
        from: "local-test".into(),
        to: "agent".into(),
        message_sid: "direct".into(),
        body: query.to_string(),
    }
    .to_prompt()
}
