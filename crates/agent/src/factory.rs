//! Assembles agent loops from configuration.
//!
//! The system prompt is fetched from the document store every time one is
//! asked for, so edits to the prompt document apply to the next message.

use std::sync::Arc;
use textpilot_config::AppConfig;
use textpilot_core::document::{fetch_system_prompt, DocumentStore};
use textpilot_core::error::DocumentError;
use textpilot_core::provider::Provider;
use textpilot_core::tool::{RegistrationError, ToolRegistry};
use textpilot_tools::{default_registry, ToolDeps};
use tracing::warn;

use crate::loop_runner::{AgentLoop, DEFAULT_FALLBACK_MESSAGE, DEFAULT_MAX_TURNS};
use crate::prompts::DEFAULT_SYSTEM_PROMPT;

/// Model and loop settings shared by every run.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub max_turns: usize,
    pub fallback_message: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            temperature: 0.1,
            max_tokens: None,
            max_turns: DEFAULT_MAX_TURNS,
            fallback_message: DEFAULT_FALLBACK_MESSAGE.into(),
        }
    }
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.name.clone(),
            temperature: config.model.temperature,
            max_tokens: Some(config.model.max_tokens),
            max_turns: config.agent.max_turns,
            fallback_message: config.agent.fallback_message.clone(),
        }
    }
}

/// Builds [`AgentLoop`]s over one provider, one tool registry and one
/// system-prompt source.
pub struct AgentFactory {
    provider: Arc<dyn Provider>,
    settings: AgentSettings,
    tools: Arc<ToolRegistry>,
    documents: Option<Arc<dyn DocumentStore>>,
    prompt_doc_id: Option<String>,
}

impl AgentFactory {
    /// Wire the full tool set from `deps`.
    pub fn new(
        provider: Arc<dyn Provider>,
        settings: AgentSettings,
        deps: &ToolDeps,
        dry_run: bool,
        prompt_doc_id: Option<String>,
    ) -> Result<Self, RegistrationError> {
        let tools = default_registry(deps, dry_run)?;
        Ok(Self::from_parts(
            provider,
            settings,
            Arc::new(tools),
            deps.documents.clone(),
            prompt_doc_id,
        ))
    }

    /// Use an already-built registry.
    pub fn from_parts(
        provider: Arc<dyn Provider>,
        settings: AgentSettings,
        tools: Arc<ToolRegistry>,
        documents: Option<Arc<dyn DocumentStore>>,
        prompt_doc_id: Option<String>,
    ) -> Self {
        Self {
            provider,
            settings,
            tools,
            documents,
            prompt_doc_id: prompt_doc_id.filter(|id| !id.trim().is_empty()),
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// A loop ready to run.
    pub fn agent(&self) -> AgentLoop {
        let agent = AgentLoop::new(self.provider.clone(), &self.settings.model, self.tools.clone())
            .with_temperature(self.settings.temperature)
            .with_max_turns(self.settings.max_turns)
            .with_fallback_message(&self.settings.fallback_message);
        match self.settings.max_tokens {
            Some(max) => agent.with_max_tokens(max),
            None => agent,
        }
    }

    /// Fetch the system prompt. Never cached.
    pub async fn system_prompt(&self) -> Result<String, DocumentError> {
        let store = self
            .documents
            .as_deref()
            .ok_or_else(|| DocumentError::NotConfigured("GOOGLE_SERVICE_ACCOUNT_B64 is not set".into()))?;
        let doc_id = self.prompt_doc_id.as_deref().unwrap_or_default();
        fetch_system_prompt(store, doc_id).await
    }

    /// The fetched system prompt, or the built-in default when it cannot be had.
    pub async fn system_prompt_or_default(&self) -> String {
        match self.system_prompt().await {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "System prompt unavailable, using the built-in default");
                DEFAULT_SYSTEM_PROMPT.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use textpilot_core::clock::ClockSource;
    use textpilot_documents::InMemoryDocumentStore;

    fn factory(store: Option<Arc<dyn DocumentStore>>, doc_id: Option<&str>) -> AgentFactory {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response("ok")]));
        AgentFactory::from_parts(
            provider,
            AgentSettings::default(),
            Arc::new(ToolRegistry::new()),
            store,
            doc_id.map(String::from),
        )
    }

    #[tokio::test]
    async fn prompt_is_fetched_fresh_every_time() {
        let store = Arc::new(InMemoryDocumentStore::new().with_document("p", "Prompt", " Be brief. "));
        let dyn_store: Arc<dyn DocumentStore> = store.clone();
        let factory = factory(Some(dyn_store), Some("p"));

        assert_eq!(factory.system_prompt().await.unwrap(), "Be brief.");
        assert_eq!(factory.system_prompt().await.unwrap(), "Be brief.");
        assert_eq!(store.read_count(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_falls_back_to_default() {
        let store: Arc<dyn DocumentStore> =
            Arc::new(InMemoryDocumentStore::failing(DocumentError::Network("offline".into())));
        let factory = factory(Some(store), Some("p"));
        assert!(factory.system_prompt().await.is_err());
        assert_eq!(factory.system_prompt_or_default().await, DEFAULT_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn missing_store_or_id_is_not_configured() {
        assert!(matches!(
            factory(None, Some("p")).system_prompt().await,
            Err(DocumentError::NotConfigured(_))
        ));
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        assert!(matches!(
            factory(Some(store), Some(" ")).system_prompt().await,
            Err(DocumentError::NotConfigured(_))
        ));
    }

    #[test]
    fn full_tool_set_respects_dry_run() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response("ok")]));
        let deps = ToolDeps::offline(ClockSource::System);
        let factory = AgentFactory::new(provider, AgentSettings::default(), &deps, true, None).unwrap();
        assert!(factory.tools().is_dry_run());
        assert_eq!(factory.tools().len(), 11);
    }

    #[test]
    fn settings_follow_config() {
        let mut config = AppConfig::default();
        config.agent.max_turns = 3;
        config.model.name = "gpt-4o".into();
        let settings = AgentSettings::from_config(&config);
        assert_eq!(settings.max_turns, 3);
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.max_tokens, Some(1024));
    }
}
