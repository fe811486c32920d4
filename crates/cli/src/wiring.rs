//! Turns an [`AppConfig`] into live collaborators.
//!
//! Missing credentials are not an error here: the matching tools report
//! "not configured" when the model tries to use them.

use std::path::Path;
use std::sync::Arc;

use textpilot_channels::{TwilioClient, TwilioConfig};
use textpilot_config::AppConfig;
use textpilot_core::error::DocumentError;
use textpilot_core::{ClockSource, DocumentStore, MessagingService, Provider};
use textpilot_documents::GoogleDocuments;
use textpilot_providers::OpenAiCompatProvider;
use textpilot_tools::ToolDeps;
use tracing::{info, warn};

/// Load the config from `path` or the default location, with env overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, String> {
    let loaded = match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    };
    loaded.map_err(|e| format!("Failed to load config: {e}"))
}

/// The model provider, which needs an API key.
pub fn provider(config: &AppConfig) -> Result<Arc<dyn Provider>, String> {
    let api_key = config
        .model
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or("OPENAI_API_KEY is not set")?;
    Ok(Arc::new(OpenAiCompatProvider::new("openai", &config.model.api_url, api_key)))
}

pub fn documents(config: &AppConfig) -> Option<Arc<dyn DocumentStore>> {
    match GoogleDocuments::from_base64(config.documents.service_account_b64.as_deref()) {
        Ok(store) => Some(Arc::new(store)),
        Err(DocumentError::NotConfigured(reason)) => {
            info!(%reason, "Document tools disabled");
            None
        }
        Err(e) => {
            warn!(error = %e, "Service account credentials are unusable; document tools disabled");
            None
        }
    }
}

pub fn messaging(config: &AppConfig) -> Option<Arc<dyn MessagingService>> {
    let sms = &config.sms;
    let (Some(account_sid), Some(auth_token), Some(from_number)) =
        (&sms.account_sid, &sms.auth_token, &sms.from_number)
    else {
        info!("SMS account not fully configured; messaging tools disabled");
        return None;
    };
    let client = TwilioClient::new(TwilioConfig {
        account_sid: account_sid.clone(),
        auth_token: auth_token.clone(),
        from_number: from_number.clone(),
        api_url: sms.api_url.clone(),
        conversations_api_url: sms.conversations_api_url.clone(),
    });
    match client {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!(error = %e, "SMS client unavailable; messaging tools disabled");
            None
        }
    }
}

/// Tool dependencies for one process, reading time from `clock`.
pub fn tool_deps(config: &AppConfig, clock: ClockSource) -> ToolDeps {
    ToolDeps {
        clock,
        documents: documents(config),
        messaging: messaging(config),
        owner_number: config.sms.owner_number.clone(),
        phone_directory_doc_id: config.documents.phone_directory_doc_id.clone(),
        attendance_sheet_id: config.documents.attendance_sheet_id.clone(),
        calendar_doc_id: config.documents.calendar_doc_id.clone(),
    }
}
