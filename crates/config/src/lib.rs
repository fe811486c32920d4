//! Configuration loading, validation, and management for textpilot.
//!
//! Loads configuration from `~/.textpilot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.textpilot/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language model settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Agent loop limits
    #[serde(default)]
    pub agent: AgentConfig,

    /// SMS provider account and webhook secret
    #[serde(default)]
    pub sms: SmsConfig,

    /// Document store credentials and document ids
    #[serde(default)]
    pub documents: DocumentsConfig,

    /// HTTP server settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Scheduled ping settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_max_turns() -> usize {
    10
}
fn default_fallback_message() -> String {
    "Sorry, I wasn't able to finish that request. Please try again in a bit.".into()
}
fn default_sms_api_url() -> String {
    "https://api.twilio.com".into()
}
fn default_conversations_api_url() -> String {
    "https://conversations.twilio.com".into()
}
fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_start_hour() -> u32 {
    9
}
fn default_end_hour() -> u32 {
    21
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible chat completions API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub name: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            name: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("name", &self.name)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model invocations per run
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Returned to the user when a run fails
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            fallback_message: default_fallback_message(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_sid: Option<String>,

    /// Also the shared secret for webhook signatures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Our own number, used as the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_number: Option<String>,

    /// Recipient of `text_me`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_number: Option<String>,

    #[serde(default = "default_sms_api_url")]
    pub api_url: String,

    #[serde(default = "default_conversations_api_url")]
    pub conversations_api_url: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            owner_number: None,
            api_url: default_sms_api_url(),
            conversations_api_url: default_conversations_api_url(),
        }
    }
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &redact(&self.auth_token))
            .field("from_number", &self.from_number)
            .field("owner_number", &self.owner_number)
            .field("api_url", &self.api_url)
            .field("conversations_api_url", &self.conversations_api_url)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// Base64-encoded service account JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_b64: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_doc_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_directory_doc_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance_sheet_id: Option<String>,

    /// Document holding the upcoming schedule, read by `read_calendar`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_doc_id: Option<String>,
}

impl std::fmt::Debug for DocumentsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentsConfig")
            .field("service_account_b64", &redact(&self.service_account_b64))
            .field("system_prompt_doc_id", &self.system_prompt_doc_id)
            .field("phone_directory_doc_id", &self.phone_directory_doc_id)
            .field("attendance_sheet_id", &self.attendance_sheet_id)
            .field("calendar_doc_id", &self.calendar_doc_id)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Externally visible base URL (scheme + host), used to rebuild the
    /// signed callback URL when running behind a proxy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    /// Development only: accept unsigned webhook requests
    #[serde(default)]
    pub skip_signature_validation: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            public_url: None,
            skip_signature_validation: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// First Eastern hour (inclusive) a ping may run
    #[serde(default = "default_start_hour")]
    pub active_start_hour: u32,

    /// Eastern hour (exclusive) after which pings are skipped
    #[serde(default = "default_end_hour")]
    pub active_end_hour: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            active_start_hour: default_start_hour(),
            active_end_hour: default_end_hour(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.textpilot/config.toml),
    /// then apply environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides and validate.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply overrides from a key lookup (the process environment in production).
    ///
    /// Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_API_KEY") {
            self.model.api_key = Some(v);
        }
        if let Some(v) = get("MODEL_ID") {
            self.model.name = v;
        }
        if let Some(v) = get("TWILIO_ACCOUNT_SID") {
            self.sms.account_sid = Some(v);
        }
        if let Some(v) = get("TWILIO_AUTH_TOKEN") {
            self.sms.auth_token = Some(v);
        }
        if let Some(v) = get("TWILIO_PHONE_NUMBER") {
            self.sms.from_number = Some(v);
        }
        if let Some(v) = get("MY_PHONE_NUMBER") {
            self.sms.owner_number = Some(v);
        }
        if let Some(v) = get("GOOGLE_SERVICE_ACCOUNT_B64") {
            self.documents.service_account_b64 = Some(v);
        }
        if let Some(v) = get("SYSTEM_PROMPT_DOC_ID") {
            self.documents.system_prompt_doc_id = Some(v);
        }
        if let Some(v) = get("PHONE_DIRECTORY_DOC_ID") {
            self.documents.phone_directory_doc_id = Some(v);
        }
        if let Some(v) = get("ATTENDANCE_SHEET_ID") {
            self.documents.attendance_sheet_id = Some(v);
        }
        if let Some(v) = get("CALENDAR_DOC_ID") {
            self.documents.calendar_doc_id = Some(v);
        }
        if let Some(v) = get("TEXTPILOT_PUBLIC_URL") {
            self.gateway.public_url = Some(v);
        }
        if let Some(v) = get("TWILIO_WEBHOOK_DEBUG") {
            self.gateway.skip_signature_validation = v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = get("PORT") {
            match v.trim().parse() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!(value = %v, "Ignoring unparseable PORT"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".textpilot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_turns == 0 {
            return Err(ConfigError::ValidationError("agent.max_turns must be at least 1".into()));
        }

        let s = &self.scheduler;
        if s.active_start_hour >= s.active_end_hour || s.active_end_hour > 24 {
            return Err(ConfigError::ValidationError(format!(
                "scheduler hours must satisfy start < end <= 24 (got {}..{})",
                s.active_start_hour, s.active_end_hour
            )));
        }

        Ok(())
    }

    /// Check if a model API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.model.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.model.name, "gpt-4o-mini");
        assert!((config.model.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.agent.max_turns, 10);
        assert!(!config.gateway.skip_signature_validation);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model.name, config.model.name);
        assert_eq!(parsed.scheduler.active_end_hour, 21);
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.model.temperature = 5.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.max_turns = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.scheduler.active_start_hour = 21;
        config.scheduler.active_end_hour = 9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.model.name, "gpt-4o-mini");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[agent]
max_turns = 4

[documents]
system_prompt_doc_id = "doc-123"
"#
        )
        .unwrap();
        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.agent.max_turns, 4);
        assert_eq!(config.documents.system_prompt_doc_id.as_deref(), Some("doc-123"));
        assert_eq!(config.gateway.port, 8000);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[agent\nmax_turns = ").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_win() {
        let mut config = AppConfig::default();
        config.apply_overrides(env(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("MODEL_ID", "gpt-4o"),
            ("TWILIO_AUTH_TOKEN", "secret"),
            ("TWILIO_WEBHOOK_DEBUG", "True"),
            ("PORT", "9090"),
            ("SYSTEM_PROMPT_DOC_ID", "   "),
        ]));
        assert_eq!(config.model.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.model.name, "gpt-4o");
        assert_eq!(config.sms.auth_token.as_deref(), Some("secret"));
        assert!(config.gateway.skip_signature_validation);
        assert_eq!(config.gateway.port, 9090);
        assert!(config.documents.system_prompt_doc_id.is_none());
    }

    #[test]
    fn calendar_doc_comes_from_env() {
        let mut config = AppConfig::default();
        assert!(config.documents.calendar_doc_id.is_none());
        config.apply_overrides(env(&[("CALENDAR_DOC_ID", "cal-42")]));
        assert_eq!(config.documents.calendar_doc_id.as_deref(), Some("cal-42"));
    }

    #[test]
    fn bad_port_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(env(&[("PORT", "eighty")]));
        assert_eq!(config.gateway.port, 8000);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.apply_overrides(env(&[
            ("OPENAI_API_KEY", "sk-very-secret"),
            ("TWILIO_AUTH_TOKEN", "tw-very-secret"),
            ("GOOGLE_SERVICE_ACCOUNT_B64", "eyJzZWNyZXQiOnRydWV9"),
        ]));
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(!debug.contains("tw-very-secret"));
        assert!(!debug.contains("eyJzZWNyZXQiOnRydWV9"));
        assert!(debug.contains("[REDACTED]"));
    }
}
