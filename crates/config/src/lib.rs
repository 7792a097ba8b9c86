//! Configuration loading, validation, and management for carbot.
//!
//! Loads configuration from `~/.carbot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use carbot_core::provider::GenerationParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The base instructions sent as the system context on every turn, before
/// the known-user-info section is appended. Teaches the model the
/// reply/memory response protocol.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a proactive assistant helping users buy or sell cars. Drive the \
conversation: ask for the details you are missing and keep answers short.

Always respond in exactly this format:

<reply>your conversational reply to the user</reply>
<memory>{\"field\": \"value\", ...}</memory>

The <memory> block is a JSON object containing only facts you newly learned \
this turn, using these field names: intent (buy or sell), budget, carType, \
make, model, year, mileage, condition, timeline, location, tradeIn (yes or \
no), financing (yes or no), sellerAsk, recipient. Omit the block when you \
learned nothing new.";

/// The root configuration structure.
///
/// Maps directly to `~/.carbot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Generation parameters sent with every request
    #[serde(default)]
    pub generation: GenerationParams,

    /// How many recent history turns are sent per request
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Override the system prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_api_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "openai/gpt-3.5-turbo".into()
}
fn default_history_window() -> usize {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            generation: GenerationParams::default(),
            history_window: default_history_window(),
            system_prompt_override: None,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("generation", &self.generation)
            .field("history_window", &self.history_window)
            .field(
                "system_prompt_override",
                &self.system_prompt_override.is_some(),
            )
            .finish()
    }
}

/// Never print secrets, even at debug level.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.carbot/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `CARBOT_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply environment variable overrides through the given lookup.
    /// An `api_key` from the config file wins over the environment; the
    /// key variables are consulted in priority order.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = var("CARBOT_API_KEY")
                .or_else(|| var("OPENROUTER_API_KEY"))
                .or_else(|| var("OPENAI_API_KEY"));
        }

        if let Some(model) = var("CARBOT_MODEL") {
            self.model = model;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".carbot")
    }

    /// Default path of the persisted conversation history.
    pub fn history_path() -> PathBuf {
        Self::config_dir().join("history.json")
    }

    /// Default path of the persisted knowledge record.
    pub fn knowledge_path() -> PathBuf {
        Self::config_dir().join("knowledge.json")
    }

    /// The effective system prompt (override, or the bundled default).
    pub fn system_prompt(&self) -> &str {
        self.system_prompt_override
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.temperature < 0.0 || self.generation.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.generation.top_p <= 0.0 || self.generation.top_p > 1.0 {
            return Err(ConfigError::ValidationError(
                "generation.top_p must be in (0.0, 1.0]".into(),
            ));
        }

        if self.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "history_window must be at least 1".into(),
            ));
        }

        Ok(())
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
