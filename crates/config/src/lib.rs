//! Configuration loading, validation, and management for localseek.
//!
//! Loads configuration from `~/.localseek/config.toml` with environment
//! variable overrides. Validates all settings at startup; nothing is
//! re-read while the session runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.localseek/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Web search and page fetching
    #[serde(default)]
    pub search: SearchConfig,

    /// Inference endpoint
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Conversation history
    #[serde(default)]
    pub history: HistoryConfig,

    /// Prompt assembly
    #[serde(default)]
    pub prompt: PromptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of search results to scrape
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Per-request timeout for search and page fetches
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Cap on extracted text per source, in characters
    #[serde(default = "default_max_length_per_source")]
    pub max_length_per_source: usize,

    /// DuckDuckGo HTML search endpoint
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// User-Agent header sent with every fetch
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_max_results() -> usize {
    5
}
fn default_request_timeout_secs() -> u64 {
    4
}
fn default_max_length_per_source() -> usize {
    20_000
}
fn default_search_endpoint() -> String {
    "https://html.duckduckgo.com/html/".into()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
        .into()
}

impl SearchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            request_timeout_secs: default_request_timeout_secs(),
            max_length_per_source: default_max_length_per_source(),
            endpoint: default_search_endpoint(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Wire protocol: "ollama" or "openai"
    #[serde(default = "default_api")]
    pub api: String,

    /// Base address of the model server
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier passed to the server
    #[serde(default = "default_model")]
    pub model: String,

    /// Bound on waiting for the first byte and between chunks
    #[serde(default = "default_inference_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate (Ollama `num_predict`)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

/// Wire protocols understood by the providers crate.
pub const SUPPORTED_APIS: &[&str] = &["ollama", "openai"];

fn default_api() -> String {
    "ollama".into()
}
fn default_endpoint() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "deepseek-r1:1.5b".into()
}
fn default_inference_timeout_secs() -> u64 {
    120
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    2048
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api: default_api(),
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_inference_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Number of previous turns kept for context
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Whether history is included when the session starts
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_max_turns() -> usize {
    3
}
fn default_true() -> bool {
    true
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Upper bound on the assembled prompt, in characters
    #[serde(default = "default_max_prompt_chars")]
    pub max_chars: usize,

    /// Replaces the built-in instruction preamble
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Smallest accepted `prompt.max_chars`.
pub const MIN_PROMPT_CHARS: usize = 1024;

fn default_max_prompt_chars() -> usize {
    120_000
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_prompt_chars(),
            system_prompt: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.localseek/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `LOCALSEEK_MODEL`
    /// - `LOCALSEEK_ENDPOINT`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_overrides(&Self::config_path())
    }

    /// Load from `path`, then apply environment overrides and validate.
    pub fn load_with_overrides(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;

        if let Ok(model) = std::env::var("LOCALSEEK_MODEL") {
            config.inference.model = model;
        }

        if let Ok(endpoint) = std::env::var("LOCALSEEK_ENDPOINT") {
            config.inference.endpoint = endpoint;
        }

        config.validate()?;
        Ok(config)
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
        dirs_home().join(".localseek")
    }

    /// Get the default config file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.max_results == 0 {
            return Err(ConfigError::ValidationError(
                "search.max_results must be at least 1".into(),
            ));
        }

        if self.search.request_timeout_secs == 0 || self.inference.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be greater than zero".into(),
            ));
        }

        if self.search.max_length_per_source == 0 {
            return Err(ConfigError::ValidationError(
                "search.max_length_per_source must be greater than zero".into(),
            ));
        }

        if self.inference.temperature < 0.0 || self.inference.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "inference.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !SUPPORTED_APIS.contains(&self.inference.api.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "inference.api must be one of {:?}, got '{}'",
                SUPPORTED_APIS, self.inference.api
            )));
        }

        if self.inference.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "inference.model must not be empty".into(),
            ));
        }

        if self.prompt.max_chars < MIN_PROMPT_CHARS {
            return Err(ConfigError::ValidationError(format!(
                "prompt.max_chars must be at least {MIN_PROMPT_CHARS}"
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
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
