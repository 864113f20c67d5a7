//! Configuration loading, validation, and management for freeagent.
//!
//! Loads configuration from `~/.freeagent/config.toml` (or `--config` /
//! `FREEAGENT_CONFIG`) with environment variable overrides. Validates all
//! settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.freeagent/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Anthropic API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model used for every turn
    #[serde(default = "default_model")]
    pub model: String,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Messages API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Session loop settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_temperature() -> f32 {
    1.0
}
fn default_base_url() -> String {
    "https://api.anthropic.com".into()
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .field("storage", &self.storage)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum model round-trips per session
    #[serde(default = "default_turn_budget")]
    pub turn_budget: u32,

    /// Hard wall-clock limit for a single tool call
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Successful tool output beyond this is truncated
    #[serde(default = "default_max_payload_chars")]
    pub max_payload_chars: usize,

    /// Failure diagnostics beyond this are truncated
    #[serde(default = "default_max_error_chars")]
    pub max_error_chars: usize,

    /// Tool calls of one turn running at once (1 = sequential)
    #[serde(default = "default_max_concurrent_tools")]
    pub max_concurrent_tools: usize,

    /// Name of the tool that ends the session
    #[serde(default = "default_end_session_tool")]
    pub end_session_tool: String,

    /// Extra attempts for a model query that failed transiently
    #[serde(default = "default_model_retries")]
    pub model_retries: u32,

    /// First retry delay, doubled per attempt, unless the provider names one
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_turn_budget() -> u32 {
    20
}
fn default_tool_timeout_secs() -> u64 {
    30
}
fn default_max_payload_chars() -> usize {
    4000
}
fn default_max_error_chars() -> usize {
    500
}
fn default_max_concurrent_tools() -> usize {
    1
}
fn default_end_session_tool() -> String {
    "end_session".into()
}
fn default_model_retries() -> u32 {
    2
}
fn default_retry_backoff_ms() -> u64 {
    1000
}

impl SessionConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turn_budget: default_turn_budget(),
            tool_timeout_secs: default_tool_timeout_secs(),
            max_payload_chars: default_max_payload_chars(),
            max_error_chars: default_max_error_chars(),
            max_concurrent_tools: default_max_concurrent_tools(),
            end_session_tool: default_end_session_tool(),
            model_retries: default_model_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file, created on first use
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Past session summaries injected into the prompt
    #[serde(default = "default_recent_sessions")]
    pub recent_sessions: usize,

    /// Memories injected into the prompt
    #[serde(default = "default_memory_limit")]
    pub memory_limit: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/agent.db")
}
fn default_recent_sessions() -> usize {
    5
}
fn default_memory_limit() -> usize {
    50
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            recent_sessions: default_recent_sessions(),
            memory_limit: default_memory_limit(),
        }
    }
}

impl AppConfig {
    /// Load configuration and apply process environment overrides.
    ///
    /// Path resolution: `explicit` (from `--config`), then
    /// `FREEAGENT_CONFIG`, then `~/.freeagent/config.toml`.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => std::env::var("FREEAGENT_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| Self::config_dir().join("config.toml")),
        };
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
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

    /// Apply environment overrides (highest priority), then re-validate.
    ///
    /// - `ANTHROPIC_API_KEY`
    /// - `ANTHROPIC_MODEL`
    /// - `MAX_TURNS`
    /// - `DB_PATH`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("ANTHROPIC_API_KEY").filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }

        if let Some(model) = lookup("ANTHROPIC_MODEL").filter(|m| !m.is_empty()) {
            self.model = model;
        }

        if let Some(turns) = lookup("MAX_TURNS") {
            self.session.turn_budget = turns.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("MAX_TURNS must be a positive integer, got '{turns}'"))
            })?;
        }

        if let Some(path) = lookup("DB_PATH").filter(|p| !p.is_empty()) {
            self.storage.db_path = PathBuf::from(path);
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".freeagent")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let session = &self.session;
        if session.turn_budget == 0 {
            return Err(ConfigError::ValidationError(
                "session.turn_budget must be at least 1".into(),
            ));
        }
        if session.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "session.tool_timeout_secs must be at least 1".into(),
            ));
        }
        if session.max_payload_chars == 0 || session.max_error_chars == 0 {
            return Err(ConfigError::ValidationError(
                "session payload limits must be > 0".into(),
            ));
        }
        if session.max_concurrent_tools == 0 {
            return Err(ConfigError::ValidationError(
                "session.max_concurrent_tools must be at least 1".into(),
            ));
        }
        if session.end_session_tool.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "session.end_session_tool must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            base_url: default_base_url(),
            session: SessionConfig::default(),
            storage: StorageConfig::default(),
        }
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
