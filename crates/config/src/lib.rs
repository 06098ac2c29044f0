//! Configuration loading and validation for Falconer.
//!
//! Loads configuration from `~/.falconer/config.toml` with environment
//! variable overrides (`FALCONER_*`). Validates all settings at load time:
//! every engine knob is a positive value, with no enforced upper bound
//! beyond operational sanity.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.falconer/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum steps per agent run
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Per-step deadline in seconds
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: f64,

    /// Memory store capacity (entries)
    #[serde(default = "default_memory_limit")]
    pub memory_limit: usize,

    /// System prompt sent with every think request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Batch orchestration settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Tool-provider launch configurations
    #[serde(default)]
    pub tool_providers: Vec<ToolProviderConfig>,
}

fn default_max_steps() -> u32 {
    10
}
fn default_step_timeout_secs() -> f64 {
    30.0
}
fn default_memory_limit() -> usize {
    1000
}

/// Batch orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Units per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Batches in flight at once
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,
}

fn default_batch_size() -> usize {
    6
}
fn default_max_concurrent_batches() -> usize {
    3
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent_batches: default_max_concurrent_batches(),
        }
    }
}

/// Launch configuration for one tool provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolProviderConfig {
    /// Provider ID (unique per connection)
    pub id: String,

    /// Command to run
    pub command: String,

    /// Arguments; `${VAR}` references are substituted at launch
    #[serde(default)]
    pub args: Vec<String>,
}

impl EngineConfig {
    /// Load configuration from the default path (~/.falconer/config.toml),
    /// then apply `FALCONER_*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
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
        dirs_home().join(".falconer")
    }

    /// The per-step deadline as a `Duration`.
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.step_timeout_secs)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<u32>("FALCONER_MAX_STEPS") {
            self.max_steps = v;
        }
        if let Some(v) = env_parse::<f64>("FALCONER_STEP_TIMEOUT") {
            self.step_timeout_secs = v;
        }
        if let Some(v) = env_parse::<usize>("FALCONER_MEMORY_LIMIT") {
            self.memory_limit = v;
        }
        if let Some(v) = env_parse::<usize>("FALCONER_BATCH_SIZE") {
            self.batch.batch_size = v;
        }
        if let Some(v) = env_parse::<usize>("FALCONER_MAX_CONCURRENT") {
            self.batch.max_concurrent_batches = v;
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps == 0 {
            return Err(ConfigError::ValidationError("max_steps must be > 0".into()));
        }
        if self.step_timeout_secs <= 0.0 {
            return Err(ConfigError::ValidationError(
                "step_timeout_secs must be > 0".into(),
            ));
        }
        if self.memory_limit == 0 {
            return Err(ConfigError::ValidationError(
                "memory_limit must be > 0".into(),
            ));
        }
        if self.batch.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "batch.batch_size must be > 0".into(),
            ));
        }
        if self.batch.max_concurrent_batches == 0 {
            return Err(ConfigError::ValidationError(
                "batch.max_concurrent_batches must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            step_timeout_secs: default_step_timeout_secs(),
            memory_limit: default_memory_limit(),
            system_prompt: None,
            batch: BatchConfig::default(),
            tool_providers: vec![],
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    let raw = std::env::var(var).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var, value = %raw, "ignoring unparseable environment override");
            None
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
