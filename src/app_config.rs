use anyhow::{Context, Result, anyhow};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Application configuration module
/// This module handles loading, validating and saving configuration settings.
/// Configuration is always passed explicitly to the controller; there is no
/// global instance.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Source language code, `"auto"` or empty for backend detection
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code
    pub target_language: String,

    /// Translation pipeline settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// What to do when a batch still fails after all retries
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Abort the whole document
    #[default]
    Strict,
    /// Keep the original text for the failed segments and report a warning
    BestEffort,
}

/// Translation pipeline configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslationConfig {
    /// Maximum number of segments per backend call
    #[serde(default = "default_max_batch_entries")]
    pub max_batch_entries: usize,

    /// Maximum number of characters per backend call
    #[serde(default = "default_max_batch_chars")]
    pub max_batch_chars: usize,

    /// Maximum number of batches in flight at once
    #[serde(default = "default_concurrent_batches")]
    pub concurrent_batches: usize,

    /// Retry count for failed batches (attempts = retries + 1)
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds
    #[serde(default = "default_batch_timeout_secs")]
    pub batch_timeout_secs: u64,

    /// Behavior once retries are exhausted
    #[serde(default)]
    pub failure_mode: FailureMode,

    /// Whether ASS/SSA `Comment:` events are translated too
    #[serde(default)]
    pub translate_comments: bool,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            max_batch_entries: default_max_batch_entries(),
            max_batch_chars: default_max_batch_chars(),
            concurrent_batches: default_concurrent_batches(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            batch_timeout_secs: default_batch_timeout_secs(),
            failure_mode: FailureMode::default(),
            translate_comments: false,
        }
    }
}

impl TranslationConfig {
    /// Total attempts per batch
    pub fn max_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    /// Per-call timeout
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching log filter
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "auto".to_string()
}

fn default_max_batch_entries() -> usize {
    50
}

fn default_max_batch_chars() -> usize {
    2000
}

fn default_concurrent_batches() -> usize {
    4
}

fn default_retry_count() -> u32 {
    3 // Default to 3 retries
}

fn default_retry_backoff_ms() -> u64 {
    500 // 500ms base backoff time, doubled on each retry
}

fn default_batch_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Configuration for a target language with default settings
    pub fn for_target(target_language: &str) -> Self {
        Self {
            target_language: target_language.to_string(),
            ..Self::default()
        }
    }

    /// Parse a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse configuration JSON")
    }

    /// Load a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Serialize to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")
    }

    /// Source language, `None` when the backend should detect it
    pub fn source_language(&self) -> Option<&str> {
        let code = self.source_language.trim();
        if code.is_empty() || code.eq_ignore_ascii_case("auto") {
            None
        } else {
            Some(code)
        }
    }

    /// Apply the configured log level to the global logger
    pub fn apply_log_level(&self) {
        log::set_max_level(self.log_level.to_level_filter());
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.target_language.trim().is_empty() {
            return Err(anyhow!("Target language is required"));
        }

        let translation = &self.translation;
        if translation.max_batch_entries == 0 {
            return Err(anyhow!("max_batch_entries must be at least 1"));
        }
        if translation.max_batch_chars == 0 {
            return Err(anyhow!("max_batch_chars must be at least 1"));
        }
        if translation.concurrent_batches == 0 {
            return Err(anyhow!("concurrent_batches must be at least 1"));
        }
        if translation.batch_timeout_secs == 0 {
            return Err(anyhow!("batch_timeout_secs must be at least 1"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: String::new(),
            translation: TranslationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
