//! Configuration for interaction-tracker
//!
//! Mirrors the options a host passes when mounting the tracker, plus the
//! storage key and an optional request timeout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default seconds between scheduled flushes.
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 60;

/// Default key holding the persisted snapshot. Hosts migrating data written
/// under another key set `storage_key` explicitly.
pub const DEFAULT_STORAGE_KEY: &str = "interaction_events";

/// Tracker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Collector URL. `None` disables network flushing entirely.
    pub remote_endpoint: Option<String>,
    /// Seconds between scheduled flushes
    pub flush_interval_secs: u64,
    /// Attach a per-instance random session id to every event
    pub enable_anonymous_id: bool,
    /// Accepted but inert: screen-time tracking is not implemented
    pub auto_track_screen_time: bool,
    /// Key of the persisted snapshot
    pub storage_key: String,
    /// Optional HTTP timeout; the transport default applies when unset
    pub request_timeout_secs: Option<u64>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            remote_endpoint: None,
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
            enable_anonymous_id: false,
            auto_track_screen_time: false,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            request_timeout_secs: None,
        }
    }
}

impl TrackerConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.remote_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_flush_interval_secs(mut self, secs: u64) -> Self {
        self.flush_interval_secs = secs;
        self
    }

    pub fn with_anonymous_id(mut self, enabled: bool) -> Self {
        self.enable_anonymous_id = enabled;
        self
    }

    pub fn with_auto_track_screen_time(mut self, enabled: bool) -> Self {
        self.auto_track_screen_time = enabled;
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Configured endpoint, ignoring blank strings.
    pub fn endpoint(&self) -> Option<&str> {
        self.remote_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flush_interval_secs == 0 {
            return Err(ConfigError::InvalidInterval);
        }

        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::EmptyStorageKey);
        }

        if let Some(endpoint) = self.endpoint() {
            let parsed = url::Url::parse(endpoint)
                .map_err(|e| ConfigError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidEndpoint(format!(
                    "{}: scheme must be http or https",
                    endpoint
                )));
            }
        }

        Ok(())
    }
}

/// `<config dir>/interaction-tracker/config.toml`, when the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("interaction-tracker").join("config.toml"))
}

/// `<local data dir>/interaction-tracker`, used by the file store by default.
pub fn default_storage_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("interaction-tracker"))
}

/// Configuration validation error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("flush_interval_secs must be positive")]
    InvalidInterval,

    #[error("Invalid remote endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("storage_key must not be empty")]
    EmptyStorageKey,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),
}
