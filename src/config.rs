//! File configuration for the narrator
//!
//! Loaded from YAML. Every field has a default, so an empty file (or no
//! file) is a valid configuration:
//!
//! ```yaml
//! url: ws://127.0.0.1:8099/ws
//! session: main
//! size_threshold: 100
//! time_threshold_ms: 2000
//! ```

use crate::accumulator::{
    AccumulatorConfig, DEFAULT_DISCONTINUITY_MARKER, DEFAULT_SIZE_THRESHOLD,
    DEFAULT_TIME_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Default streaming host endpoint
pub const DEFAULT_URL: &str = "ws://127.0.0.1:8099/ws";

/// Errors loading a configuration file
#[derive(Debug)]
pub enum ConfigError {
    /// File could not be read
    Io(std::io::Error),
    /// File is not valid YAML for this schema
    Parse(serde_yaml::Error),
    /// Values parse but make no sense
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "Cannot read config: {}", err),
            ConfigError::Parse(err) => write!(f, "Cannot parse config: {}", err),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// Narrator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NarratorConfig {
    /// Streaming host WebSocket endpoint
    pub url: String,
    /// Bearer token; omitted when the host runs without auth
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Session to narrate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    /// Flush once this many characters are pending
    pub size_threshold: usize,
    /// Flush once pending content is this old (milliseconds)
    pub time_threshold_ms: u64,
    pub discontinuity_marker: String,
    /// Keepalive ping interval (seconds)
    pub ping_interval_secs: u64,
    /// Handshake limit per connection attempt (seconds)
    pub connect_timeout_secs: u64,
    /// First reconnect delay (milliseconds)
    pub reconnect_base_ms: u64,
    /// Reconnect delay cap (seconds)
    pub reconnect_max_secs: u64,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            token: None,
            session: None,
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            time_threshold_ms: DEFAULT_TIME_THRESHOLD.as_millis() as u64,
            discontinuity_marker: DEFAULT_DISCONTINUITY_MARKER.to_string(),
            ping_interval_secs: 30,
            connect_timeout_secs: 10,
            reconnect_base_ms: 1000,
            reconnect_max_secs: 30,
        }
    }
}

impl NarratorConfig {
    /// Load and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text)?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse and validate YAML text
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty map
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check values that parse but cannot work. Run again after applying
    /// overrides from other sources.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size_threshold == 0 {
            return Err(ConfigError::Invalid("size_threshold must be positive".into()));
        }
        if self.time_threshold_ms == 0 {
            return Err(ConfigError::Invalid("time_threshold_ms must be positive".into()));
        }
        if self.ping_interval_secs == 0 {
            return Err(ConfigError::Invalid("ping_interval_secs must be positive".into()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid("connect_timeout_secs must be positive".into()));
        }
        if self.reconnect_base_ms > self.reconnect_max_secs.saturating_mul(1000) {
            return Err(ConfigError::Invalid(
                "reconnect_base_ms exceeds reconnect_max_secs".into(),
            ));
        }
        Ok(())
    }

    pub fn accumulator_config(&self) -> AccumulatorConfig {
        AccumulatorConfig {
            size_threshold: self.size_threshold,
            time_threshold: Duration::from_millis(self.time_threshold_ms),
            discontinuity_marker: self.discontinuity_marker.clone(),
        }
    }

    #[cfg(feature = "streaming")]
    pub fn transport_config(&self) -> crate::streaming::TransportConfig {
        crate::streaming::TransportConfig {
            url: self.url.clone(),
            ping_interval: Duration::from_secs(self.ping_interval_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            reconnect: crate::streaming::ReconnectPolicy {
                base_delay: Duration::from_millis(self.reconnect_base_ms),
                max_delay: Duration::from_secs(self.reconnect_max_secs),
            },
            ..Default::default()
        }
    }
}
