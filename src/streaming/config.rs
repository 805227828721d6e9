//! Transport configuration

use std::time::Duration;

pub use crate::config::DEFAULT_URL;

/// Exponential reconnect backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any delay
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (0-based): `min(base * 2^attempt, max)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match 2u32.checked_pow(attempt) {
            Some(factor) => self.base_delay.saturating_mul(factor).min(self.max_delay),
            None => self.max_delay,
        }
    }
}

/// Connection settings for [`TransportClient`](super::TransportClient)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// WebSocket endpoint (`ws://` only)
    pub url: String,
    /// Keepalive ping interval while connected. A connection with no
    /// inbound traffic for a whole interval after a ping is dropped.
    pub ping_interval: Duration,
    /// Limit for the TCP connect plus WebSocket handshake
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    /// Query parameter that carries the token
    pub token_query_param: String,
}

impl TransportConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            ping_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
            token_query_param: "token".to_string(),
        }
    }
}
