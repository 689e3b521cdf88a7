//! Client-side settings for REST clients and WebSocket sessions
//!
//! Settings come from code, from `EXCHANGE_*` environment variables, or from a TOML document.
//! Per-venue protocol knowledge does not live here; see [`crate::venues`].

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::time::Duration;

use crate::{AdapterError, Result};

/// API credentials used to sign private REST calls
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Public key, sent in the venue's key header
    pub api_key: String,
    /// HMAC secret, never sent
    pub api_secret: String,
}

impl Credentials {
    /// Credentials from a key and secret pair
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}

/// Settings of one REST client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestClientConfig {
    /// Canonical timestamps in milliseconds instead of seconds
    pub use_milliseconds: bool,

    /// Request the venue's maximum page size when a call does not decide
    pub use_max_limit: bool,

    /// Client-side request quota, unlimited when absent
    pub requests_per_minute: Option<u32>,

    /// Replaces the venue base URL, keeping its `{version}` placeholder if any
    pub base_url: Option<String>,

    /// HTTP user agent
    pub user_agent: String,
}

impl Default for RestClientConfig {
    fn default() -> Self {
        Self {
            use_milliseconds: true,
            use_max_limit: false,
            requests_per_minute: None,
            base_url: None,
            user_agent: concat!("exchange-adapters/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl RestClientConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            use_milliseconds: env_flag("EXCHANGE_USE_MILLISECONDS")
                .unwrap_or(defaults.use_milliseconds),

            use_max_limit: env_flag("EXCHANGE_USE_MAX_LIMIT").unwrap_or(defaults.use_max_limit),

            requests_per_minute: env::var("EXCHANGE_REQUESTS_PER_MINUTE")
                .ok()
                .and_then(|s| s.parse().ok()),

            base_url: env::var("EXCHANGE_REST_URL").ok(),

            user_agent: env::var("EXCHANGE_USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }

    /// Parse from a TOML document; missing keys take their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| AdapterError::Configuration(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.requests_per_minute == Some(0) {
            return Err("Requests per minute must be greater than 0".to_string());
        }

        if let Some(url) = &self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("REST base URL must start with http:// or https://".to_string());
            }
        }

        Ok(())
    }
}

/// Settings of one WebSocket session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Canonical timestamps in milliseconds instead of seconds
    pub use_milliseconds: bool,

    /// Delay before every reconnect attempt except the first
    pub reconnect_delay_ms: u64,

    /// Consecutive reconnect attempts allowed before the session gives up
    pub reconnect_budget: u32,

    /// Opening handshake timeout
    pub connect_timeout_ms: u64,

    /// Replaces the venue stream URL, keeping its `{version}` placeholder if any
    pub url: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            use_milliseconds: true,
            reconnect_delay_ms: 3000,
            reconnect_budget: 3,
            connect_timeout_ms: 10000,
            url: None,
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            use_milliseconds: env_flag("EXCHANGE_USE_MILLISECONDS")
                .unwrap_or(defaults.use_milliseconds),

            reconnect_delay_ms: env::var("EXCHANGE_WS_RECONNECT_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.reconnect_delay_ms),

            reconnect_budget: env::var("EXCHANGE_WS_RECONNECT_BUDGET")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.reconnect_budget),

            connect_timeout_ms: env::var("EXCHANGE_WS_CONNECT_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.connect_timeout_ms),

            url: env::var("EXCHANGE_WS_URL").ok(),
        }
    }

    /// Parse from a TOML document; missing keys take their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| AdapterError::Configuration(e.to_string()))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.connect_timeout_ms == 0 {
            return Err("Connect timeout must be greater than 0".to_string());
        }

        if let Some(url) = &self.url {
            if !url.starts_with("ws://") && !url.starts_with("wss://") {
                return Err("WebSocket URL must start with ws:// or wss://".to_string());
            }
        }

        Ok(())
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key).ok().map(|s| {
        let s = s.to_lowercase();
        s == "true" || s == "1"
    })
}
