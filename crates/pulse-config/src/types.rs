//! Configuration types

use pulse_core::{Error, Priority, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// HTTP probe server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Aggregator tuning
    #[serde(default)]
    pub aggregator: AggregatorSettings,

    /// Checks registered at startup
    #[serde(default)]
    pub checks: Vec<CheckConfig>,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.aggregator.backoff_factor.is_finite() || self.aggregator.backoff_factor < 1.0 {
            return Err(Error::Config(format!(
                "backoff_factor must be >= 1.0, got {}",
                self.aggregator.backoff_factor
            )));
        }

        for check in &self.checks {
            check.validate()?;
        }
        Ok(())
    }
}

/// HTTP probe server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("static address")
}

/// Aggregator tuning, mirroring the recognized option set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatorSettings {
    /// Staleness threshold for health records
    #[serde(default = "default_expiry_time", with = "humantime_serde")]
    pub expiry_time: Duration,

    /// Update channel capacity
    #[serde(default = "default_update_buffer")]
    pub update_buffer: usize,

    /// Whether the auto-check scheduler runs
    #[serde(default)]
    pub auto_check: bool,

    /// Period between auto-check rounds
    #[serde(default = "default_check_interval", with = "humantime_serde")]
    pub check_interval: Duration,

    /// Delay before the scheduler's first round
    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Ceiling for per-checker backoff
    #[serde(default = "default_max_backoff", with = "humantime_serde")]
    pub max_backoff: Duration,

    /// Backoff growth factor
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            expiry_time: default_expiry_time(),
            update_buffer: default_update_buffer(),
            auto_check: false,
            check_interval: default_check_interval(),
            initial_delay: default_initial_delay(),
            max_backoff: default_max_backoff(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

fn default_expiry_time() -> Duration {
    Duration::from_secs(30)
}

fn default_update_buffer() -> usize {
    100
}

fn default_check_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_check_timeout() -> Duration {
    Duration::from_secs(5)
}

/// One check registered at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckConfig {
    /// TCP reachability check
    Tcp {
        /// Checker name (registry key)
        name: String,
        /// Target `host:port`
        address: String,
        /// Connect timeout
        #[serde(default = "default_check_timeout", with = "humantime_serde")]
        timeout: Duration,
        /// Priority tier
        #[serde(default)]
        priority: Priority,
    },

    /// HTTP endpoint check
    Http {
        /// Checker name (registry key)
        name: String,
        /// URL probed for liveness
        liveness_url: String,
        /// URL probed for readiness; defaults to the liveness URL
        #[serde(default)]
        readiness_url: Option<String>,
        /// Request timeout
        #[serde(default = "default_check_timeout", with = "humantime_serde")]
        timeout: Duration,
        /// Priority tier
        #[serde(default)]
        priority: Priority,
    },

    /// Fixed-outcome check
    Static {
        /// Checker name (registry key)
        name: String,
        /// Whether the checker reports ready
        #[serde(default = "default_true")]
        ready: bool,
        /// Priority tier
        #[serde(default)]
        priority: Priority,
    },
}

fn default_true() -> bool {
    true
}

impl CheckConfig {
    /// The checker name this entry registers under
    pub fn name(&self) -> &str {
        match self {
            CheckConfig::Tcp { name, .. }
            | CheckConfig::Http { name, .. }
            | CheckConfig::Static { name, .. } => name,
        }
    }

    /// Validate a single check entry
    pub fn validate(&self) -> Result<()> {
        if self.name().is_empty() {
            return Err(Error::Config("check name must not be empty".to_string()));
        }

        match self {
            CheckConfig::Tcp { address, .. } => {
                if address.is_empty() {
                    return Err(Error::Config(format!(
                        "tcp check '{}' needs an address",
                        self.name()
                    )));
                }
            }
            CheckConfig::Http {
                liveness_url,
                readiness_url,
                ..
            } => {
                parse_url(self.name(), liveness_url)?;
                if let Some(url) = readiness_url {
                    parse_url(self.name(), url)?;
                }
            }
            CheckConfig::Static { .. } => {}
        }
        Ok(())
    }
}

fn parse_url(name: &str, url: &str) -> Result<http::Uri> {
    url.parse::<http::Uri>()
        .map_err(|e| Error::Config(format!("http check '{name}': invalid url '{url}': {e}")))
}
