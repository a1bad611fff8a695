//! Configuration loading.

use crate::error::ConfigError;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject limit values the runtime cannot honor.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.outgoing_queue == 0 {
            return Err(ConfigError::Invalid(
                "limits.outgoing_queue must be at least 1".to_string(),
            ));
        }
        if self.limits.max_line_length == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_line_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                listen: default_listen(),
            },
            limits: LimitsConfig::default(),
        }
    }
}

/// Network listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (e.g., "0.0.0.0:9999").
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

/// Relay resource limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Per-session outbound queue depth. A session whose queue overflows
    /// during fan-out is dropped rather than allowed to stall the pass.
    #[serde(default = "default_outgoing_queue")]
    pub outgoing_queue: usize,

    /// Maximum accepted input line length in bytes.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            outgoing_queue: default_outgoing_queue(),
            max_line_length: default_max_line_length(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9999))
}

fn default_outgoing_queue() -> usize {
    64
}

fn default_max_line_length() -> usize {
    512
}
