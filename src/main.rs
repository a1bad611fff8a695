//! chatterd - plain-text chat relay daemon.
//!
//! One TCP listener, one task per client, and a shared roster that fans
//! each client's lines out to every other connected client.

mod commands;
mod config;
mod error;
mod network;
mod state;

use crate::config::Config;
use crate::error::ConfigError;
use crate::network::Gateway;
use crate::state::Roster;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %config_path, "Config file not found, using defaults");
            Config::default()
        }
        Err(e) => {
            error!(path = %config_path, error = %e, "Failed to load config");
            return Err(e.into());
        }
    };

    // Create the Roster (shared state)
    let roster = Arc::new(Roster::new());

    // Bind and run the Gateway. A bind failure is fatal; the accept loop
    // handles its own shutdown (Ctrl-C or listener error).
    let gateway = Gateway::bind(&config, Arc::clone(&roster)).await?;
    info!(addr = %gateway.local_addr()?, "Starting chatterd");

    gateway.run().await
}
