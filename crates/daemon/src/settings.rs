//! Daemon settings
//!
//! Sources, later ones winning:
//! 1. `queue-listener.toml` in the working directory (or `QUEUE_LISTENER_CONFIG`), optional
//! 2. `QUEUE_LISTENER__*` environment variables, `__` separating nested keys
//!
//! ```text
//! QUEUE_LISTENER__POOL_SIZE=32
//! QUEUE_LISTENER__SHUTDOWN_TIMEOUT_SECS=30
//! ```

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use queue_listener_core::config::ListenerProperties;
use serde::Deserialize;

pub const CONFIG_PATH_ENV: &str = "QUEUE_LISTENER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "queue-listener.toml";
const ENV_PREFIX: &str = "QUEUE_LISTENER";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaemonSettings {
    /// AWS region override; falls back to the default provider chain
    #[serde(default)]
    pub region: Option<String>,

    #[serde(flatten)]
    pub listener: ListenerProperties,
}

/// Load and validate settings from the default locations
pub fn load() -> Result<DaemonSettings> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    load_from(&path)
}

pub fn load_from(path: &str) -> Result<DaemonSettings> {
    let settings: DaemonSettings = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("failed to read settings from {path}"))?
        .try_deserialize()
        .context("invalid settings")?;

    settings.listener.validate()?;
    Ok(settings)
}
