//! Configuration file support for cloudsave.
//!
//! Loads settings from `<config dir>/config.toml` with the following precedence:
//! CLI arguments > Environment variables > Config file
//!
//! ## Configuration File Format
//!
//! ```toml
//! [tool]
//! # External sync tool executable
//! binary = "/usr/bin/rclone"
//!
//! # Kill the tool if a single invocation runs longer than this
//! timeout_ms = 600000
//!
//! [logging]
//! path = "/var/log/opencloudsave.log"
//! filter = "cloudsave=debug"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::env::config_dir;

/// Top-level configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tool: ToolSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// External tool settings.
#[derive(Debug, Default, Deserialize)]
pub struct ToolSection {
    pub binary: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Log output settings.
#[derive(Debug, Default, Deserialize)]
pub struct LoggingSection {
    pub path: Option<String>,
    pub filter: Option<String>,
}

fn config_path() -> Option<PathBuf> {
    config_dir().ok().map(|d| d.join("config.toml"))
}

/// Loads the configuration file at `path`.
///
/// Returns `Ok(None)` if the file doesn't exist and `Err` if it fails to parse.
pub fn load_config_from(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))?;

    tracing::debug!(
        target: "cloudsave::config",
        path = %path.display(),
        "Loaded configuration file"
    );

    Ok(Some(config))
}

/// Loads the configuration file from the default location if it exists.
pub fn load_config() -> Result<Option<Config>> {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => Ok(None),
    }
}

/// Applies configuration file settings to environment variables.
///
/// Only sets variables that are not already set. Call early at startup,
/// before the tool configuration or logging is initialised.
pub fn apply_config_to_env() {
    match load_config() {
        Ok(Some(config)) => apply_to_env(&config),
        Ok(None) => {}
        Err(err) => tracing::warn!(
            target: "cloudsave::config",
            error = %err,
            "Ignoring unreadable configuration file"
        ),
    }
}

fn apply_to_env(config: &Config) {
    fn set_if_absent(key: &str, value: &str) {
        if std::env::var(key).is_err() {
            std::env::set_var(key, value);
            tracing::trace!(
                target: "cloudsave::config",
                key,
                "Set environment variable from config file"
            );
        }
    }

    if let Some(ref binary) = config.tool.binary {
        set_if_absent("CLOUDSAVE_TOOL_BINARY", binary);
    }
    if let Some(timeout) = config.tool.timeout_ms {
        set_if_absent("CLOUDSAVE_TOOL_TIMEOUT_MS", &timeout.to_string());
    }
    if let Some(ref path) = config.logging.path {
        set_if_absent("CLOUDSAVE_LOG_FILE", path);
    }
    if let Some(ref filter) = config.logging.filter {
        set_if_absent("CLOUDSAVE_LOG", filter);
    }
}
