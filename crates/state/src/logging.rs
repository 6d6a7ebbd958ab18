//! `tracing` subscriber installation.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::env::default_log_path;

const DEFAULT_FILTER: &str = "info";

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Append to the given file, creating parent directories.
    File(PathBuf),
}

impl LogTarget {
    /// `CLOUDSAVE_LOG_FILE` if set, otherwise the default log file in the cache dir.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = std::env::var("CLOUDSAVE_LOG_FILE") {
            return Ok(LogTarget::File(PathBuf::from(path)));
        }
        Ok(LogTarget::File(default_log_path()?))
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("CLOUDSAVE_LOG").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global fmt subscriber.
///
/// A second call is a no-op: the first installed subscriber stays active.
pub fn init_logging(target: LogTarget) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());
    let installed = match target {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create log directory: {}", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file: {}", path.display()))?;
            eprintln!("Writing log to {}", path.display());
            builder.with_writer(Mutex::new(file)).try_init()
        }
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudsave_test_utils::{env_guard, set_env_var};

    #[test]
    fn target_from_env_prefers_explicit_file() {
        let _g = env_guard();
        let _f = set_env_var("CLOUDSAVE_LOG_FILE", Some("/tmp/explicit.log"));
        assert_eq!(
            LogTarget::from_env().unwrap(),
            LogTarget::File(PathBuf::from("/tmp/explicit.log"))
        );
    }

    #[test]
    fn init_creates_log_file_and_tolerates_reinit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/opencloudsave.log");
        init_logging(LogTarget::File(path.clone())).unwrap();
        assert!(path.exists());
        init_logging(LogTarget::Stderr).unwrap();
    }
}
