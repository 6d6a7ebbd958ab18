//! Invocation of the external sync tool as a subprocess.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{Result, SyncError};

/// Configuration for launching the external tool.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Executable name or path.
    pub binary: String,
    /// Arguments placed before every invocation's own arguments.
    pub leading_args: Vec<String>,
    /// Environment variables to set for the subprocess.
    pub env_vars: HashMap<String, String>,
    /// Kill the subprocess if it runs longer than this.
    pub timeout: Option<Duration>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            binary: default_tool_binary(),
            leading_args: Vec::new(),
            env_vars: HashMap::new(),
            timeout: None,
        }
    }
}

/// Bundled binary when present next to the application, else `$PATH`.
///
/// On macOS an application bundle keeps the tool in `Contents/Resources`.
pub fn default_tool_binary() -> String {
    if cfg!(windows) {
        return "./bin/rclone.exe".to_string();
    }
    if Path::new("./bin/rclone").exists() {
        return "./bin/rclone".to_string();
    }
    if cfg!(target_os = "macos") {
        let bundled = std::env::current_exe()
            .ok()
            .and_then(|exe| bundle_resource_binary(&exe))
            .filter(|path| path.exists());
        if let Some(path) = bundled {
            return path.to_string_lossy().into_owned();
        }
    }
    "rclone".to_string()
}

/// `<exe dir>/../Resources/rclone`.
fn bundle_resource_binary(exe: &Path) -> Option<PathBuf> {
    let contents = exe.parent()?.parent()?;
    Some(contents.join("Resources").join("rclone"))
}

impl ToolConfig {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            ..Default::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Looks for:
    /// - CLOUDSAVE_TOOL_BINARY: Path to the tool
    /// - CLOUDSAVE_TOOL_TIMEOUT_MS: Per-invocation timeout in milliseconds
    pub fn from_env() -> Self {
        let binary = std::env::var("CLOUDSAVE_TOOL_BINARY")
            .ok()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(default_tool_binary);
        let timeout = match std::env::var("CLOUDSAVE_TOOL_TIMEOUT_MS") {
            Ok(v) => match v.parse::<u64>() {
                Ok(ms) => Some(Duration::from_millis(ms)),
                Err(_) => {
                    tracing::warn!(
                        target: "cloudsave::tool",
                        value = %v,
                        "Invalid CLOUDSAVE_TOOL_TIMEOUT_MS value, running without timeout"
                    );
                    None
                }
            },
            Err(_) => None,
        };
        Self {
            binary,
            timeout,
            ..Default::default()
        }
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Runs the tool to completion and captures its output.
    ///
    /// A non-zero exit is not an error here; callers interpret the status.
    pub(crate) async fn run(&self, args: &[String]) -> Result<ToolOutput> {
        self.run_inner(args, false).await
    }

    /// Like [`ToolConfig::run`] but keeps the arguments out of the log.
    pub(crate) async fn run_redacted(&self, args: &[String]) -> Result<ToolOutput> {
        self.run_inner(args, true).await
    }

    async fn run_inner(&self, args: &[String], redact: bool) -> Result<ToolOutput> {
        if redact {
            tracing::info!(
                target: "cloudsave::tool",
                binary = %self.binary,
                subcommand = args.first().map(String::as_str).unwrap_or(""),
                "Running command"
            );
        } else {
            tracing::info!(
                target: "cloudsave::tool",
                binary = %self.binary,
                args = ?args,
                "Running command"
            );
        }

        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let child = cmd.spawn().map_err(|source| SyncError::Spawn {
            binary: self.binary.clone(),
            source,
        })?;

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        target: "cloudsave::tool",
                        timeout = ?limit,
                        "Sync tool timed out; killed"
                    );
                    return Err(SyncError::Timeout(limit));
                }
            },
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|e| SyncError::Transport {
            detail: format!("failed to wait for sync tool: {e}"),
        })?;

        let result = ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(
            target: "cloudsave::tool",
            status = ?result.status,
            stdout_len = result.stdout.len(),
            stderr_len = result.stderr.len(),
            "Command finished"
        );
        Ok(result)
    }
}

/// Captured result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// The human-readable report: stderr, where the tool logs, unless empty.
    pub fn report(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            self.stderr.clone()
        }
    }

    /// Non-zero exit as a transport failure carrying stderr verbatim.
    pub(crate) fn into_transport_error(self) -> SyncError {
        let detail = if self.stderr.is_empty() {
            format!("sync tool exited with status {:?}", self.status)
        } else {
            self.stderr
        };
        SyncError::Transport { detail }
    }

    /// `Ok(report)` on success, transport error otherwise.
    pub(crate) fn into_report(self) -> Result<String> {
        if self.success() {
            Ok(self.report())
        } else {
            Err(self.into_transport_error())
        }
    }
}
