//! Shared test utilities for cloudsave crates.
//!
//! This crate provides common test fixtures and utilities used across
//! multiple crates in the cloudsave workspace.

use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};

const FAKE_TOOL_SCRIPT: &str = include_str!("fake_tool.sh");

/// Serialize tests that mutate process-global state (env vars, cwd, etc).
///
/// Acquire this guard at the start of any test that modifies environment
/// variables to prevent race conditions between parallel tests.
pub fn env_guard() -> MutexGuard<'static, ()> {
    static TEST_SERIAL: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    TEST_SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

/// RAII guard for environment variables - restores original value on drop.
pub struct EnvVarGuard {
    key: &'static str,
    previous: Option<String>,
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        if let Some(v) = &self.previous {
            std::env::set_var(self.key, v);
        } else {
            std::env::remove_var(self.key);
        }
    }
}

/// Set an environment variable and return a guard that restores the original on drop.
///
/// # Example
/// ```
/// let _guard = cloudsave_test_utils::set_env_var("MY_VAR", Some("value"));
/// // MY_VAR is set to "value"
/// // When _guard drops, MY_VAR is restored to its original value
/// ```
pub fn set_env_var(key: &'static str, value: Option<&str>) -> EnvVarGuard {
    let previous = std::env::var(key).ok();
    if let Some(val) = value {
        std::env::set_var(key, val);
    } else {
        std::env::remove_var(key);
    }
    EnvVarGuard { key, previous }
}

/// Scripted stand-in for the external sync tool.
///
/// The tool is a POSIX shell script run through `sh` (never executed
/// directly, so freshly written scripts cannot hit `ETXTBSY`). Remote
/// paths of the form `name:path` resolve to `<root>/remote/path`; every
/// invocation is appended to `<root>/invocations.log`.
pub struct FakeTool {
    pub tempdir: tempfile::TempDir,
    root: PathBuf,
    script: PathBuf,
}

impl FakeTool {
    pub fn new() -> std::io::Result<Self> {
        let tempdir = tempfile::tempdir()?;
        let root = tempdir.path().join("tool");
        std::fs::create_dir_all(root.join("remote"))?;
        let script = root.join("fake-rclone.sh");
        let body = format!(
            "#!/bin/sh\nROOT='{}'\n{}",
            root.display(),
            FAKE_TOOL_SCRIPT
        );
        std::fs::write(&script, body)?;
        Ok(Self {
            tempdir,
            root,
            script,
        })
    }

    /// Interpreter to launch.
    pub fn program(&self) -> &'static str {
        "sh"
    }

    /// Arguments placed before the tool's own arguments.
    pub fn leading_args(&self) -> Vec<String> {
        vec![self.script.display().to_string()]
    }

    /// A scratch directory for "local" data, outside the fake remote.
    pub fn local_dir(&self, name: &str) -> PathBuf {
        self.tempdir.path().join("local").join(name)
    }

    /// Filesystem location backing `remote_path` on any configured remote.
    pub fn remote_dir(&self, remote_path: &str) -> PathBuf {
        self.root
            .join("remote")
            .join(remote_path.trim_start_matches('/'))
    }

    /// Pretends `name` was already provisioned (appears in `config dump`).
    pub fn mark_provisioned(&self, name: &str) -> std::io::Result<()> {
        std::fs::write(
            self.root.join("config.json"),
            format!("{{\"{name}\":{{\"type\":\"drive\"}}}}\n"),
        )
    }

    pub fn config_dump(&self) -> Option<String> {
        std::fs::read_to_string(self.root.join("config.json")).ok()
    }

    /// Queue exit codes for successive invocations of `action`; once the queue
    /// is drained the action behaves normally.
    pub fn script_exit_codes(&self, action: &str, codes: &[i32]) -> std::io::Result<()> {
        let text: String = codes.iter().map(|c| format!("{c}\n")).collect();
        std::fs::write(self.root.join(format!("exit_codes_{action}")), text)
    }

    /// Make every invocation of `action` exit with `code`.
    pub fn always_fail(&self, action: &str, code: i32) -> std::io::Result<()> {
        std::fs::write(self.root.join(format!("always_{action}")), code.to_string())
    }

    /// Scripted failures exit without writing to stderr.
    pub fn quiet_failures(&self) -> std::io::Result<()> {
        std::fs::write(self.root.join("quiet"), "")
    }

    /// Every recorded invocation, as argument vectors.
    pub fn invocations(&self) -> Vec<Vec<String>> {
        let Ok(text) = std::fs::read_to_string(self.root.join("invocations.log")) else {
            return Vec::new();
        };
        text.lines()
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.split('\t')
                    .filter(|arg| !arg.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .collect()
    }

    /// Recorded invocations whose subcommand is `action`.
    pub fn invocations_of(&self, action: &str) -> Vec<Vec<String>> {
        self.invocations()
            .into_iter()
            .filter(|args| subcommand(args) == Some(action))
            .collect()
    }

    pub fn clear_invocations(&self) -> std::io::Result<()> {
        let log = self.root.join("invocations.log");
        if log.exists() {
            std::fs::remove_file(log)?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// First argument that is not a flag.
pub fn subcommand(args: &[String]) -> Option<&str> {
    args.iter().map(String::as_str).find(|a| !a.starts_with('-'))
}
