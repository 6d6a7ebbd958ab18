//! The sync policy engine.
//!
//! [`CloudManager`] is the only component that runs the external tool. It
//! holds no worker and no per-call state: each operation issues one or more
//! subprocess invocations and returns when they finish.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use cloudsave_state::{CloudPrefs, SyncStrategy};
use parking_lot::RwLock;

use crate::error::{Result, SyncError};
use crate::listing::{parse_listing, CloudFile};
use crate::options::SyncOptions;
use crate::progress::{ProgressMessage, ProgressSink};
use crate::remotes::RemoteBackend;
use crate::tool::{ToolConfig, ToolOutput};

/// Top-level folder on every remote under which this application writes.
pub const TOPLEVEL_CLOUD_FOLDER: &str = "opencloudsaves/";

/// Remote area mirroring the local settings directory.
pub const SETTINGS_AREA: &str = "opencloudsaves/user_settings/";

/// Exit status of `bisync` meaning the change-tracking baseline is missing
/// or inconsistent.
pub const REBASELINE_EXIT_CODE: i32 = 2;

const RESYNC_FLAG: &str = "--resync";

/// The sync operations other components depend on.
#[async_trait]
pub trait CloudSync: Send + Sync {
    /// Reconciles `local` with `remote_path` on `remote` using the active
    /// strategy. Returns the tool's report.
    async fn perform_sync(
        &self,
        remote: &dyn RemoteBackend,
        options: &SyncOptions,
        local: &Path,
        remote_path: &str,
    ) -> Result<String>;

    /// Copies one remote file over `local_file`.
    async fn pull_file(
        &self,
        remote: &dyn RemoteBackend,
        remote_file: &str,
        local_file: &Path,
    ) -> Result<String>;
}

/// Drives the external tool.
pub struct CloudManager {
    tool: ToolConfig,
    strategy: RwLock<SyncStrategy>,
    progress: Option<ProgressSink>,
}

impl CloudManager {
    pub fn new(tool: ToolConfig, strategy: SyncStrategy) -> Self {
        Self {
            tool,
            strategy: RwLock::new(strategy),
            progress: None,
        }
    }

    /// Manager whose strategy follows the persisted preferences.
    pub fn from_prefs(tool: ToolConfig, prefs: &CloudPrefs) -> Self {
        Self::new(tool, prefs.strategy())
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn tool(&self) -> &ToolConfig {
        &self.tool
    }

    pub fn strategy(&self) -> SyncStrategy {
        *self.strategy.read()
    }

    /// Switches the strategy for every subsequent [`CloudSync::perform_sync`].
    pub fn set_strategy(&self, strategy: SyncStrategy) {
        tracing::info!(target: "cloudsave::engine", ?strategy, "Sync strategy changed");
        *self.strategy.write() = strategy;
    }

    fn report(&self, message: ProgressMessage) {
        if let Some(sink) = &self.progress {
            sink.send(message);
        }
    }

    /// Creates the remote's configuration entry unless it already exists.
    pub async fn ensure_provisioned(&self, remote: &dyn RemoteBackend) -> Result<()> {
        tracing::info!(target: "cloudsave::engine", remote = remote.name(), "Checking if remote exists");
        if self.contains_remote(remote).await {
            return Ok(());
        }
        tracing::info!(target: "cloudsave::engine", remote = remote.name(), "Provisioning remote");
        self.provision(remote).await.inspect_err(|err| {
            tracing::error!(target: "cloudsave::engine", remote = remote.name(), error = %err, "Provisioning failed");
        })
    }

    /// Whether the tool's configuration dump has an entry for `remote`.
    ///
    /// Any failure to run or parse the dump counts as "absent".
    pub async fn contains_remote(&self, remote: &dyn RemoteBackend) -> bool {
        let out = match self.tool.run(&args(["config", "dump"])).await {
            Ok(out) if out.success() => out,
            Ok(out) => {
                tracing::info!(target: "cloudsave::engine", stderr = %out.stderr, "config dump failed");
                return false;
            }
            Err(err) => {
                tracing::info!(target: "cloudsave::engine", error = %err, "config dump failed");
                return false;
            }
        };
        match serde_json::from_str::<HashMap<String, serde_json::Value>>(&out.stdout) {
            Ok(entries) => entries.contains_key(remote.name()),
            Err(err) => {
                tracing::error!(target: "cloudsave::engine", error = %err, "config dump is not a JSON object");
                false
            }
        }
    }

    /// Runs the remote's provisioning recipe unconditionally.
    pub async fn provision(&self, remote: &dyn RemoteBackend) -> Result<()> {
        // recipes may carry credentials
        let out = self.tool.run_redacted(&remote.provisioning_args()).await?;
        if out.success() {
            Ok(())
        } else {
            Err(SyncError::Provisioning {
                backend: remote.name().to_string(),
                stderr: out.stderr,
            })
        }
    }

    /// Removes the remote's configuration entry.
    pub async fn delete_remote_entry(&self, remote: &dyn RemoteBackend) -> Result<()> {
        self.tool
            .run(&args(["config", "delete", remote.name()]))
            .await?
            .into_report()
            .map(|_| ())
    }

    /// Whether `remote_path` lists successfully. A failed listing of any
    /// kind reads as "does not exist".
    pub async fn remote_dir_exists(&self, remote: &dyn RemoteBackend, remote_path: &str) -> bool {
        let target = remote.remote_path(&dir_path(remote_path));
        match self.tool.run(&args(["lsjson", target.as_str()])).await {
            Ok(out) if out.success() => true,
            Ok(out) => {
                tracing::debug!(target: "cloudsave::engine", path = %target, stderr = %out.stderr, "Remote directory not listable");
                false
            }
            Err(err) => {
                tracing::warn!(target: "cloudsave::engine", path = %target, error = %err, "Remote directory check failed");
                false
            }
        }
    }

    pub async fn make_remote_dir(&self, remote: &dyn RemoteBackend, remote_path: &str) -> Result<()> {
        let target = remote.remote_path(&dir_path(remote_path));
        self.tool
            .run(&args(["mkdir", target.as_str()]))
            .await?
            .into_report()
            .map(|_| ())
    }

    /// Lists `path` (local or `name:path`) honoring the include pattern.
    pub async fn list_files(&self, options: &SyncOptions, path: &str) -> Result<Vec<CloudFile>> {
        let mut argv = vec!["--use-json-log".to_string()];
        if let Some(pattern) = options.include.as_deref().filter(|p| !p.is_empty()) {
            argv.push(format!("--include={pattern}"));
        }
        argv.extend(args(["lsjson", path]));
        let out = self.tool.run(&argv).await?;
        if !out.success() {
            return Err(out.into_transport_error());
        }
        parse_listing(&out.stdout)
    }

    /// Converts a plaintext secret into the tool's obscured form.
    pub async fn obscure_secret(&self, secret: &str) -> Result<String> {
        let out = self.tool.run_redacted(&args(["obscure", secret])).await?;
        if !out.success() {
            return Err(out.into_transport_error());
        }
        Ok(out.stdout.trim_end().to_string())
    }

    /// Pull newer remote files without deleting, then mirror local onto
    /// remote. The pull is skipped when the remote was just created.
    async fn merge_then_mirror(
        &self,
        options: &SyncOptions,
        local: &str,
        remote: &str,
        remote_existed: bool,
    ) -> Result<String> {
        let pulled = if remote_existed {
            self.report(ProgressMessage::info(format!("Pulling newer files from {remote}")));
            Some(self.directional("copy", &options.for_pull(), remote, local).await?)
        } else {
            tracing::info!(target: "cloudsave::engine", remote, "Remote directory is new; skipping pull");
            None
        };
        self.report(ProgressMessage::info(format!("Mirroring {local} to {remote}")));
        let mirrored = self.directional("sync", options, local, remote).await?;
        Ok(match pulled {
            Some(pulled) => format!("{pulled}\n{mirrored}"),
            None => mirrored,
        })
    }

    async fn directional(
        &self,
        action: &str,
        options: &SyncOptions,
        source: &str,
        dest: &str,
    ) -> Result<String> {
        let mut argv = options.to_flags();
        argv.extend(args([action, source, dest]));
        self.tool.run(&argv).await?.into_report()
    }

    /// Two-way reconciliation with a single `--resync` retry on a baseline
    /// mismatch.
    async fn bisync(&self, options: &SyncOptions, local: &str, remote: &str) -> Result<String> {
        let mut argv = options.to_bisync_flags();
        argv.extend(args(["bisync", local, remote]));
        match bisync_outcome(self.tool.run(&argv).await?) {
            Err(SyncError::RebaselineRequired { stderr }) => {
                tracing::info!(target: "cloudsave::engine", stderr = %stderr, "Need to run resync");
                self.report(ProgressMessage::info("Re-establishing sync baseline"));
                argv.push(RESYNC_FLAG.to_string());
                let retry = self.tool.run(&argv).await?;
                if retry.status == Some(REBASELINE_EXIT_CODE) {
                    return Err(retry.into_transport_error());
                }
                retry.into_report()
            }
            outcome => outcome,
        }
    }

    async fn run_sync(
        &self,
        remote: &dyn RemoteBackend,
        options: &SyncOptions,
        local: &Path,
        remote_path: &str,
    ) -> Result<String> {
        tokio::fs::create_dir_all(local)
            .await
            .map_err(|e| SyncError::local_io(local, e))?;

        let remote_existed = self.remote_dir_exists(remote, remote_path).await;
        if !remote_existed {
            self.make_remote_dir(remote, remote_path).await?;
        }

        let local_arg = local.to_string_lossy();
        let remote_arg = remote.remote_path(remote_path);
        match self.strategy() {
            SyncStrategy::MergeThenMirror => {
                self.merge_then_mirror(options, &local_arg, &remote_arg, remote_existed)
                    .await
            }
            SyncStrategy::Bidirectional => self.bisync(options, &local_arg, &remote_arg).await,
        }
    }
}

#[async_trait]
impl CloudSync for CloudManager {
    async fn perform_sync(
        &self,
        remote: &dyn RemoteBackend,
        options: &SyncOptions,
        local: &Path,
        remote_path: &str,
    ) -> Result<String> {
        tracing::info!(
            target: "cloudsave::engine",
            remote = remote.name(),
            local = %local.display(),
            remote_path,
            "Performing sync operation"
        );
        let outcome = self.run_sync(remote, options, local, remote_path).await;
        match &outcome {
            Ok(text) => self.report(ProgressMessage::done(text.clone())),
            Err(err) => {
                tracing::warn!(target: "cloudsave::engine", error = %err, "Sync operation failed");
                self.report(ProgressMessage::failed(err.to_string()));
            }
        }
        outcome
    }

    async fn pull_file(
        &self,
        remote: &dyn RemoteBackend,
        remote_file: &str,
        local_file: &Path,
    ) -> Result<String> {
        if let Some(parent) = local_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::local_io(parent, e))?;
        }
        let source = remote.remote_path(remote_file);
        let dest = local_file.to_string_lossy();
        tracing::info!(target: "cloudsave::engine", source = %source, dest = %dest, "Pulling file");
        self.tool
            .run(&args(["--use-json-log", "copyto", source.as_str(), dest.as_ref()]))
            .await?
            .into_report()
    }
}

fn bisync_outcome(out: ToolOutput) -> Result<String> {
    if out.status == Some(REBASELINE_EXIT_CODE) {
        return Err(SyncError::RebaselineRequired { stderr: out.stderr });
    }
    out.into_report()
}

/// `path` with exactly one trailing slash.
fn dir_path(path: &str) -> String {
    format!("{}/", path.trim_end_matches('/'))
}

fn args<'a>(parts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    parts.into_iter().map(str::to_string).collect()
}
