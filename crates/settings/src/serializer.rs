//! Serialized synchronization of the shared settings directory.
//!
//! Every request is executed by one worker task, one at a time, in the
//! order the worker receives it. Callers either wait for their request's
//! outcome or submit and move on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cloudsave_sync::{CloudSync, RemoteSelector, Result, SyncError, SyncOptions, SETTINGS_AREA};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Receives the outcome of a fire-and-forget request.
pub type ResultSink = oneshot::Sender<Result<()>>;

struct SyncRequest {
    scope: CancellationToken,
    path: PathBuf,
    reply: Option<ResultSink>,
}

/// Owns the settings-sync worker.
///
/// Dropping the syncer signals the worker to exit once its in-flight
/// request finishes; [`SettingsSyncer::stop`] also waits for that.
pub struct SettingsSyncer {
    requests: mpsc::UnboundedSender<SyncRequest>,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    default_path: Option<PathBuf>,
}

struct SettingsWorker {
    cloud: Arc<dyn CloudSync>,
    selector: Arc<dyn RemoteSelector>,
    settings_area: String,
}

impl SettingsSyncer {
    /// Starts the worker on the current runtime.
    ///
    /// `settings_area` is the remote directory mirroring the local settings
    /// directory; [`SETTINGS_AREA`] when `None`.
    pub fn spawn(
        cloud: Arc<dyn CloudSync>,
        selector: Arc<dyn RemoteSelector>,
        settings_area: Option<String>,
    ) -> Self {
        let (requests, receiver) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let worker = SettingsWorker {
            cloud,
            selector,
            settings_area: settings_area.unwrap_or_else(|| SETTINGS_AREA.to_string()),
        };
        let handle = tokio::spawn(worker.run(receiver, shutdown.clone()));
        Self {
            requests,
            shutdown,
            worker: Mutex::new(Some(handle)),
            default_path: cloudsave_state::default_user_override_path().ok(),
        }
    }

    /// Settings file used when a request names an empty path.
    pub fn with_default_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_path = Some(path.into());
        self
    }

    /// Syncs the directory holding `path` and waits for the outcome.
    pub async fn request_sync(&self, scope: &CancellationToken, path: impl AsRef<Path>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.submit(scope.clone(), path.as_ref(), Some(tx))?;
        rx.await.unwrap_or(Err(SyncError::Stopped))
    }

    /// Queues a sync of the directory holding `path` and returns at once.
    /// The outcome goes to `sink` when one is given.
    pub fn request_sync_non_blocking(
        &self,
        scope: &CancellationToken,
        path: impl AsRef<Path>,
        sink: Option<ResultSink>,
    ) {
        if let Err(err) = self.submit(scope.clone(), path.as_ref(), sink) {
            tracing::warn!(target: "cloudsave::settings", error = %err, "Settings sync request rejected");
        }
    }

    fn submit(&self, scope: CancellationToken, path: &Path, reply: Option<ResultSink>) -> Result<()> {
        let path = if path.as_os_str().is_empty() {
            match &self.default_path {
                Some(default) => default.clone(),
                None => {
                    let err = SyncError::LocalIo {
                        path: PathBuf::new(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "no default settings path",
                        ),
                    };
                    return respond(reply, err);
                }
            }
        } else {
            path.to_path_buf()
        };
        if self.shutdown.is_cancelled() {
            return respond(reply, SyncError::Stopped);
        }
        self.requests
            .send(SyncRequest { scope, path, reply })
            .map_err(|rejected| {
                if let Some(sink) = rejected.0.reply {
                    let _ = sink.send(Err(SyncError::Stopped));
                }
                SyncError::Stopped
            })
    }

    /// Stops taking requests and waits for the in-flight one to finish.
    /// Requests still queued are answered with [`SyncError::Stopped`].
    pub async fn stop(&self) {
        self.shutdown.cancel();
        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                tracing::error!(target: "cloudsave::settings", error = %err, "Settings worker panicked");
            }
        }
    }
}

impl Drop for SettingsSyncer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Hands `err` to the sink of a fire-and-forget request, or returns it to
/// a blocking submitter.
fn respond(reply: Option<ResultSink>, err: SyncError) -> Result<()> {
    match reply {
        Some(sink) => {
            let _ = sink.send(Err(err));
            Ok(())
        }
        None => Err(err),
    }
}

impl SettingsWorker {
    async fn run(self, mut receiver: mpsc::UnboundedReceiver<SyncRequest>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                request = receiver.recv() => match request {
                    Some(request) => self.handle(request).await,
                    None => break,
                },
            }
        }
        // dropping the queue closes every pending reply channel
        drop(receiver);
        tracing::info!(target: "cloudsave::settings", "Settings sync worker stopped");
    }

    async fn handle(&self, request: SyncRequest) {
        let outcome = if request.scope.is_cancelled() {
            tracing::info!(
                target: "cloudsave::settings",
                path = %request.path.display(),
                "Settings sync cancelled before start"
            );
            Err(SyncError::Cancelled)
        } else {
            self.sync_settings(&request.path).await
        };
        if let Err(err) = &outcome {
            tracing::warn!(target: "cloudsave::settings", error = %err, "Settings sync failed");
        }
        if let Some(reply) = request.reply {
            let _ = reply.send(outcome);
        }
    }

    async fn sync_settings(&self, settings_file: &Path) -> Result<()> {
        let remote = self.selector.current()?;
        let dir = match settings_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        tracing::info!(
            target: "cloudsave::settings",
            dir = %dir.display(),
            remote = remote.name(),
            "Syncing user settings"
        );
        self.cloud
            .perform_sync(
                remote.as_ref(),
                &SyncOptions::for_settings(),
                dir,
                &self.settings_area,
            )
            .await
            .map(|_| ())
    }
}
