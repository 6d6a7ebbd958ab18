//! Typed records persisted to a local JSON file and mirrored to the
//! remote settings area.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cloudsave_state::prefs::write_atomic;
use cloudsave_state::{CloudPrefs, PrefsStore};
use cloudsave_sync::{CloudSync, RemoteSelector, Result, SyncError, SyncOptions, SETTINGS_AREA};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Storage for a single record of type `T`.
#[async_trait]
pub trait Datastore<T>: Send + Sync {
    /// Queues `record` for persistence. Failures surface on the next
    /// [`Datastore::flush`].
    fn store(&self, record: T);

    async fn fetch(&self) -> Result<T>;

    /// Waits until every earlier `store` is applied and returns the most
    /// recent failure since the previous flush.
    async fn flush(&self) -> Result<()>;

    async fn stop(&self);
}

enum Command<T> {
    Store(T),
    Flush(oneshot::Sender<Result<()>>),
}

/// Datastore backed by a local file and the remote settings area.
///
/// Writes are applied by a worker task in submission order: each record is
/// written atomically to the local file, then the file is pushed to the
/// remote. A `fetch` is not ordered against pending writes; flush first when
/// the latest write must be observed.
pub struct CloudDatastore<T> {
    path: PathBuf,
    commands: mpsc::UnboundedSender<Command<T>>,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    cloud: Arc<dyn CloudSync>,
    selector: Arc<dyn RemoteSelector>,
    settings_area: String,
}

struct StoreWorker<T> {
    path: PathBuf,
    cloud: Arc<dyn CloudSync>,
    selector: Arc<dyn RemoteSelector>,
    settings_area: String,
    options: SyncOptions,
    last_error: Option<SyncError>,
    _record: PhantomData<fn(T)>,
}

impl<T> CloudDatastore<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Starts the store's worker on the current runtime.
    pub fn spawn(
        path: impl Into<PathBuf>,
        cloud: Arc<dyn CloudSync>,
        selector: Arc<dyn RemoteSelector>,
        options: SyncOptions,
    ) -> Self {
        Self::spawn_in(path, cloud, selector, options, SETTINGS_AREA)
    }

    /// Like [`CloudDatastore::spawn`] with an explicit remote area.
    pub fn spawn_in(
        path: impl Into<PathBuf>,
        cloud: Arc<dyn CloudSync>,
        selector: Arc<dyn RemoteSelector>,
        options: SyncOptions,
        settings_area: &str,
    ) -> Self {
        let path = path.into();
        let settings_area = normalize_area(settings_area);
        let (commands, receiver) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let worker = StoreWorker {
            path: path.clone(),
            cloud: cloud.clone(),
            selector: selector.clone(),
            settings_area: settings_area.clone(),
            options,
            last_error: None,
            _record: PhantomData,
        };
        let handle = tokio::spawn(worker.run(receiver, shutdown.clone()));
        Self {
            path,
            commands,
            shutdown,
            worker: Mutex::new(Some(handle)),
            cloud,
            selector,
            settings_area,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remote location of the record's file.
    pub fn remote_file(&self) -> String {
        format!("{}{}", self.settings_area, file_name(&self.path))
    }
}

impl<T> Drop for CloudDatastore<T> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl<T> Datastore<T> for CloudDatastore<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    fn store(&self, record: T) {
        if self.commands.send(Command::Store(record)).is_err() {
            tracing::warn!(
                target: "cloudsave::datastore",
                path = %self.path.display(),
                "Datastore stopped; record dropped"
            );
        }
    }

    async fn fetch(&self) -> Result<T> {
        let remote = self.selector.current()?;
        let remote_file = self.remote_file();
        tracing::info!(
            target: "cloudsave::datastore",
            remote_file = %remote_file,
            path = %self.path.display(),
            "Fetching record"
        );
        self.cloud
            .pull_file(remote.as_ref(), &remote_file, &self.path)
            .await?;
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| SyncError::LocalIo {
                path: self.path.clone(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|source| SyncError::Serialization {
            path: self.path.clone(),
            source,
        })
    }

    async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Flush(tx))
            .map_err(|_| SyncError::Stopped)?;
        rx.await.unwrap_or(Err(SyncError::Stopped))
    }

    /// Applies queued writes, then ends the worker.
    async fn stop(&self) {
        self.shutdown.cancel();
        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                tracing::error!(target: "cloudsave::datastore", error = %err, "Datastore worker panicked");
            }
        }
    }
}

impl<T> StoreWorker<T>
where
    T: Serialize + Send + 'static,
{
    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Command<T>>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                command = receiver.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
            }
        }
        receiver.close();
        while let Some(command) = receiver.recv().await {
            self.handle(command).await;
        }
        tracing::debug!(target: "cloudsave::datastore", path = %self.path.display(), "Datastore worker stopped");
    }

    async fn handle(&mut self, command: Command<T>) {
        match command {
            Command::Store(record) => {
                let encoded = serde_json::to_vec_pretty(&record);
                drop(record);
                let persisted = match encoded {
                    Ok(data) => self.persist(&data).await,
                    Err(source) => Err(SyncError::Serialization {
                        path: self.path.clone(),
                        source,
                    }),
                };
                if let Err(err) = persisted {
                    tracing::warn!(
                        target: "cloudsave::datastore",
                        path = %self.path.display(),
                        error = %err,
                        "Failed to persist record"
                    );
                    self.last_error = Some(err);
                }
            }
            Command::Flush(reply) => {
                let outcome = match self.last_error.take() {
                    Some(err) => Err(err),
                    None => Ok(()),
                };
                let _ = reply.send(outcome);
            }
        }
    }

    async fn persist(&self, data: &[u8]) -> Result<()> {
        write_atomic(&self.path, data).map_err(|source| SyncError::LocalIo {
            path: self.path.clone(),
            source,
        })?;

        let remote = self.selector.current()?;
        let dir = parent_dir(&self.path);
        let options = self.options.clone().with_include(file_name(&self.path));
        self.cloud
            .perform_sync(remote.as_ref(), &options, dir, &self.settings_area)
            .await
            .map(|_| ())
    }
}

/// Datastore over the preferences file, so saving preferences also pushes
/// them to the remote settings area.
pub fn prefs_datastore(
    prefs: &PrefsStore,
    cloud: Arc<dyn CloudSync>,
    selector: Arc<dyn RemoteSelector>,
) -> CloudDatastore<CloudPrefs> {
    CloudDatastore::spawn(prefs.path(), cloud, selector, SyncOptions::defaults())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn normalize_area(area: &str) -> String {
    format!("{}/", area.trim_end_matches('/'))
}
