//! In-process stand-in for the sync engine.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cloudsave_sync::{
    BackendKind, CloudSync, FixedRemote, OAuthRemote, RemoteBackend, Result, SyncError,
    SyncOptions,
};
use parking_lot::Mutex;

#[derive(Debug, Clone)]
pub(crate) struct SyncCall {
    pub local: PathBuf,
    pub remote_path: String,
    pub options: SyncOptions,
}

/// Remote files live in a map keyed by remote path. Tracks how many
/// `perform_sync` calls overlap.
#[derive(Default)]
pub(crate) struct FakeCloud {
    pub remote_files: Mutex<HashMap<String, Vec<u8>>>,
    pub calls: Mutex<Vec<SyncCall>>,
    pub fail_with: Mutex<Option<String>>,
    pub delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeCloud {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<SyncCall> {
        self.calls.lock().clone()
    }

    pub fn remote_file(&self, path: &str) -> Option<Vec<u8>> {
        self.remote_files.lock().get(path).cloned()
    }
}

fn included(name: &str, pattern: Option<&str>) -> bool {
    match pattern {
        None => true,
        Some(p) => match p.strip_prefix('*') {
            Some(suffix) => name.ends_with(suffix),
            None => name == p,
        },
    }
}

#[async_trait]
impl CloudSync for FakeCloud {
    async fn perform_sync(
        &self,
        _remote: &dyn RemoteBackend,
        options: &SyncOptions,
        local: &Path,
        remote_path: &str,
    ) -> Result<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.calls.lock().push(SyncCall {
            local: local.to_path_buf(),
            remote_path: remote_path.to_string(),
            options: options.clone(),
        });

        let outcome = match self.fail_with.lock().clone() {
            Some(detail) => Err(SyncError::Transport { detail }),
            None => {
                let mut copied = 0;
                if let Ok(entries) = std::fs::read_dir(local) {
                    for entry in entries.flatten() {
                        let name = entry.file_name().to_string_lossy().into_owned();
                        if !included(&name, options.include.as_deref()) {
                            continue;
                        }
                        if let Ok(bytes) = std::fs::read(entry.path()) {
                            self.remote_files
                                .lock()
                                .insert(format!("{remote_path}{name}"), bytes);
                            copied += 1;
                        }
                    }
                }
                Ok(format!("Transferred: {copied} file(s)"))
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    async fn pull_file(
        &self,
        _remote: &dyn RemoteBackend,
        remote_file: &str,
        local_file: &Path,
    ) -> Result<String> {
        let bytes = self
            .remote_file(remote_file)
            .ok_or_else(|| SyncError::Transport {
                detail: format!("object not found: {remote_file}"),
            })?;
        if let Some(parent) = local_file.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SyncError::LocalIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(local_file, bytes).map_err(|source| SyncError::LocalIo {
            path: local_file.to_path_buf(),
            source,
        })?;
        Ok(String::new())
    }
}

pub(crate) fn dropbox() -> Arc<FixedRemote> {
    let remote: Arc<dyn RemoteBackend> = Arc::new(
        OAuthRemote::for_kind(BackendKind::Dropbox).expect("oauth backend"),
    );
    Arc::new(FixedRemote(Some(remote)))
}
