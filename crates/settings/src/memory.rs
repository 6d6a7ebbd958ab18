//! In-memory datastore for callers that run without a remote.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use cloudsave_sync::{Result, SyncError};
use parking_lot::Mutex;

use crate::datastore::Datastore;

/// Holds the last stored record. Never fails on `store` or `flush`.
pub struct MemDatastore<T> {
    inner: Arc<Mutex<Option<T>>>,
}

impl<T> Default for MemDatastore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MemDatastore<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_record(record: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(record))),
        }
    }
}

#[async_trait]
impl<T> Datastore<T> for MemDatastore<T>
where
    T: Clone + Send + 'static,
{
    fn store(&self, record: T) {
        *self.inner.lock() = Some(record);
    }

    async fn fetch(&self) -> Result<T> {
        self.inner.lock().clone().ok_or_else(|| SyncError::LocalIo {
            path: PathBuf::from("<memory>"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no record stored"),
        })
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) {}
}
