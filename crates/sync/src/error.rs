//! Error type shared by the sync engine and the components built on it.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the sync engine, the settings serializer and the
/// durable record store.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The backend's provisioning command failed; carries its stderr verbatim.
    #[error("failed to provision remote '{backend}': {stderr}")]
    Provisioning { backend: String, stderr: String },

    /// The tool ran but exited with an unrecognized non-zero status.
    #[error("{detail}")]
    Transport { detail: String },

    /// The tool could not be started at all.
    #[error("failed to spawn sync tool '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },

    /// The tool did not finish within the configured timeout and was killed.
    #[error("sync tool timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Bidirectional reconciliation reported a baseline mismatch.
    ///
    /// Recovered inside the engine with one `--resync` retry; never returned
    /// to callers.
    #[error("bisync requires a resync: {stderr}")]
    RebaselineRequired { stderr: String },

    /// No remote backend is selected.
    #[error("no cloud storage set")]
    NotConfigured,

    #[error("local I/O failed for {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A stored record could not be encoded or decoded.
    #[error("failed to (de)serialize record at {}: {source}", path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The tool's stdout was not the structured listing it should be.
    #[error("unexpected sync tool output: {0}")]
    MalformedOutput(#[source] serde_json::Error),

    /// A serializer request observed a cancelled scope before it started.
    #[error("sync request cancelled")]
    Cancelled,

    /// The worker owning the request was stopped before answering.
    #[error("sync worker stopped")]
    Stopped,
}

impl SyncError {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SyncError::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure came from talking to the external tool.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SyncError::Transport { .. }
                | SyncError::Spawn { .. }
                | SyncError::Timeout(_)
                | SyncError::RebaselineRequired { .. }
                | SyncError::MalformedOutput(_)
        )
    }

    /// Whether the failure came from reading or writing local files.
    pub fn is_local_io(&self) -> bool {
        matches!(
            self,
            SyncError::LocalIo { .. } | SyncError::Serialization { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
