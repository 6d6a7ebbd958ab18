//! Settings synchronization for cloudsave.
//!
//! Two components sit on top of the sync engine:
//!
//! - [`SettingsSyncer`]: serializes syncs of the shared settings directory so
//!   no two ever overlap, with blocking and fire-and-forget submission.
//! - [`CloudDatastore`]: a typed record kept in a local JSON file and mirrored
//!   to the remote settings area, with deferred error reporting via `flush`.

pub mod datastore;
pub mod memory;
pub mod serializer;

#[cfg(test)]
mod testing;

pub use datastore::{prefs_datastore, CloudDatastore, Datastore};
pub use memory::MemDatastore;
pub use serializer::{ResultSink, SettingsSyncer};
pub use tokio_util::sync::CancellationToken;
