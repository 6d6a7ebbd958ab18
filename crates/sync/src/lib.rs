//! Remote identities and the sync policy engine for cloudsave.
//!
//! Keeps a local directory and a remote directory consistent by running
//! an external, directory-oriented sync tool (`rclone`) as a subprocess.
//! Two strategies are available:
//!
//! - **Merge-then-mirror** (default): pull content-different remote files
//!   that are newer, then mirror local onto remote.
//! - **Bidirectional**: the tool's own two-way reconciliation, with one
//!   automatic re-baseline when the tool reports its baseline is missing.
//!
//! # Examples
//!
//! ```no_run
//! use cloudsave_sync::{
//!     BackendKind, CloudManager, CloudSync, RemoteRegistry, SyncOptions, SyncStrategy,
//!     ToolConfig,
//! };
//! use std::path::Path;
//!
//! # async fn demo() -> cloudsave_sync::Result<()> {
//! let registry = RemoteRegistry::with_defaults();
//! let remote = registry.get(BackendKind::Dropbox).expect("every kind is registered");
//! let manager = CloudManager::new(ToolConfig::from_env(), SyncStrategy::MergeThenMirror);
//!
//! manager.ensure_provisioned(remote.as_ref()).await?;
//! let report = manager
//!     .perform_sync(
//!         remote.as_ref(),
//!         &SyncOptions::defaults(),
//!         Path::new("/home/me/.local/share/game/saves"),
//!         "opencloudsaves/game",
//!     )
//!     .await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod listing;
pub mod options;
pub mod progress;
pub mod remotes;
pub mod tool;

pub use cloudsave_state::SyncStrategy;
pub use engine::{
    CloudManager, CloudSync, REBASELINE_EXIT_CODE, SETTINGS_AREA, TOPLEVEL_CLOUD_FOLDER,
};
pub use error::{Result, SyncError};
pub use listing::CloudFile;
pub use options::SyncOptions;
pub use progress::{ProgressMessage, ProgressSink};
pub use remotes::{
    config_name, BackendKind, FixedRemote, FtpRemote, NextCloudRemote, OAuthRemote,
    PrefsSelector, RemoteBackend, RemoteRegistry, RemoteSelector,
};
pub use tool::{ToolConfig, ToolOutput};
