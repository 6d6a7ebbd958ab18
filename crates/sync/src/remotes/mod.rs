//! Remote identities: one configured backend each, named in the tool's
//! own configuration store.

mod ftp;
mod nextcloud;
mod oauth;
pub mod registry;
pub mod traits;

pub use cloudsave_state::BackendKind;
pub use ftp::FtpRemote;
pub use nextcloud::NextCloudRemote;
pub use oauth::OAuthRemote;
pub use registry::{FixedRemote, PrefsSelector, RemoteRegistry, RemoteSelector};
pub use traits::{config_name, RemoteBackend};
