//! Process-wide registry of remote identities, one per backend kind.

use std::collections::HashMap;
use std::sync::Arc;

use cloudsave_state::{BackendKind, CloudPrefs, PrefsStore};
use parking_lot::RwLock;

use super::{FtpRemote, NextCloudRemote, OAuthRemote, RemoteBackend};
use crate::error::{Result, SyncError};

/// Holds exactly one identity per [`BackendKind`].
///
/// Built once at startup and shared by reference. Credentialed backends
/// start unconfigured and are replaced through [`RemoteRegistry::register`]
/// once the user supplies connection details.
pub struct RemoteRegistry {
    remotes: RwLock<HashMap<BackendKind, Arc<dyn RemoteBackend>>>,
}

impl Default for RemoteRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RemoteRegistry {
    pub fn with_defaults() -> Self {
        let mut remotes: HashMap<BackendKind, Arc<dyn RemoteBackend>> = HashMap::new();
        for kind in BackendKind::ALL {
            let remote: Arc<dyn RemoteBackend> = match kind {
                BackendKind::Ftp => Arc::new(FtpRemote::unconfigured()),
                BackendKind::NextCloud => Arc::new(NextCloudRemote::unconfigured()),
                _ => match OAuthRemote::for_kind(kind) {
                    Some(remote) => Arc::new(remote),
                    None => continue,
                },
            };
            remotes.insert(kind, remote);
        }
        Self {
            remotes: RwLock::new(remotes),
        }
    }

    /// Replaces the identity for the remote's kind.
    pub fn register(&self, remote: Arc<dyn RemoteBackend>) {
        tracing::debug!(
            target: "cloudsave::remotes",
            kind = %remote.kind(),
            name = remote.name(),
            "Registering remote identity"
        );
        self.remotes.write().insert(remote.kind(), remote);
    }

    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn RemoteBackend>> {
        self.remotes.read().get(&kind).cloned()
    }

    /// Every registered identity, in backend-code order.
    pub fn all(&self) -> Vec<Arc<dyn RemoteBackend>> {
        let remotes = self.remotes.read();
        BackendKind::ALL
            .iter()
            .filter_map(|kind| remotes.get(kind).cloned())
            .collect()
    }

    /// Identity chosen by the preferences.
    pub fn selected(&self, prefs: &CloudPrefs) -> Result<Arc<dyn RemoteBackend>> {
        self.get(prefs.cloud).ok_or(SyncError::NotConfigured)
    }
}

/// Resolves the identity a settings sync should use at the moment it runs.
pub trait RemoteSelector: Send + Sync {
    fn current(&self) -> Result<Arc<dyn RemoteBackend>>;
}

/// Reads the preferences file on every call, so a backend switch takes
/// effect for the next request.
pub struct PrefsSelector {
    registry: Arc<RemoteRegistry>,
    prefs: PrefsStore,
}

impl PrefsSelector {
    pub fn new(registry: Arc<RemoteRegistry>, prefs: PrefsStore) -> Self {
        Self { registry, prefs }
    }
}

impl RemoteSelector for PrefsSelector {
    fn current(&self) -> Result<Arc<dyn RemoteBackend>> {
        let prefs = self.prefs.load().map_err(|err| {
            tracing::warn!(
                target: "cloudsave::remotes",
                error = %err,
                "No cloud preferences; remote not configured"
            );
            SyncError::NotConfigured
        })?;
        self.registry.selected(&prefs)
    }
}

/// Always the same identity, or none.
pub struct FixedRemote(pub Option<Arc<dyn RemoteBackend>>);

impl RemoteSelector for FixedRemote {
    fn current(&self) -> Result<Arc<dyn RemoteBackend>> {
        self.0.clone().ok_or(SyncError::NotConfigured)
    }
}
