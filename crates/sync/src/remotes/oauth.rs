//! Backends whose credentials come from the tool's interactive OAuth flow.

use super::traits::{config_name, create_args, RemoteBackend};
use cloudsave_state::BackendKind;

/// Google Drive, OneDrive, Dropbox or Box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthRemote {
    kind: BackendKind,
    name: String,
    provider: &'static str,
    params: &'static [&'static str],
}

impl OAuthRemote {
    /// Returns `None` for kinds that need explicit credentials.
    pub fn for_kind(kind: BackendKind) -> Option<Self> {
        let (provider, params): (&'static str, &'static [&'static str]) = match kind {
            // drive.file keeps access limited to files this app created
            BackendKind::GoogleDrive => ("drive", &["scope=drive.file"]),
            BackendKind::OneDrive => (
                "onedrive",
                &[
                    "drive_type=personal",
                    "access_scopes=Files.ReadWrite,offline_access",
                ],
            ),
            BackendKind::Dropbox => ("dropbox", &[]),
            BackendKind::Box => ("box", &[]),
            BackendKind::NextCloud | BackendKind::Ftp => return None,
        };
        Some(Self {
            kind,
            name: config_name(kind),
            provider,
            params,
        })
    }
}

impl RemoteBackend for OAuthRemote {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn provisioning_args(&self) -> Vec<String> {
        let params: Vec<String> = self.params.iter().map(|s| s.to_string()).collect();
        create_args(&self.name, self.provider, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_drive_recipe() {
        let remote = OAuthRemote::for_kind(BackendKind::GoogleDrive).unwrap();
        assert_eq!(remote.name(), "opencloudsave-googledrive");
        assert_eq!(
            remote.provisioning_args(),
            vec![
                "config",
                "create",
                "opencloudsave-googledrive",
                "drive",
                "scope=drive.file"
            ]
        );
    }

    #[test]
    fn onedrive_recipe_sets_scopes() {
        let remote = OAuthRemote::for_kind(BackendKind::OneDrive).unwrap();
        let args = remote.provisioning_args();
        assert_eq!(args[3], "onedrive");
        assert!(args.contains(&"drive_type=personal".to_string()));
        assert!(args.contains(&"access_scopes=Files.ReadWrite,offline_access".to_string()));
    }

    #[test]
    fn dropbox_and_box_have_no_parameters() {
        for kind in [BackendKind::Dropbox, BackendKind::Box] {
            let args = OAuthRemote::for_kind(kind).unwrap().provisioning_args();
            assert_eq!(args.len(), 4);
        }
    }

    #[test]
    fn credentialed_kinds_are_rejected() {
        assert!(OAuthRemote::for_kind(BackendKind::Ftp).is_none());
        assert!(OAuthRemote::for_kind(BackendKind::NextCloud).is_none());
    }

    #[test]
    fn remote_path_joins_name() {
        let remote = OAuthRemote::for_kind(BackendKind::GoogleDrive).unwrap();
        assert_eq!(
            remote.remote_path("opencloudsaves/game/"),
            "opencloudsave-googledrive:opencloudsaves/game/"
        );
    }
}
