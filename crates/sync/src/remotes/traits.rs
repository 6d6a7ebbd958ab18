//! Trait definition for remote backends.

use cloudsave_state::BackendKind;

/// Prefix shared by every configuration entry this application creates.
const NAME_PREFIX: &str = "opencloudsave-";

/// Configuration entry name for a backend family.
///
/// Stable for the lifetime of the installation: the tool's configuration
/// store is keyed by it.
pub fn config_name(kind: BackendKind) -> String {
    let suffix = match kind {
        BackendKind::GoogleDrive => "googledrive",
        BackendKind::OneDrive => "onedrive",
        BackendKind::Dropbox => "dropbox",
        BackendKind::Box => "box",
        BackendKind::NextCloud => "nextcloud",
        BackendKind::Ftp => "ftp",
    };
    format!("{NAME_PREFIX}{suffix}")
}

/// A configured remote backend. The sync engine relies on nothing else.
pub trait RemoteBackend: Send + Sync {
    /// Backend family.
    fn kind(&self) -> BackendKind;

    /// Name of the entry in the tool's configuration store.
    fn name(&self) -> &str;

    /// Arguments that create the configuration entry, starting with `config create`.
    fn provisioning_args(&self) -> Vec<String>;

    /// `<name>:<path>` as understood by the tool.
    fn remote_path(&self, path: &str) -> String {
        format!("{}:{}", self.name(), path)
    }
}

/// Builds `config create <name> <type> [extra..]`.
pub(crate) fn create_args(name: &str, provider: &str, extra: &[String]) -> Vec<String> {
    let mut args = vec![
        "config".to_string(),
        "create".to_string(),
        name.to_string(),
        provider.to_string(),
    ];
    args.extend(extra.iter().cloned());
    args
}

/// Appends `key=value` when `value` is non-empty.
pub(crate) fn push_param(args: &mut Vec<String>, key: &str, value: &str) {
    if !value.is_empty() {
        args.push(format!("{key}={value}"));
    }
}
