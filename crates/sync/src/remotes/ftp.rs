//! FTP backend with explicit connection details.

use serde::{Deserialize, Serialize};

use super::traits::{config_name, create_args, push_param, RemoteBackend};
use cloudsave_state::BackendKind;

/// FTP server credentials.
///
/// `password` should already be obscured by the tool (see
/// `CloudManager::obscure_secret`); it is passed through as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpRemote {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub password: String,
    #[serde(skip, default = "ftp_name")]
    name: String,
}

fn ftp_name() -> String {
    config_name(BackendKind::Ftp)
}

impl FtpRemote {
    pub fn new(
        host: impl Into<String>,
        user_name: impl Into<String>,
        port: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user_name: user_name.into(),
            port: port.into(),
            password: password.into(),
            name: ftp_name(),
        }
    }

    /// Identity with no connection details, enough to delete the entry.
    pub fn unconfigured() -> Self {
        Self::new("", "", "", "")
    }
}

impl RemoteBackend for FtpRemote {
    fn kind(&self) -> BackendKind {
        BackendKind::Ftp
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn provisioning_args(&self) -> Vec<String> {
        let mut params = Vec::new();
        push_param(&mut params, "host", &self.host);
        push_param(&mut params, "user", &self.user_name);
        push_param(&mut params, "port", &self.port);
        push_param(&mut params, "pass", &self.password);
        create_args(&self.name, "ftp", &params)
    }
}
