//! Nextcloud over WebDAV.

use serde::{Deserialize, Serialize};

use super::traits::{config_name, create_args, push_param, RemoteBackend};
use cloudsave_state::BackendKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextCloudRemote {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
    #[serde(default)]
    pub bearer_token: String,
    #[serde(skip, default = "nextcloud_name")]
    name: String,
}

fn nextcloud_name() -> String {
    config_name(BackendKind::NextCloud)
}

impl NextCloudRemote {
    pub fn new(url: impl Into<String>, user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: user.into(),
            pass: pass.into(),
            bearer_token: String::new(),
            name: nextcloud_name(),
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = token.into();
        self
    }

    pub fn unconfigured() -> Self {
        Self::new("", "", "")
    }
}

impl RemoteBackend for NextCloudRemote {
    fn kind(&self) -> BackendKind {
        BackendKind::NextCloud
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn provisioning_args(&self) -> Vec<String> {
        let mut params = vec!["vendor=nextcloud".to_string()];
        push_param(&mut params, "url", &self.url);
        push_param(&mut params, "user", &self.user);
        push_param(&mut params, "pass", &self.pass);
        push_param(&mut params, "bearer_token", &self.bearer_token);
        create_args(&self.name, "webdav", &params)
    }
}
