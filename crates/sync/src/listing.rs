//! Structured directory listings produced by the tool's `lsjson`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// One entry of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CloudFile {
    pub path: String,
    pub name: String,
    /// Byte size; `-1` for directories on most backends.
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub mime_type: String,
    /// RFC 3339 timestamp as reported by the backend.
    #[serde(default)]
    pub mod_time: String,
    #[serde(default)]
    pub is_dir: bool,
}

/// Parses `lsjson` output. Blank output is an empty listing.
pub fn parse_listing(stdout: &str) -> Result<Vec<CloudFile>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(stdout).map_err(SyncError::MalformedOutput)
}
