//! Persisted cloud preferences (`opencloud_perfs.json`).

use crate::env::prefs_path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Remote backend families the external tool can be provisioned for.
///
/// Persisted as the integer code the preferences file has always used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BackendKind {
    GoogleDrive,
    OneDrive,
    Dropbox,
    Box,
    NextCloud,
    Ftp,
}

impl BackendKind {
    pub const ALL: [BackendKind; 6] = [
        BackendKind::GoogleDrive,
        BackendKind::OneDrive,
        BackendKind::Dropbox,
        BackendKind::Box,
        BackendKind::NextCloud,
        BackendKind::Ftp,
    ];

    /// Stable integer code stored in the preferences file.
    pub fn code(self) -> u8 {
        match self {
            BackendKind::GoogleDrive => 0,
            BackendKind::OneDrive => 1,
            BackendKind::Dropbox => 2,
            BackendKind::Box => 3,
            BackendKind::NextCloud => 4,
            BackendKind::Ftp => 5,
        }
    }
}

impl TryFrom<u8> for BackendKind {
    type Error = String;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        BackendKind::ALL
            .into_iter()
            .find(|k| k.code() == code)
            .ok_or_else(|| format!("unknown cloud backend code {code}"))
    }
}

impl From<BackendKind> for u8 {
    fn from(kind: BackendKind) -> Self {
        kind.code()
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BackendKind::GoogleDrive => "Google Drive",
            BackendKind::OneDrive => "OneDrive",
            BackendKind::Dropbox => "Dropbox",
            BackendKind::Box => "Box",
            BackendKind::NextCloud => "Nextcloud",
            BackendKind::Ftp => "FTP",
        };
        f.write_str(label)
    }
}

/// Consistency strategy used by the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStrategy {
    /// Pull newer remote files, then mirror local onto remote.
    #[default]
    MergeThenMirror,
    /// Delegate to the tool's two-way reconciliation.
    Bidirectional,
}

/// Contents of the preferences file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudPrefs {
    pub cloud: BackendKind,
    #[serde(default)]
    pub perform_dry_run: bool,
    #[serde(default)]
    pub use_bi_sync: bool,
    #[serde(default)]
    pub should_not_prompt_for_large_syncs: bool,
}

impl Default for CloudPrefs {
    fn default() -> Self {
        Self {
            cloud: BackendKind::GoogleDrive,
            perform_dry_run: true,
            use_bi_sync: false,
            should_not_prompt_for_large_syncs: false,
        }
    }
}

impl CloudPrefs {
    pub fn strategy(&self) -> SyncStrategy {
        if self.use_bi_sync {
            SyncStrategy::Bidirectional
        } else {
            SyncStrategy::MergeThenMirror
        }
    }
}

/// Reads and writes [`CloudPrefs`] at a fixed path.
#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform location (see [`prefs_path`]).
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(prefs_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the preferences. Fails when the file is missing or malformed.
    pub fn load(&self) -> Result<CloudPrefs> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read preferences: {}", self.path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse preferences: {}", self.path.display()))
    }

    /// Loads the preferences, falling back to [`CloudPrefs::default`] on any error.
    pub fn load_or_default(&self) -> CloudPrefs {
        match self.load() {
            Ok(prefs) => prefs,
            Err(err) => {
                tracing::debug!(
                    path = %self.path.display(),
                    error = %err,
                    "Using default cloud preferences"
                );
                CloudPrefs::default()
            }
        }
    }

    /// Writes the preferences atomically, creating the parent directory.
    pub fn save(&self, prefs: &CloudPrefs) -> Result<()> {
        let data = serde_json::to_vec_pretty(prefs).context("failed to serialize preferences")?;
        write_atomic(&self.path, &data)
            .with_context(|| format!("failed to write preferences: {}", self.path.display()))
    }

    /// Changes the selected backend, keeping every other field.
    pub fn update_cloud(&self, cloud: BackendKind) -> Result<CloudPrefs> {
        let mut prefs = self.load()?;
        prefs.cloud = cloud;
        self.save(&prefs)?;
        Ok(prefs)
    }

    pub fn delete(&self) -> Result<()> {
        std::fs::remove_file(&self.path)
            .with_context(|| format!("failed to remove preferences: {}", self.path.display()))
    }
}

/// Writes `data` to a temp file beside `path`, then renames it into place.
///
/// Missing parent directories are created.
pub fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_codes_are_stable() {
        let codes: Vec<u8> = BackendKind::ALL.iter().map(|k| k.code()).collect();
        assert_eq!(codes, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(BackendKind::try_from(4).unwrap(), BackendKind::NextCloud);
        assert!(BackendKind::try_from(6).is_err());
    }

    #[test]
    fn parses_legacy_prefs_file() {
        let json = r#"{"cloud":5,"performDryRun":false,"useBiSync":true,"shouldNotPromptForLargeSyncs":true}"#;
        let prefs: CloudPrefs = serde_json::from_str(json).unwrap();
        assert_eq!(prefs.cloud, BackendKind::Ftp);
        assert!(!prefs.perform_dry_run);
        assert_eq!(prefs.strategy(), SyncStrategy::Bidirectional);
        assert!(prefs.should_not_prompt_for_large_syncs);
    }

    #[test]
    fn missing_flags_default_to_false() {
        let prefs: CloudPrefs = serde_json::from_str(r#"{"cloud":1}"#).unwrap();
        assert_eq!(prefs.cloud, BackendKind::OneDrive);
        assert_eq!(prefs.strategy(), SyncStrategy::MergeThenMirror);
    }

    #[test]
    fn rejects_unknown_backend_code() {
        assert!(serde_json::from_str::<CloudPrefs>(r#"{"cloud":42}"#).is_err());
    }

    #[test]
    fn default_is_google_drive_dry_run() {
        let prefs = CloudPrefs::default();
        assert_eq!(prefs.cloud, BackendKind::GoogleDrive);
        assert!(prefs.perform_dry_run);
        assert_eq!(prefs.strategy(), SyncStrategy::MergeThenMirror);
    }

    #[test]
    fn save_load_update_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefsStore::new(dir.path().join("nested/opencloud_perfs.json"));
        assert!(store.load().is_err());
        assert_eq!(store.load_or_default(), CloudPrefs::default());

        let prefs = CloudPrefs {
            cloud: BackendKind::Dropbox,
            perform_dry_run: false,
            use_bi_sync: true,
            should_not_prompt_for_large_syncs: false,
        };
        store.save(&prefs).unwrap();
        assert_eq!(store.load().unwrap(), prefs);

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"useBiSync\": true"));
        assert!(text.contains("\"cloud\": 2"));

        let updated = store.update_cloud(BackendKind::Box).unwrap();
        assert_eq!(updated.cloud, BackendKind::Box);
        assert!(updated.use_bi_sync);
        assert_eq!(store.load().unwrap().cloud, BackendKind::Box);

        store.delete().unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn malformed_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opencloud_perfs.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = PrefsStore::new(&path);
        assert!(store.load().is_err());
        assert_eq!(store.load_or_default(), CloudPrefs::default());
    }
}
