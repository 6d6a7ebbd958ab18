//! Per-invocation options for directional and bidirectional transfers.

use serde::{Deserialize, Serialize};

const JSON_LOG_FLAG: &str = "--use-json-log";

/// Options for one sync operation.
///
/// ```
/// use cloudsave_sync::SyncOptions;
///
/// let opts = SyncOptions { dry_run: true, ..Default::default() };
/// let pull = opts.for_pull();
/// assert!(pull.dry_run && pull.update_only && pull.checksum);
/// assert!(!opts.update_only);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Ask the tool for very verbose output.
    #[serde(default)]
    pub verbose: bool,
    /// Report what would change without changing anything.
    #[serde(default)]
    pub dry_run: bool,
    /// Only transfer files matching this glob.
    #[serde(default)]
    pub include: Option<String>,
    /// Skip files that are newer on the destination.
    #[serde(default)]
    pub update_only: bool,
    /// Compare content hashes instead of size and modification time.
    #[serde(default)]
    pub checksum: bool,
    /// Passed through verbatim, split on whitespace.
    #[serde(default)]
    pub custom_flags: Option<String>,
}

impl SyncOptions {
    pub fn defaults() -> Self {
        Self::default()
    }

    /// Defaults with `CLOUDSAVE_DRY_RUN` and `CLOUDSAVE_VERBOSE` applied.
    pub fn from_env() -> Self {
        Self {
            dry_run: cloudsave_state::env::env_dry_run(),
            verbose: cloudsave_state::env::env_verbose(),
            ..Self::default()
        }
    }

    /// Options for the shared settings directory: JSON files only.
    pub fn for_settings() -> Self {
        Self {
            include: Some("*.json".to_string()),
            ..Self::default()
        }
    }

    /// Derived copy for the pull phase of merge-then-mirror: update-only and
    /// checksum comparison are forced on, everything else is kept.
    pub fn for_pull(&self) -> Self {
        Self {
            update_only: true,
            checksum: true,
            ..self.clone()
        }
    }

    pub fn with_include(mut self, pattern: impl Into<String>) -> Self {
        self.include = Some(pattern.into());
        self
    }

    pub fn with_custom_flags(mut self, flags: impl Into<String>) -> Self {
        self.custom_flags = Some(flags.into());
        self
    }

    /// Flags for `copy` and `sync`.
    pub fn to_flags(&self) -> Vec<String> {
        self.render(true)
    }

    /// Flags for `bisync`, which takes neither `-u` nor `--checksum`.
    pub fn to_bisync_flags(&self) -> Vec<String> {
        self.render(false)
    }

    fn render(&self, directional: bool) -> Vec<String> {
        let mut flags = vec![JSON_LOG_FLAG.to_string()];
        if self.verbose {
            flags.push("-vv".to_string());
        }
        if self.dry_run {
            flags.push("--dry-run".to_string());
        }
        if let Some(pattern) = self.include.as_deref().filter(|p| !p.is_empty()) {
            flags.push(format!("--include={pattern}"));
        }
        if directional && self.update_only {
            flags.push("-u".to_string());
        }
        if directional && self.checksum {
            flags.push("--checksum".to_string());
        }
        if let Some(custom) = self.custom_flags.as_deref() {
            flags.extend(custom.split_whitespace().map(str::to_string));
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_flags_only_request_json_log() {
        assert_eq!(SyncOptions::default().to_flags(), vec![JSON_LOG_FLAG]);
    }

    #[test]
    fn flag_order_matches_tool_expectations() {
        let opts = SyncOptions {
            verbose: true,
            dry_run: true,
            include: Some("*.sav".into()),
            update_only: true,
            checksum: true,
            custom_flags: Some("  --fast-list   --transfers 8 ".into()),
        };
        assert_eq!(
            opts.to_flags(),
            vec![
                "--use-json-log",
                "-vv",
                "--dry-run",
                "--include=*.sav",
                "-u",
                "--checksum",
                "--fast-list",
                "--transfers",
                "8"
            ]
        );
    }

    #[test]
    fn bisync_flags_drop_directional_options() {
        let opts = SyncOptions {
            update_only: true,
            checksum: true,
            include: Some("*.json".into()),
            ..Default::default()
        };
        let flags = opts.to_bisync_flags();
        assert!(!flags.contains(&"-u".to_string()));
        assert!(!flags.contains(&"--checksum".to_string()));
        assert!(flags.contains(&"--include=*.json".to_string()));
    }

    #[test]
    fn pull_variant_does_not_mutate_original() {
        let opts = SyncOptions::for_settings();
        let pull = opts.for_pull();
        assert!(pull.update_only && pull.checksum);
        assert_eq!(pull.include.as_deref(), Some("*.json"));
        assert!(!opts.update_only && !opts.checksum);
    }

    #[test]
    fn empty_include_is_ignored() {
        let opts = SyncOptions::default().with_include("");
        assert_eq!(opts.to_flags().len(), 1);
    }

    #[test]
    fn from_env_reads_dry_run_and_verbose() {
        let _g = cloudsave_test_utils::env_guard();
        let _d = cloudsave_test_utils::set_env_var("CLOUDSAVE_DRY_RUN", Some("true"));
        let _v = cloudsave_test_utils::set_env_var("CLOUDSAVE_VERBOSE", None);
        let opts = SyncOptions::from_env();
        assert!(opts.dry_run);
        assert!(!opts.verbose);
    }

    proptest! {
        #[test]
        fn custom_flags_never_render_empty_arguments(custom in "[ a-z-]{0,40}") {
            let opts = SyncOptions::default().with_custom_flags(custom.clone());
            let flags = opts.to_flags();
            prop_assert!(flags.iter().all(|f| !f.is_empty() && !f.contains(' ')));
            prop_assert_eq!(flags.len(), 1 + custom.split_whitespace().count());
        }
    }
}
