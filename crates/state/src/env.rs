use anyhow::Result;
use std::path::PathBuf;

/// Directory name used under the platform config and cache roots.
pub const APP_NAME: &str = "OpenCloudSave";

/// File holding the selected backend and strategy preference.
pub const PREFS_FILENAME: &str = "opencloud_perfs.json";

/// Settings file synchronized through the settings serializer.
pub const USER_OVERRIDE_FILENAME: &str = "user_overrides.json";

const DEFAULT_LOG_FILENAME: &str = "opencloudsave.log";

/// Returns the configuration directory, honoring `CLOUDSAVE_CONFIG_DIR`.
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(custom) = std::env::var("CLOUDSAVE_CONFIG_DIR") {
        return Ok(PathBuf::from(custom));
    }
    dirs::config_dir()
        .map(|d| d.join(APP_NAME))
        .ok_or_else(|| anyhow::anyhow!("user config directory not found"))
}

/// Returns the cache directory used for the log file.
pub fn cache_dir() -> Result<PathBuf> {
    if let Ok(custom) = std::env::var("CLOUDSAVE_CACHE_DIR") {
        return Ok(PathBuf::from(custom));
    }
    dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("user cache directory not found"))
}

/// Path to the persisted cloud preferences.
pub fn prefs_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(PREFS_FILENAME))
}

/// Path to the settings file synchronized when a caller passes no explicit path.
pub fn default_user_override_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(USER_OVERRIDE_FILENAME))
}

/// Default log file location (`<cache dir>/opencloudsave.log`).
pub fn default_log_path() -> Result<PathBuf> {
    Ok(cache_dir()?.join(DEFAULT_LOG_FILENAME))
}

/// Checks if `CLOUDSAVE_DRY_RUN` forces dry-run operations.
pub fn env_dry_run() -> bool {
    std::env::var("CLOUDSAVE_DRY_RUN")
        .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Checks if `CLOUDSAVE_VERBOSE` requests verbose tool output.
pub fn env_verbose() -> bool {
    std::env::var("CLOUDSAVE_VERBOSE")
        .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
