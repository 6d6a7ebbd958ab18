//! Process-wide state for cloudsave.
//!
//! This crate provides utilities for:
//! - Locating the configuration, cache and settings paths.
//! - Reading and writing the persisted cloud preferences file.
//! - Layering the optional `config.toml` beneath environment variables.
//! - Installing the `tracing` subscriber.

pub mod config;
pub mod env;
pub mod logging;
pub mod prefs;

pub use env::{
    cache_dir, config_dir, default_user_override_path, prefs_path, APP_NAME,
    PREFS_FILENAME, USER_OVERRIDE_FILENAME,
};
pub use prefs::{BackendKind, CloudPrefs, PrefsStore, SyncStrategy};
