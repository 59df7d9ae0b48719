//! Centralized filesystem paths for breathline.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! # Directory Layout
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/breathline/` | `~/.local/share/breathline/` |
//! | Config | `~/Library/Application Support/breathline/` | `~/.config/breathline/` |
//!
//! # Environment Overrides
//!
//! - `BREATHLINE_DATA_DIR` overrides [`data_dir`]
//! - `BREATHLINE_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Holds the session log, pre-recorded cues and log files.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("BREATHLINE_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("breathline"))
        .unwrap_or_else(|| PathBuf::from("/tmp/breathline-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("BREATHLINE_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("breathline"))
        .unwrap_or_else(|| PathBuf::from("/tmp/breathline-config"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Pre-recorded narration cues (`data_dir()/cues/`).
///
/// Laid out as `<locale>-<gender>/<cue>.mp3`, e.g. `en-GB-female/inhale.mp3`.
#[must_use]
pub fn cues_dir() -> PathBuf {
    data_dir().join("cues")
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Persisted preferences (`config_dir()/preferences.toml`).
#[must_use]
pub fn preferences_file() -> PathBuf {
    config_dir().join("preferences.toml")
}

/// Completed-session history (`data_dir()/sessions.json`).
#[must_use]
pub fn session_log_file() -> PathBuf {
    data_dir().join("sessions.json")
}
