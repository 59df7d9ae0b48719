//! Persisted user preferences.

use super::PreferenceStore;
use crate::error::{BreathlineError, Result};
use crate::narration::VoiceProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Last choices, remembered across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub last_technique: Option<String>,
    pub voice_profile: Option<VoiceProfile>,
}

/// [`PreferenceStore`] backed by a TOML file.
pub struct FilePreferences {
    path: PathBuf,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `paths::preferences_file()`.
    pub fn open_default() -> Self {
        Self::new(crate::paths::preferences_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreferences {
    fn load(&self) -> Preferences {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Preferences::default(),
            Err(e) => {
                warn!("cannot read preferences {}: {e}", self.path.display());
                return Preferences::default();
            }
        };
        toml::from_str(&content).unwrap_or_else(|e| {
            warn!("ignoring invalid preferences {}: {e}", self.path.display());
            Preferences::default()
        })
    }

    fn save(&self, preferences: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(preferences)
            .map_err(|e| BreathlineError::Storage(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::narration::VoiceGender;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferences::new(dir.path().join("preferences.toml"));
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferences::new(dir.path().join("cfg").join("preferences.toml"));
        let prefs = Preferences {
            last_technique: Some("coherent".into()),
            voice_profile: Some(VoiceProfile::new(VoiceGender::Female, "en-US")),
        };
        store.save(&prefs).unwrap();
        assert_eq!(store.load(), prefs);
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("voice_profile = \"en-US-female\""));
    }

    #[test]
    fn invalid_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        std::fs::write(&path, "last_technique = [").unwrap();
        assert_eq!(FilePreferences::new(path).load(), Preferences::default());
    }
}
