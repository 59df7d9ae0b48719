//! Configuration types for the breathing session engine.

use crate::narration::VoiceProfile;
use crate::synth::AmbienceProfile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BreathlineConfig {
    /// Audio output settings.
    pub audio: AudioConfig,
    /// Ambient soundscape defaults.
    pub ambience: AmbienceConfig,
    /// Narration channel settings.
    pub narration: NarrationConfig,
    /// Session defaults.
    pub session: SessionSettings,
}

/// Audio output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device name (None = system default).
    pub output_device: Option<String>,
}

/// Ambient synthesizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbienceConfig {
    /// Profile used when a session does not choose one.
    pub profile: AmbienceProfile,
    /// Master volume in `[0, 1]`.
    pub volume: f32,
    /// Window after a `play` during which further `play` calls are ignored.
    pub transition_lock_ms: u64,
    /// Length of the looped noise buffer.
    pub noise_buffer_secs: f32,
}

impl Default for AmbienceConfig {
    fn default() -> Self {
        Self {
            profile: AmbienceProfile::Cosmic,
            volume: 0.2,
            transition_lock_ms: 100,
            noise_buffer_secs: 2.0,
        }
    }
}

/// Narration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    /// Whether phase changes are narrated at all.
    pub enabled: bool,
    /// Default voice, e.g. `en-GB-male`.
    pub voice: VoiceProfile,
    /// How long to wait for lazily discovered host voices.
    pub voices_ready_timeout_ms: u64,
    /// Speaking rate multiplier.
    pub rate: f32,
    /// Root of the pre-recorded cue tree (None = `paths::cues_dir()`).
    pub cue_dir: Option<PathBuf>,
    /// Cue playback gain in `[0, 1]`.
    pub cue_volume: f32,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            voice: VoiceProfile::default(),
            voices_ready_timeout_ms: 500,
            rate: crate::narration::voice::DEFAULT_RATE,
            cue_dir: None,
            cue_volume: 1.0,
        }
    }
}

impl NarrationConfig {
    /// Effective cue root.
    pub fn cue_root(&self) -> PathBuf {
        self.cue_dir.clone().unwrap_or_else(crate::paths::cues_dir)
    }
}

/// Session defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Technique id used when none is chosen. An unknown id resolves to the
    /// first catalog entry instead.
    pub technique: String,
    /// Session length; also the fallback for invalid durations.
    pub duration_secs: f64,
    /// Tick period of the session runner.
    pub tick_interval_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            technique: "4-7-8".to_owned(),
            duration_secs: 60.0,
            tick_interval_ms: 50,
        }
    }
}

impl BreathlineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::BreathlineError::Config(e.to_string()))
    }

    /// Load from `path` if it exists, otherwise defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &std::path::Path) -> crate::error::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::BreathlineError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        crate::paths::config_file()
    }
}
