//! Pre-recorded cue fallback.
//!
//! Cues live under `<root>/<locale>-<gender>/<cue>.mp3` (or `.wav`) and are
//! decoded once, then cached. Misses are cached too so a missing file is
//! probed only once per process.

use super::voice::{VoiceGender, VoiceProfile};
use crate::audio::{AudioOutput, ClipSource, decode_to_mono_f32, resample_linear};
use crate::error::{BreathlineError, Result};
use crate::technique::CueId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

const EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// A decoded cue ready to play.
#[derive(Debug, Clone)]
pub struct CueClip {
    pub cue: CueId,
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl CueClip {
    pub fn new(cue: CueId, samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            cue,
            samples: Arc::from(samples),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &Arc<[f32]> {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

type CueKey = (String, VoiceGender, CueId);

/// On-disk cue lookup with a per-process cache.
pub struct CueLibrary {
    root: PathBuf,
    cache: Mutex<HashMap<CueKey, Option<CueClip>>>,
}

impl CueLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Candidate files for a cue, in lookup order.
    pub fn candidate_paths(&self, profile: &VoiceProfile, cue: CueId) -> Vec<PathBuf> {
        let dir = self.root.join(profile.cue_dir_name());
        EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{ext}", cue.as_str())))
            .collect()
    }

    /// Load (or fetch from cache) the clip for `cue` in `profile`'s voice.
    pub fn load(&self, profile: &VoiceProfile, cue: CueId) -> Option<CueClip> {
        let key = (profile.locale.clone(), profile.gender, cue);
        if let Some(hit) = self
            .cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(&key).cloned())
        {
            return hit;
        }

        let clip = self.decode(profile, cue);
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, clip.clone());
        }
        clip
    }

    fn decode(&self, profile: &VoiceProfile, cue: CueId) -> Option<CueClip> {
        let path = self
            .candidate_paths(profile, cue)
            .into_iter()
            .find(|p| p.is_file())?;
        match decode_to_mono_f32(&path) {
            Ok((samples, rate)) if !samples.is_empty() => {
                debug!("loaded cue {}", path.display());
                Some(CueClip::new(cue, samples, rate))
            }
            Ok(_) => {
                warn!("cue {} decoded to silence", path.display());
                None
            }
            Err(e) => {
                warn!("cannot decode cue {}: {e}", path.display());
                None
            }
        }
    }
}

/// Plays pre-recorded cues, at most one at a time.
pub trait CuePlayer: Send {
    /// Stop anything playing, then start `clip` from the beginning.
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses playback.
    fn play(&mut self, clip: &CueClip) -> Result<()>;

    /// Stop and rewind. Safe when idle.
    fn stop(&mut self);
}

/// [`CuePlayer`] rendering through an [`AudioOutput`].
pub struct OutputCuePlayer {
    output: Box<dyn AudioOutput>,
    gain: f32,
}

impl OutputCuePlayer {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self { output, gain: 1.0 }
    }

    #[must_use]
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }
}

impl CuePlayer for OutputCuePlayer {
    fn play(&mut self, clip: &CueClip) -> Result<()> {
        self.output.detach();
        let rate = self.output.sample_rate();
        let samples: Arc<[f32]> = if clip.sample_rate() == rate {
            Arc::clone(clip.samples())
        } else {
            Arc::from(resample_linear(clip.samples(), clip.sample_rate(), rate))
        };
        if let Err(e) = self.output.resume() {
            debug!("cue output suspended: {e}");
        }
        self.output
            .attach(Box::new(ClipSource::new(samples).with_gain(self.gain)))
            .map_err(|e| {
                BreathlineError::Cue(format!("cannot play cue {}: {e}", clip.cue.as_str()))
            })
    }

    fn stop(&mut self) {
        self.output.detach();
    }
}
