//! Procedural ambient audio synthesizer.
//!
//! [`AmbientSynth`] owns one [`AudioOutput`] and at most one live
//! [`SignalGraph`]. Every `play` tears down the previous graph before the
//! new one is attached, and a short transition lock absorbs rapid
//! re-entrant toggles.

pub mod graph;
pub mod noise;
pub mod oscillator;
pub mod profile;

pub use graph::{MasterGain, SignalGraph};
pub use noise::NoiseColor;
pub use oscillator::Waveform;
pub use profile::{AmbienceProfile, AmbienceSetting, Recipe, clamp_volume};

use crate::audio::AudioOutput;
use crate::config::AmbienceConfig;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of an [`AmbientSynth::play`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// A new graph was built and attached.
    Started,
    /// The requested profile was already playing.
    AlreadyPlaying,
    /// Ignored because a transition is still settling.
    Suppressed,
    /// `none` was requested; everything is stopped.
    Stopped,
    /// The host output refused the graph. The synth stays silent.
    Unavailable,
}

pub struct AmbientSynth {
    output: Box<dyn AudioOutput>,
    master: MasterGain,
    active: Option<AmbienceProfile>,
    lock_until: Option<Instant>,
    transition_lock: Duration,
    noise_buffer_secs: f32,
    rng: StdRng,
}

impl AmbientSynth {
    pub fn new(output: Box<dyn AudioOutput>, config: &AmbienceConfig) -> Self {
        Self {
            output,
            master: MasterGain::new(clamp_volume(config.volume)),
            active: None,
            lock_until: None,
            transition_lock: Duration::from_millis(config.transition_lock_ms),
            noise_buffer_secs: config.noise_buffer_secs,
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a fixed noise seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[must_use]
    pub fn with_transition_lock(mut self, lock: Duration) -> Self {
        self.transition_lock = lock;
        self
    }

    /// Start `profile`, replacing whatever is playing.
    ///
    /// Never fails: a suspended or missing output leaves the synth silent.
    pub fn play(&mut self, profile: AmbienceProfile) -> PlayOutcome {
        if profile.is_none() {
            self.stop();
            return PlayOutcome::Stopped;
        }
        if self.active == Some(profile) && self.output.is_attached() {
            return PlayOutcome::AlreadyPlaying;
        }

        let now = Instant::now();
        if self.lock_until.is_some_and(|until| now < until) {
            debug!("ambience transition in flight, ignoring play({profile})");
            return PlayOutcome::Suppressed;
        }
        self.lock_until = Some(now + self.transition_lock);

        self.teardown();

        let Some(recipe) = profile.recipe() else {
            return PlayOutcome::Stopped;
        };
        let graph = SignalGraph::build(
            &recipe,
            self.output.sample_rate(),
            self.noise_buffer_secs,
            self.master.clone(),
            &mut self.rng,
        );

        if let Err(e) = self.output.resume() {
            warn!("audio output suspended, ambience stays silent until resumed: {e}");
        }

        match self.output.attach(Box::new(graph)) {
            Ok(()) => {
                info!("ambience started: {profile}");
                self.active = Some(profile);
                PlayOutcome::Started
            }
            Err(e) => {
                warn!("cannot attach ambience graph: {e}");
                PlayOutcome::Unavailable
            }
        }
    }

    /// Apply a profile and volume together.
    pub fn apply(&mut self, setting: AmbienceSetting) -> PlayOutcome {
        self.set_volume(setting.volume);
        self.play(setting.profile)
    }

    /// Tear down the active graph and release the transition lock, so the
    /// next `play` starts immediately. Idempotent.
    pub fn stop(&mut self) {
        if self.active.is_some() || self.output.is_attached() {
            info!("ambience stopped");
        }
        self.lock_until = None;
        self.teardown();
    }

    /// Set the master gain live, clamped to `[0, 1]`.
    pub fn set_volume(&mut self, volume: f32) {
        self.master.set(clamp_volume(volume));
    }

    pub fn volume(&self) -> f32 {
        self.master.get()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_profile(&self) -> Option<AmbienceProfile> {
        self.active
    }

    /// Retry starting a suspended output, for instance after a user gesture.
    pub fn resume_output(&mut self) {
        if let Err(e) = self.output.resume() {
            debug!("audio output still suspended: {e}");
        }
    }

    fn teardown(&mut self) {
        self.output.detach();
        self.active = None;
    }
}

impl Drop for AmbientSynth {
    fn drop(&mut self) {
        self.teardown();
    }
}
