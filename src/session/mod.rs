//! Session controller.
//!
//! [`SessionController`] composes the phase sequencer, the ambient
//! synthesizer and the narrator into one `idle → running ⇄ paused →
//! complete` state machine. Host failures never surface here: a session
//! always continues with whatever channels still work.

pub mod log;
pub mod preferences;
pub mod record;
pub mod runner;

pub use log::{SessionHistory, SessionLog, SessionStats};
pub use preferences::{FilePreferences, Preferences};
pub use record::SessionRecord;
pub use runner::{SessionCommand, SessionHandle, SessionRunner};

use crate::config::{BreathlineConfig, SessionSettings};
use crate::error::Result;
use crate::narration::{NarrationRequest, Narrator, VoiceProfile};
use crate::sequencer::{PhaseSequencer, SequencerEvent};
use crate::synth::{AmbienceSetting, AmbientSynth};
use crate::technique::{CueId, Technique, TechniqueCatalog};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Capacity of the session event channel.
const EVENT_CAPACITY: usize = 64;

/// Receives one frame per tick. A pure sink.
pub trait RenderSink: Send {
    fn frame(&mut self, frame: &Frame);
}

/// Receives the record of each session that made progress.
pub trait ProgressRecorder: Send + Sync {
    fn record(&self, record: &SessionRecord);
}

/// Key-value store for the last technique and voice.
pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> Preferences;

    /// # Errors
    ///
    /// Returns an error if the preferences cannot be persisted.
    fn save(&self, preferences: &Preferences) -> Result<()>;
}

/// Recorder that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl ProgressRecorder for NoopRecorder {
    fn record(&self, _record: &SessionRecord) {}
}

/// What the renderer shows for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub phase_name: String,
    pub phase_index: usize,
    /// Progress through the current phase, `[0, 1]`.
    pub phase_progress: f64,
    /// Progress through the whole session, `[0, 1]`.
    pub session_progress: f64,
    pub remaining_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Complete,
}

/// Lifecycle notifications for observers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started {
        session_id: Uuid,
        technique_id: String,
        total_duration_secs: f64,
    },
    PhaseEntered {
        index: usize,
        name: String,
    },
    Paused,
    Resumed,
    /// Natural end. Carries the record when one was emitted.
    Completed(Option<SessionRecord>),
    /// User abandoned the session.
    Stopped(Option<SessionRecord>),
}

/// Everything chosen for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub technique_id: String,
    pub total_duration_secs: f64,
    pub ambience: AmbienceSetting,
    pub voice: VoiceProfile,
    pub narration_enabled: bool,
}

impl SessionConfig {
    /// Build from configured defaults, letting stored preferences override
    /// the technique and voice.
    pub fn from_defaults(config: &BreathlineConfig, preferences: Option<&Preferences>) -> Self {
        let technique_id = preferences
            .and_then(|p| p.last_technique.clone())
            .unwrap_or_else(|| config.session.technique.clone());
        let voice = preferences
            .and_then(|p| p.voice_profile.clone())
            .unwrap_or_else(|| config.narration.voice.clone());
        Self {
            technique_id,
            total_duration_secs: config.session.duration_secs,
            ambience: AmbienceSetting::new(config.ambience.profile, config.ambience.volume),
            voice,
            narration_enabled: config.narration.enabled,
        }
    }
}

struct ActiveSession {
    id: Uuid,
    technique: Technique,
    voice: VoiceProfile,
    narration_enabled: bool,
    total_duration_secs: f64,
    reported: bool,
}

pub struct SessionController {
    catalog: TechniqueCatalog,
    settings: SessionSettings,
    sequencer: PhaseSequencer,
    synth: AmbientSynth,
    narrator: Narrator,
    renderer: Option<Box<dyn RenderSink>>,
    recorder: Arc<dyn ProgressRecorder>,
    preferences: Option<Arc<dyn PreferenceStore>>,
    events: broadcast::Sender<SessionEvent>,
    state: SessionState,
    active: Option<ActiveSession>,
    last_record: Option<SessionRecord>,
}

impl SessionController {
    pub fn new(
        synth: AmbientSynth,
        narrator: Narrator,
        recorder: Arc<dyn ProgressRecorder>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            catalog: TechniqueCatalog::builtin(),
            settings: SessionSettings::default(),
            sequencer: PhaseSequencer::new(),
            synth,
            narrator,
            renderer: None,
            recorder,
            preferences: None,
            events,
            state: SessionState::Idle,
            active: None,
            last_record: None,
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: TechniqueCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Box<dyn RenderSink>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[must_use]
    pub fn with_preferences(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(store);
        self
    }

    /// Observe lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Start a session, abandoning any session still active.
    ///
    /// An unknown technique falls back to the first catalog entry and an
    /// invalid duration to the configured default.
    pub async fn start(&mut self, config: SessionConfig) {
        if matches!(self.state, SessionState::Running | SessionState::Paused) {
            self.stop();
        }

        let technique = self.catalog.resolve(&config.technique_id).clone();
        let total = if config.total_duration_secs.is_finite() && config.total_duration_secs > 0.0 {
            config.total_duration_secs
        } else {
            warn!(
                "invalid session duration {}, using {}s",
                config.total_duration_secs, self.settings.duration_secs
            );
            self.settings.duration_secs
        };

        self.sequencer.configure(technique.clone(), total);
        let total = self.sequencer.total_duration_secs();
        self.sequencer.start();

        let id = Uuid::new_v4();
        info!(
            "session {id} started: {} for {total}s, ambience {}",
            technique.id(),
            config.ambience.profile
        );
        self.save_preferences(technique.id(), &config.voice);

        self.synth.apply(config.ambience);

        self.active = Some(ActiveSession {
            id,
            technique: technique.clone(),
            voice: config.voice,
            narration_enabled: config.narration_enabled,
            total_duration_secs: total,
            reported: false,
        });
        self.state = SessionState::Running;
        self.emit(SessionEvent::Started {
            session_id: id,
            technique_id: technique.id().to_owned(),
            total_duration_secs: total,
        });

        self.narrate_current().await;
        self.render();
    }

    /// Advance by `delta_secs`. Narrates every phase entered, in order,
    /// before returning. No-op unless running.
    pub async fn tick(&mut self, delta_secs: f64) {
        if self.state != SessionState::Running {
            return;
        }

        let mut completed = false;
        for event in self.sequencer.tick(delta_secs) {
            match event {
                SequencerEvent::PhaseEntered { index, name, cue } => {
                    debug!("phase entered: {name}");
                    self.emit(SessionEvent::PhaseEntered {
                        index,
                        name: name.clone(),
                    });
                    self.narrate(name, cue).await;
                }
                SequencerEvent::SessionComplete { .. } => completed = true,
            }
        }

        self.render();
        if completed {
            self.finish(true);
        }
    }

    /// Freeze the sequence and silence narration. Ambience keeps playing.
    pub fn pause(&mut self) {
        if self.state != SessionState::Running {
            return;
        }
        self.sequencer.stop();
        self.narrator.cancel_all();
        self.state = SessionState::Paused;
        info!("session paused");
        self.emit(SessionEvent::Paused);
    }

    /// Continue a paused session and re-announce the current phase.
    pub async fn resume(&mut self) {
        if self.state != SessionState::Paused {
            return;
        }
        self.sequencer.start();
        self.synth.resume_output();
        self.state = SessionState::Running;
        info!("session resumed");
        self.emit(SessionEvent::Resumed);
        self.narrate_current().await;
    }

    /// Abandon the session. Returns the record if the session made progress.
    pub fn stop(&mut self) -> Option<SessionRecord> {
        match self.state {
            SessionState::Running | SessionState::Paused => self.finish(false),
            SessionState::Complete => {
                self.state = SessionState::Idle;
                None
            }
            SessionState::Idle => None,
        }
    }

    /// Change the ambience master volume live.
    pub fn set_volume(&mut self, volume: f32) {
        self.synth.set_volume(volume);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn progress(&self) -> f64 {
        self.sequencer.progress()
    }

    pub fn sequencer(&self) -> &PhaseSequencer {
        &self.sequencer
    }

    pub fn synth(&self) -> &AmbientSynth {
        &self.synth
    }

    pub fn catalog(&self) -> &TechniqueCatalog {
        &self.catalog
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.settings.tick_interval_ms.max(1))
    }

    /// Record emitted by the most recent session, if any.
    pub fn last_record(&self) -> Option<&SessionRecord> {
        self.last_record.as_ref()
    }

    /// Current frame, if a session is loaded.
    pub fn frame(&self) -> Option<Frame> {
        let phase = self.sequencer.current_phase()?;
        Some(Frame {
            phase_name: phase.name().to_owned(),
            phase_index: self.sequencer.state().phase_index,
            phase_progress: self.sequencer.phase_progress(),
            session_progress: self.sequencer.progress(),
            remaining_secs: self.sequencer.remaining_secs(),
        })
    }

    fn finish(&mut self, completed: bool) -> Option<SessionRecord> {
        self.sequencer.stop();
        self.synth.stop();
        self.narrator.cancel_all();

        let elapsed = self.sequencer.state().total_elapsed_secs;
        let cycles = self.sequencer.cycles_completed();
        let record = self.active.as_mut().and_then(|active| {
            if active.reported || elapsed <= 0.0 {
                return None;
            }
            active.reported = true;
            Some(SessionRecord::new(
                active.id,
                active.technique.id(),
                elapsed,
                active.total_duration_secs,
                cycles,
                active.technique.pattern(),
                completed,
            ))
        });

        if let Some(record) = record.as_ref() {
            self.recorder.record(record);
            self.last_record = Some(record.clone());
        }

        self.state = if completed {
            SessionState::Complete
        } else {
            SessionState::Idle
        };
        info!(
            "session {} after {elapsed:.1}s ({cycles} cycles)",
            if completed { "completed" } else { "stopped" }
        );
        self.emit(if completed {
            SessionEvent::Completed(record.clone())
        } else {
            SessionEvent::Stopped(record.clone())
        });
        record
    }

    async fn narrate_current(&mut self) {
        let Some(phase) = self.sequencer.current_phase() else {
            return;
        };
        let (name, cue) = (phase.name().to_owned(), phase.cue());
        self.narrate(name, cue).await;
    }

    async fn narrate(&mut self, text: String, cue: Option<CueId>) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        if !active.narration_enabled {
            return;
        }
        let request = NarrationRequest::new(text, active.voice.clone()).with_cue(cue);
        let outcome = self.narrator.speak_request(request).await;
        debug!("narration: {outcome:?}");
    }

    fn render(&mut self) {
        let Some(frame) = self.frame() else {
            return;
        };
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.frame(&frame);
        }
    }

    fn save_preferences(&self, technique_id: &str, voice: &VoiceProfile) {
        let Some(store) = self.preferences.as_ref() else {
            return;
        };
        let preferences = Preferences {
            last_technique: Some(technique_id.to_owned()),
            voice_profile: Some(voice.clone()),
        };
        if let Err(e) = store.save(&preferences) {
            warn!("failed to save preferences: {e}");
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
