//! Shared helpers for integration tests.

use async_trait::async_trait;
use breathline::audio::NullOutput;
use breathline::config::{AmbienceConfig, NarrationConfig};
use breathline::narration::{SpeechBackend, Utterance, VoiceInfo};
use breathline::session::{FilePreferences, Frame, RenderSink, SessionEvent, SessionLog};
use breathline::{AmbientSynth, Narrator, SessionController};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Speech backend that records every utterance and always has voices.
#[derive(Default)]
pub(crate) struct ScriptedSpeech {
    spoken: Mutex<Vec<String>>,
    cancels: Mutex<usize>,
}

impl ScriptedSpeech {
    pub(crate) fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub(crate) fn cancels(&self) -> usize {
        *self.cancels.lock().unwrap()
    }
}

#[async_trait]
impl SpeechBackend for ScriptedSpeech {
    fn id(&self) -> &'static str {
        "scripted"
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        vec![
            VoiceInfo::new("en-gb-f", "Serena", "en-GB"),
            VoiceInfo::new("en-gb-m", "Daniel", "en-GB"),
        ]
    }

    async fn voices_ready(&self) {}

    fn speak(&self, utterance: &Utterance) -> breathline::Result<()> {
        self.spoken.lock().unwrap().push(utterance.text.clone());
        Ok(())
    }

    fn cancel(&self) {
        *self.cancels.lock().unwrap() += 1;
    }
}

/// Render sink keeping every frame.
#[derive(Clone, Default)]
pub(crate) struct FrameLog(Arc<Mutex<Vec<Frame>>>);

impl FrameLog {
    pub(crate) fn frames(&self) -> Vec<Frame> {
        self.0.lock().unwrap().clone()
    }
}

impl RenderSink for FrameLog {
    fn frame(&mut self, frame: &Frame) {
        self.0.lock().unwrap().push(frame.clone());
    }
}

/// Everything a session test needs, persisted under a temp dir.
pub(crate) struct Rig {
    pub(crate) controller: SessionController,
    pub(crate) speech: Arc<ScriptedSpeech>,
    pub(crate) frames: FrameLog,
    pub(crate) log: Arc<SessionLog>,
    pub(crate) preferences: Arc<FilePreferences>,
    pub(crate) _dir: tempfile::TempDir,
}

/// Build a controller over a silent output, scripted speech and on-disk
/// history/preferences.
pub(crate) fn rig() -> Rig {
    let dir = tempfile::tempdir().expect("create temp dir");
    let speech = Arc::new(ScriptedSpeech::default());
    let narrator = Narrator::builder(&NarrationConfig::default())
        .backend(speech.clone())
        .build();
    let ambience = AmbienceConfig {
        transition_lock_ms: 0,
        noise_buffer_secs: 0.1,
        ..AmbienceConfig::default()
    };
    let synth = AmbientSynth::new(Box::new(NullOutput::new(8_000)), &ambience).with_seed(7);
    let log = Arc::new(SessionLog::new(dir.path().join("sessions.json")));
    let preferences = Arc::new(FilePreferences::new(dir.path().join("preferences.toml")));
    let frames = FrameLog::default();
    let controller = SessionController::new(synth, narrator, log.clone())
        .with_renderer(Box::new(frames.clone()))
        .with_preferences(preferences.clone());
    Rig {
        controller,
        speech,
        frames,
        log,
        preferences,
        _dir: dir,
    }
}

/// Drain all pending events from the broadcast receiver into a Vec.
pub(crate) fn drain_events(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(evt) = rx.try_recv() {
        events.push(evt);
    }
    events
}
