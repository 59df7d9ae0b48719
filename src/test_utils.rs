//! Shared test doubles used across multiple test modules.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::audio::{AudioOutput, SampleSource};
use crate::error::{BreathlineError, Result};
use crate::narration::{CueClip, CuePlayer, SpeechBackend, Utterance, VoiceInfo};
use crate::session::{Frame, PreferenceStore, Preferences, ProgressRecorder, SessionRecord};
use crate::technique::CueId;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[derive(Default)]
struct OutputState {
    source: Option<Box<dyn SampleSource>>,
    attach_count: usize,
    overlaps: usize,
    resume_attempts: usize,
    fail_resume: bool,
    fail_attach: bool,
}

/// [`AudioOutput`] that records attach/detach traffic and renders on demand.
#[derive(Clone)]
pub struct RecordingOutput {
    sample_rate: u32,
    state: Arc<Mutex<OutputState>>,
}

impl RecordingOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            state: Arc::new(Mutex::new(OutputState::default())),
        }
    }

    /// Every `resume` fails, like a host that keeps audio suspended.
    pub fn failing_resume(self) -> Self {
        self.state.lock().unwrap().fail_resume = true;
        self
    }

    /// Every `attach` fails.
    pub fn failing_attach(self) -> Self {
        self.state.lock().unwrap().fail_attach = true;
        self
    }

    pub fn attach_count(&self) -> usize {
        self.state.lock().unwrap().attach_count
    }

    /// Attaches that found a source still attached.
    pub fn overlaps(&self) -> usize {
        self.state.lock().unwrap().overlaps
    }

    pub fn is_attached_now(&self) -> bool {
        self.state.lock().unwrap().source.is_some()
    }

    pub fn resume_attempts(&self) -> usize {
        self.state.lock().unwrap().resume_attempts
    }

    /// Pull `len` samples the way a render callback would.
    pub fn render(&self, len: usize) -> Vec<f32> {
        let mut out = vec![0.0; len];
        let mut state = self.state.lock().unwrap();
        let finished = match state.source.as_mut() {
            Some(source) => {
                source.fill(&mut out);
                source.is_finished()
            }
            None => false,
        };
        if finished {
            state.source = None;
        }
        out
    }
}

impl AudioOutput for RecordingOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn resume(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.resume_attempts += 1;
        if state.fail_resume {
            return Err(BreathlineError::Audio("output suspended".into()));
        }
        Ok(())
    }

    fn attach(&mut self, source: Box<dyn SampleSource>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_attach {
            return Err(BreathlineError::Audio("output unavailable".into()));
        }
        if state.source.is_some() {
            state.overlaps += 1;
        }
        state.attach_count += 1;
        state.source = Some(source);
        Ok(())
    }

    fn detach(&mut self) {
        self.state.lock().unwrap().source = None;
    }

    fn is_attached(&self) -> bool {
        self.is_attached_now()
    }
}

#[derive(Default)]
struct SpeechState {
    spoken: Vec<Utterance>,
    cancels: usize,
    audible: Option<String>,
    max_concurrent: usize,
}

/// Scriptable [`SpeechBackend`].
pub struct FakeSpeech {
    voices: watch::Sender<Option<Vec<VoiceInfo>>>,
    fail: bool,
    state: Mutex<SpeechState>,
}

impl FakeSpeech {
    fn with(voices: Option<Vec<VoiceInfo>>, fail: bool) -> Arc<Self> {
        let (tx, _rx) = watch::channel(voices);
        Arc::new(Self {
            voices: tx,
            fail,
            state: Mutex::new(SpeechState::default()),
        })
    }

    /// Voices already discovered.
    pub fn ready(voices: Vec<VoiceInfo>) -> Arc<Self> {
        Self::with(Some(voices), false)
    }

    /// Discovery still running until [`FakeSpeech::publish`].
    pub fn pending() -> Arc<Self> {
        Self::with(None, false)
    }

    /// Voices available but every `speak` is rejected.
    pub fn failing(voices: Vec<VoiceInfo>) -> Arc<Self> {
        Self::with(Some(voices), true)
    }

    /// Finish discovery.
    pub fn publish(&self, voices: Vec<VoiceInfo>) {
        self.voices.send_replace(Some(voices));
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        self.state.lock().unwrap().spoken.clone()
    }

    pub fn cancel_count(&self) -> usize {
        self.state.lock().unwrap().cancels
    }

    /// Text currently being spoken.
    pub fn audible(&self) -> Option<String> {
        self.state.lock().unwrap().audible.clone()
    }

    /// Most utterances ever audible at once.
    pub fn max_concurrent(&self) -> usize {
        self.state.lock().unwrap().max_concurrent
    }
}

#[async_trait]
impl SpeechBackend for FakeSpeech {
    fn id(&self) -> &'static str {
        "fake"
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.borrow().clone().unwrap_or_default()
    }

    async fn voices_ready(&self) {
        let mut rx = self.voices.subscribe();
        let _ = rx.wait_for(Option::is_some).await;
    }

    fn speak(&self, utterance: &Utterance) -> Result<()> {
        if self.fail {
            return Err(BreathlineError::Speech("synthesis refused".into()));
        }
        let mut state = self.state.lock().unwrap();
        let concurrent = if state.audible.is_some() { 2 } else { 1 };
        state.max_concurrent = state.max_concurrent.max(concurrent);
        state.audible = Some(utterance.text.clone());
        state.spoken.push(utterance.clone());
        Ok(())
    }

    fn cancel(&self) {
        let mut state = self.state.lock().unwrap();
        state.cancels += 1;
        state.audible = None;
    }
}

#[derive(Default)]
struct CueState {
    played: Vec<CueId>,
    stops: usize,
}

/// [`CuePlayer`] that only records what it was asked to do.
#[derive(Clone, Default)]
pub struct RecordingCuePlayer {
    state: Arc<Mutex<CueState>>,
}

impl RecordingCuePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<CueId> {
        self.state.lock().unwrap().played.clone()
    }

    pub fn stop_count(&self) -> usize {
        self.state.lock().unwrap().stops
    }
}

impl CuePlayer for RecordingCuePlayer {
    fn play(&mut self, clip: &CueClip) -> Result<()> {
        self.state.lock().unwrap().played.push(clip.cue);
        Ok(())
    }

    fn stop(&mut self) {
        self.state.lock().unwrap().stops += 1;
    }
}

/// [`crate::session::RenderSink`] collecting frames.
#[derive(Clone, Default)]
pub struct RecordingSink {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl RecordingSink {
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }
}

impl crate::session::RenderSink for RecordingSink {
    fn frame(&mut self, frame: &Frame) {
        self.frames.lock().unwrap().push(frame.clone());
    }
}

/// [`ProgressRecorder`] keeping records in memory.
#[derive(Default)]
pub struct RecordingRecorder {
    records: Mutex<Vec<SessionRecord>>,
}

impl RecordingRecorder {
    pub fn records(&self) -> Vec<SessionRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl ProgressRecorder for RecordingRecorder {
    fn record(&self, record: &SessionRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}

/// [`PreferenceStore`] keeping every save in memory.
#[derive(Default)]
pub struct MemoryPreferences {
    saved: Mutex<Vec<Preferences>>,
}

impl MemoryPreferences {
    pub fn saved(&self) -> Vec<Preferences> {
        self.saved.lock().unwrap().clone()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn load(&self) -> Preferences {
        self.saved.lock().unwrap().last().cloned().unwrap_or_default()
    }

    fn save(&self, preferences: &Preferences) -> Result<()> {
        self.saved.lock().unwrap().push(preferences.clone());
        Ok(())
    }
}
