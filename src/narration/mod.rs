//! Narration orchestrator.
//!
//! [`Narrator`] speaks short phrases through a host [`SpeechBackend`] and
//! falls back to pre-recorded cues. At most one utterance is audible: every
//! request cancels what came before, and a generation counter stops a
//! request that was waiting on voice discovery from resurfacing after a
//! newer request or a cancel.

pub mod backend;
pub mod cue;
pub mod sanitize;
pub mod voice;

pub use backend::{CommandSpeech, SpeechBackend, Utterance};
pub use cue::{CueClip, CueLibrary, CuePlayer, OutputCuePlayer};
pub use sanitize::sanitize;
pub use voice::{VoiceChoice, VoiceGender, VoiceInfo, VoiceProfile, select_voice};

use crate::config::NarrationConfig;
use crate::technique::CueId;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A phrase to narrate with the cue used if host speech is unavailable.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationRequest {
    pub text: String,
    pub cue: Option<CueId>,
    pub voice: VoiceProfile,
}

impl NarrationRequest {
    /// Build a request, inferring the fallback cue from `text`.
    pub fn new(text: impl Into<String>, voice: VoiceProfile) -> Self {
        let text = text.into();
        let cue = CueId::infer(&text);
        Self { text, cue, voice }
    }

    #[must_use]
    pub fn with_cue(mut self, cue: Option<CueId>) -> Self {
        self.cue = cue;
        self
    }
}

/// What a narration request ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrationOutcome {
    /// Host speech started.
    Spoken { voice: String, simulated: bool },
    /// A pre-recorded cue started.
    Cue(CueId),
    /// Nothing speakable in the text.
    Skipped,
    /// A newer request or a cancel arrived first.
    Superseded,
    /// Neither host speech nor a matching cue was available.
    Silent,
}

/// State touched only while holding the channel lock.
struct VoiceChannel {
    cue_player: Option<Box<dyn CuePlayer>>,
}

struct NarratorInner {
    backend: Option<Arc<dyn SpeechBackend>>,
    /// Decoded outside the channel lock; the library caches on its own.
    cue_library: Option<CueLibrary>,
    channel: Mutex<VoiceChannel>,
    generation: AtomicU64,
    discovery_settled: AtomicBool,
    voices_timeout: Duration,
    rate: f32,
}

/// Cheap-to-clone handle to one narration channel.
#[derive(Clone)]
pub struct Narrator {
    inner: Arc<NarratorInner>,
}

/// Builder for [`Narrator`].
pub struct NarratorBuilder {
    backend: Option<Arc<dyn SpeechBackend>>,
    cues: Option<(CueLibrary, Box<dyn CuePlayer>)>,
    voices_timeout: Duration,
    rate: f32,
}

impl NarratorBuilder {
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn SpeechBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    #[must_use]
    pub fn cues(mut self, library: CueLibrary, player: Box<dyn CuePlayer>) -> Self {
        self.cues = Some((library, player));
        self
    }

    pub fn build(self) -> Narrator {
        let (cue_library, cue_player) = match self.cues {
            Some((library, player)) => (Some(library), Some(player)),
            None => (None, None),
        };
        Narrator {
            inner: Arc::new(NarratorInner {
                backend: self.backend,
                cue_library,
                channel: Mutex::new(VoiceChannel { cue_player }),
                generation: AtomicU64::new(0),
                discovery_settled: AtomicBool::new(false),
                voices_timeout: self.voices_timeout,
                rate: self.rate,
            }),
        }
    }
}

impl Narrator {
    pub fn builder(config: &NarrationConfig) -> NarratorBuilder {
        NarratorBuilder {
            backend: None,
            cues: None,
            voices_timeout: Duration::from_millis(config.voices_ready_timeout_ms),
            rate: config.rate,
        }
    }

    /// A narrator with no speech service and no cues. Always silent.
    pub fn silent() -> Self {
        Self::builder(&NarrationConfig::default()).build()
    }

    /// Speak `text`, falling back to the cue inferred from it.
    pub async fn speak(&self, text: &str, voice: &VoiceProfile) -> NarrationOutcome {
        self.speak_request(NarrationRequest::new(text, voice.clone()))
            .await
    }

    /// Cancel whatever is audible, then speak `request`.
    pub async fn speak_request(&self, request: NarrationRequest) -> NarrationOutcome {
        let generation = self.begin_request();

        let Some(text) = sanitize(&request.text) else {
            debug!("nothing speakable in {:?}", request.text);
            return NarrationOutcome::Skipped;
        };

        if let Some(backend) = self.inner.backend.as_ref() {
            let voices = self.discover_voices(backend.as_ref()).await;
            if let Some(choice) = select_voice(&voices, &request.voice) {
                let utterance = Utterance {
                    text,
                    voice: choice.voice.clone(),
                    pitch: choice.pitch,
                    rate: self.inner.rate,
                };
                let _channel = self.lock_channel();
                if !self.is_current(generation) {
                    return NarrationOutcome::Superseded;
                }
                match backend.speak(&utterance) {
                    Ok(()) => {
                        debug!(
                            "narrating {:?} with {} (simulated={})",
                            utterance.text, choice.voice.name, choice.simulated
                        );
                        return NarrationOutcome::Spoken {
                            voice: choice.voice.name,
                            simulated: choice.simulated,
                        };
                    }
                    Err(e) => warn!("host speech failed, trying cue: {e}"),
                }
            }
        }

        self.play_cue(generation, &request)
    }

    /// Silence any utterance or cue in flight. Safe when idle.
    pub fn cancel_all(&self) {
        let mut channel = self.lock_channel();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        Self::silence(self.inner.backend.as_deref(), &mut channel);
    }

    /// Whether a host speech service is configured.
    pub fn has_speech_service(&self) -> bool {
        self.inner.backend.is_some()
    }

    /// Voices currently offered by the host speech service.
    pub fn voices(&self) -> Vec<VoiceInfo> {
        self.inner
            .backend
            .as_ref()
            .map(|b| b.voices())
            .unwrap_or_default()
    }

    fn begin_request(&self) -> u64 {
        let mut channel = self.lock_channel();
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Self::silence(self.inner.backend.as_deref(), &mut channel);
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }

    fn silence(backend: Option<&dyn SpeechBackend>, channel: &mut VoiceChannel) {
        if let Some(backend) = backend {
            backend.cancel();
        }
        if let Some(player) = channel.cue_player.as_mut() {
            player.stop();
        }
    }

    fn lock_channel(&self) -> MutexGuard<'_, VoiceChannel> {
        match self.inner.channel.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Current voices, waiting once (bounded) for lazy discovery.
    async fn discover_voices(&self, backend: &dyn SpeechBackend) -> Vec<VoiceInfo> {
        let voices = backend.voices();
        if !voices.is_empty() || self.inner.discovery_settled.load(Ordering::SeqCst) {
            return voices;
        }

        let ready = tokio::time::timeout(self.inner.voices_timeout, backend.voices_ready()).await;
        self.inner.discovery_settled.store(true, Ordering::SeqCst);
        let voices = backend.voices();
        match (ready, voices.is_empty()) {
            (Err(_), true) => info!(
                "no host voices after {:?}, using cue fallback",
                self.inner.voices_timeout
            ),
            (_, true) => info!("host speech service offers no voices"),
            (_, false) => info!("{} host voices available", voices.len()),
        }
        voices
    }

    /// Load the fallback clip for `request`. Takes no channel lock, so a
    /// slow decode never blocks `cancel_all`.
    fn cue_clip(&self, request: &NarrationRequest) -> Option<CueClip> {
        let cue = request.cue?;
        let library = self.inner.cue_library.as_ref()?;
        let clip = library.load(&request.voice, cue);
        if clip.is_none() {
            debug!("no {} cue for {}", cue.as_str(), request.voice);
        }
        clip
    }

    fn play_cue(&self, generation: u64, request: &NarrationRequest) -> NarrationOutcome {
        let Some(clip) = self.cue_clip(request) else {
            return NarrationOutcome::Silent;
        };

        let mut channel = self.lock_channel();
        if !self.is_current(generation) {
            return NarrationOutcome::Superseded;
        }
        let Some(player) = channel.cue_player.as_mut() else {
            return NarrationOutcome::Silent;
        };
        let cue = clip.cue;
        match player.play(&clip) {
            Ok(()) => NarrationOutcome::Cue(cue),
            Err(e) => {
                warn!("{e}");
                NarrationOutcome::Silent
            }
        }
    }
}
