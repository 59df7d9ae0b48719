//! Host speech service seam.

use super::voice::VoiceInfo;
use crate::error::{BreathlineError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// One phrase to speak.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: VoiceInfo,
    /// Pitch multiplier around the voice's natural pitch.
    pub pitch: f32,
    /// Rate multiplier around the service's normal rate.
    pub rate: f32,
}

/// Host speech service contract.
///
/// `speak` starts an utterance and returns without waiting for it to end;
/// `cancel` silences whatever is in flight. Both are synchronous so callers
/// can order them under a lock.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Stable backend identifier for logs.
    fn id(&self) -> &'static str;

    /// Voices discovered so far. May be empty until discovery finishes.
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Resolves once voice discovery has finished, successfully or not.
    /// May never resolve; callers bound it with a timeout.
    async fn voices_ready(&self);

    /// Start speaking.
    ///
    /// # Errors
    ///
    /// Returns [`BreathlineError::Speech`] if the service rejects the
    /// utterance.
    fn speak(&self, utterance: &Utterance) -> Result<()>;

    /// Stop any utterance in flight. Safe when idle.
    fn cancel(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineKind {
    Espeak,
    Say,
}

/// Words per minute at rate 1.0.
const BASE_WPM: f32 = 175.0;

/// Desktop speech through `espeak-ng`, `espeak` or macOS `say`.
///
/// Each utterance runs as a child process; cancelling kills it before the
/// next one is spawned. Voices are listed by a background probe and
/// published over a watch channel.
pub struct CommandSpeech {
    kind: EngineKind,
    program: PathBuf,
    voices: watch::Receiver<Option<Vec<VoiceInfo>>>,
    current: Mutex<Option<Child>>,
}

impl CommandSpeech {
    /// Locate a speech program on `PATH` and start voice discovery.
    ///
    /// Must be called inside a tokio runtime. Returns `None` when no
    /// supported program is installed.
    pub fn detect() -> Option<Self> {
        let candidates = [
            ("espeak-ng", EngineKind::Espeak),
            ("espeak", EngineKind::Espeak),
            ("say", EngineKind::Say),
        ];
        let (program, kind) = candidates
            .into_iter()
            .find_map(|(name, kind)| which::which(name).ok().map(|path| (path, kind)))?;
        info!("speech service: {}", program.display());
        Some(Self::spawn(kind, program))
    }

    fn spawn(kind: EngineKind, program: PathBuf) -> Self {
        let (tx, rx) = watch::channel(None);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let probe_program = program.clone();
                handle.spawn(async move {
                    let voices = match list_voices(kind, &probe_program).await {
                        Ok(v) => v,
                        Err(e) => {
                            warn!("voice discovery failed: {e}");
                            Vec::new()
                        }
                    };
                    debug!("discovered {} host voices", voices.len());
                    let _ = tx.send(Some(voices));
                });
            }
            Err(_) => {
                warn!("no async runtime, host voices unavailable");
                let _ = tx.send(Some(Vec::new()));
            }
        }
        Self {
            kind,
            program,
            voices: rx,
            current: Mutex::new(None),
        }
    }

    fn command_for(&self, utterance: &Utterance) -> Command {
        let wpm = (BASE_WPM * utterance.rate).round().clamp(80.0, 450.0) as u32;
        let mut cmd = Command::new(&self.program);
        match self.kind {
            EngineKind::Espeak => {
                let pitch = (50.0 * utterance.pitch).round().clamp(0.0, 99.0) as u32;
                cmd.arg("-v")
                    .arg(&utterance.voice.id)
                    .arg("-s")
                    .arg(wpm.to_string())
                    .arg("-p")
                    .arg(pitch.to_string())
                    .arg("--")
                    .arg(&utterance.text);
            }
            EngineKind::Say => {
                cmd.arg("-v")
                    .arg(&utterance.voice.id)
                    .arg("-r")
                    .arg(wpm.to_string())
                    .arg("--")
                    .arg(&utterance.text);
            }
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl SpeechBackend for CommandSpeech {
    fn id(&self) -> &'static str {
        match self.kind {
            EngineKind::Espeak => "espeak",
            EngineKind::Say => "say",
        }
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.borrow().clone().unwrap_or_default()
    }

    async fn voices_ready(&self) {
        let mut rx = self.voices.clone();
        let _ = rx.wait_for(|v| v.is_some()).await;
    }

    fn speak(&self, utterance: &Utterance) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| BreathlineError::Speech("no async runtime".into()))?;
        let mut current = match self.current.lock() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = current.take() {
            kill_child(previous);
        }
        let child = {
            let _guard = handle.enter();
            self.command_for(utterance)
                .spawn()
                .map_err(|e| BreathlineError::Speech(format!("cannot start speech: {e}")))?
        };
        *current = Some(child);
        debug!("speaking via {}: {:?}", self.id(), utterance.text);
        Ok(())
    }

    fn cancel(&self) {
        let previous = match self.current.lock() {
            Ok(mut current) => current.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(child) = previous {
            kill_child(child);
        }
    }
}

/// Signal the child right away. Reaping is left to tokio's orphan queue.
fn kill_child(mut child: Child) {
    if let Ok(None) = child.try_wait() {
        if let Err(e) = child.start_kill() {
            debug!("speech process already gone: {e}");
        }
    }
}

async fn list_voices(kind: EngineKind, program: &Path) -> Result<Vec<VoiceInfo>> {
    let mut cmd = Command::new(program);
    match kind {
        EngineKind::Espeak => cmd.arg("--voices"),
        EngineKind::Say => cmd.arg("-v").arg("?"),
    };
    let output = cmd
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| BreathlineError::Speech(format!("cannot list voices: {e}")))?;
    let text = String::from_utf8_lossy(&output.stdout);
    Ok(match kind {
        EngineKind::Espeak => parse_espeak_voices(&text),
        EngineKind::Say => parse_say_voices(&text),
    })
}

/// Parse `espeak-ng --voices` output.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  en-gb           --/M      English_(Great_Britain) gmw/en
/// ```
fn parse_espeak_voices(text: &str) -> Vec<VoiceInfo> {
    text.lines()
        .skip(1)
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let _priority = cols.next()?;
            let lang = cols.next()?;
            let age_gender = cols.next()?;
            let name = cols.next()?;
            let gender = match age_gender.rsplit('/').next() {
                Some("F") => "female",
                Some("M") => "male",
                _ => "",
            };
            let label = name.replace('_', " ");
            let label = if gender.is_empty() {
                label
            } else {
                format!("{label} ({gender})")
            };
            Some(VoiceInfo::new(lang, label, lang))
        })
        .collect()
}

/// Parse `say -v ?` output.
///
/// ```text
/// Daniel              en_GB    # Hello! My name is Daniel.
/// Eddy (English (UK)) en_GB    # Hello! My name is Eddy.
/// ```
fn parse_say_voices(text: &str) -> Vec<VoiceInfo> {
    text.lines()
        .filter_map(|line| {
            let head = line.split('#').next()?.trim_end();
            let (name, lang) = head.rsplit_once(char::is_whitespace)?;
            let name = name.trim();
            if name.is_empty() || !lang.contains('_') {
                return None;
            }
            Some(VoiceInfo::new(name, name, lang))
        })
        .collect()
}
