//! Breathline: a guided breathing session engine.
//!
//! A session runs three channels off one clock:
//! - **Phase sequencer**: advances through a technique's inhale/hold/exhale
//!   phases and reports every boundary crossed
//! - **Ambient synthesizer**: procedural oscillator and filtered-noise
//!   soundscapes rendered through `cpal`
//! - **Narrator**: speaks phase names through a host speech service,
//!   falling back to pre-recorded cues
//!
//! # Architecture
//!
//! [`SessionController`] owns the three channels and drives them from
//! `tick` calls. [`SessionRunner`] feeds it real elapsed time from a tokio
//! interval and forwards user commands. Host failures degrade a channel to
//! silence; they never end a session.

pub mod audio;
pub mod config;
pub mod error;
pub mod narration;
pub mod paths;
pub mod sequencer;
pub mod session;
pub mod synth;
pub mod technique;

#[cfg(test)]
mod test_utils;

pub use config::BreathlineConfig;
pub use error::{BreathlineError, Result};
pub use narration::{NarrationOutcome, NarrationRequest, Narrator, VoiceProfile};
pub use sequencer::{PhaseSequencer, SequencerEvent};
pub use session::{
    SessionCommand, SessionConfig, SessionController, SessionEvent, SessionHandle, SessionRecord,
    SessionRunner, SessionState,
};
pub use synth::{AmbienceProfile, AmbienceSetting, AmbientSynth, PlayOutcome};
pub use technique::{CueId, Phase, Technique, TechniqueCatalog};
