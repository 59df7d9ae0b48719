//! Host audio subsystem seam.
//!
//! The engine never touches a device directly. Producers implement
//! [`SampleSource`] and are attached to an [`AudioOutput`], which pulls mono
//! samples from its render thread.

pub mod decode;
pub mod playback;
pub mod wav;

pub use decode::{ClipSource, decode_to_mono_f32, resample_linear};
pub use playback::CpalOutput;
pub use wav::{render_to_vec, write_wav_mono};

use crate::error::Result;

/// Mono sample producer pulled by an [`AudioOutput`].
pub trait SampleSource: Send {
    /// Overwrite `out` with the next `out.len()` samples.
    fn fill(&mut self, out: &mut [f32]);

    /// Finite sources report `true` once drained so the output can
    /// release them. Continuous sources never finish.
    fn is_finished(&self) -> bool {
        false
    }
}

/// A host output that renders at most one attached source.
pub trait AudioOutput: Send {
    /// Render rate in Hz. Sources must be built for this rate.
    fn sample_rate(&self) -> u32;

    /// Ask the host to start rendering.
    ///
    /// # Errors
    ///
    /// Fails when the host keeps the output suspended (for instance no
    /// audio permission yet). Attached sources stay attached.
    fn resume(&mut self) -> Result<()>;

    /// Replace the attached source.
    ///
    /// # Errors
    ///
    /// Returns an error if the output has shut down.
    fn attach(&mut self, source: Box<dyn SampleSource>) -> Result<()>;

    /// Drop the attached source, if any. Idempotent.
    fn detach(&mut self);

    /// Whether a source is currently attached.
    fn is_attached(&self) -> bool;
}

/// Output used when no device is available. Sources are held but never
/// rendered.
#[derive(Default)]
pub struct NullOutput {
    sample_rate: u32,
    source: Option<Box<dyn SampleSource>>,
}

impl NullOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            source: None,
        }
    }
}

impl AudioOutput for NullOutput {
    fn sample_rate(&self) -> u32 {
        if self.sample_rate == 0 {
            DEFAULT_SAMPLE_RATE
        } else {
            self.sample_rate
        }
    }

    fn resume(&mut self) -> Result<()> {
        Ok(())
    }

    fn attach(&mut self, source: Box<dyn SampleSource>) -> Result<()> {
        self.source = Some(source);
        Ok(())
    }

    fn detach(&mut self) {
        self.source = None;
    }

    fn is_attached(&self) -> bool {
        self.source.is_some()
    }
}

/// Rate used when neither a device nor a config supplies one.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Open the configured device, or a [`NullOutput`] if that fails.
///
/// Missing audio is never fatal to a session.
pub fn open_output_or_null(config: &crate::config::AudioConfig) -> Box<dyn AudioOutput> {
    match CpalOutput::open(config) {
        Ok(output) => Box::new(output),
        Err(e) => {
            tracing::warn!("audio output unavailable, continuing silent: {e}");
            Box::new(NullOutput::new(DEFAULT_SAMPLE_RATE))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    struct Constant(f32);

    impl SampleSource for Constant {
        fn fill(&mut self, out: &mut [f32]) {
            out.fill(self.0);
        }
    }

    #[test]
    fn null_output_tracks_attachment() {
        let mut out = NullOutput::new(44_100);
        assert_eq!(out.sample_rate(), 44_100);
        assert!(!out.is_attached());
        out.attach(Box::new(Constant(0.5))).unwrap();
        assert!(out.is_attached());
        out.detach();
        out.detach();
        assert!(!out.is_attached());
        assert!(out.resume().is_ok());
    }

    #[test]
    fn null_output_default_rate() {
        assert_eq!(NullOutput::default().sample_rate(), DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn continuous_sources_never_finish() {
        let mut c = Constant(0.1);
        let mut buf = [0.0; 4];
        c.fill(&mut buf);
        assert_eq!(buf, [0.1; 4]);
        assert!(!c.is_finished());
    }
}
