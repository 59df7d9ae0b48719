//! Offline rendering to WAV.

use super::SampleSource;
use crate::error::{BreathlineError, Result};
use std::path::Path;

/// Pull `len` samples from `source`.
pub fn render_to_vec(source: &mut dyn SampleSource, len: usize) -> Vec<f32> {
    let mut out = vec![0.0; len];
    source.fill(&mut out);
    out
}

/// Write mono samples as 16-bit PCM WAV, clamping to `[-1, 1]`.
///
/// # Errors
///
/// Returns [`BreathlineError::Audio`] if the file cannot be written.
pub fn write_wav_mono(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| BreathlineError::Audio(format!("failed to create wav writer: {e}")))?;

    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer
            .write_sample(v)
            .map_err(|e| BreathlineError::Audio(format!("failed to write wav sample: {e}")))?;
    }
    writer
        .finalize()
        .map_err(|e| BreathlineError::Audio(format!("failed to finalize wav: {e}")))?;
    Ok(())
}
