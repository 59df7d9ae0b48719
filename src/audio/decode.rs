//! Decoding and resampling for pre-recorded clips.

use super::SampleSource;
use crate::error::{BreathlineError, Result};
use std::path::Path;
use std::sync::Arc;

/// Decode an audio file (mp3 or wav) to mono f32 samples.
///
/// Returns the samples and their native sample rate. Multi-channel audio is
/// downmixed by averaging.
///
/// # Errors
///
/// Returns [`BreathlineError::Cue`] if the file cannot be probed or decoded.
pub fn decode_to_mono_f32(path: &Path) -> Result<(Vec<f32>, u32)> {
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::codecs::DecoderOptions;
    use symphonia::core::errors::Error as SymphError;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| BreathlineError::Cue(format!("failed to probe {}: {e}", path.display())))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| BreathlineError::Cue("no default audio track".into()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sr = codec_params
        .sample_rate
        .ok_or_else(|| BreathlineError::Cue("unknown sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| BreathlineError::Cue(format!("failed to create decoder: {e}")))?;

    let mut out: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(BreathlineError::Cue(format!("audio read error: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphError::DecodeError(_)) => continue,
            Err(e) => return Err(BreathlineError::Cue(format!("audio decode error: {e}"))),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let frames = decoded.frames() as u64;
        let required = usize::try_from(frames)
            .unwrap_or(usize::MAX)
            .saturating_mul(channels);

        let needs_new = sample_buf
            .as_ref()
            .map(|b| b.capacity() < required)
            .unwrap_or(true);
        if needs_new {
            sample_buf = Some(SampleBuffer::<f32>::new(frames, spec));
        } else if let Some(b) = sample_buf.as_mut() {
            b.clear();
        }

        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);
        let data = buf.samples();

        if channels <= 1 {
            out.extend_from_slice(data);
        } else {
            out.extend(
                data.chunks_exact(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        }
    }

    Ok((out, sr))
}

/// Linear-interpolation resampler.
///
/// Adequate for short spoken cues; no anti-alias filter is applied when
/// downsampling.
pub fn resample_linear(samples: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if src_rate == dst_rate || samples.is_empty() || src_rate == 0 || dst_rate == 0 {
        return samples.to_vec();
    }

    let ratio = src_rate as f64 / dst_rate as f64;
    let out_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < samples.len() {
            samples[idx] as f64 * (1.0 - frac) + samples[idx + 1] as f64 * frac
        } else {
            samples[idx.min(samples.len() - 1)] as f64
        };

        output.push(sample as f32);
    }

    output
}

/// One-shot playback of a decoded clip.
///
/// Shares the sample data so a cached clip can be replayed without copying.
pub struct ClipSource {
    samples: Arc<[f32]>,
    position: usize,
    gain: f32,
}

impl ClipSource {
    pub fn new(samples: Arc<[f32]>) -> Self {
        Self {
            samples,
            position: 0,
            gain: 1.0,
        }
    }

    #[must_use]
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain.clamp(0.0, 1.0);
        self
    }

    /// Rewind to the first sample.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl SampleSource for ClipSource {
    fn fill(&mut self, out: &mut [f32]) {
        let remaining = self.samples.len().saturating_sub(self.position);
        let n = remaining.min(out.len());
        for (dst, src) in out[..n]
            .iter_mut()
            .zip(&self.samples[self.position..self.position + n])
        {
            *dst = src * self.gain;
        }
        out[n..].fill(0.0);
        self.position += n;
    }

    fn is_finished(&self) -> bool {
        self.position >= self.samples.len()
    }
}
