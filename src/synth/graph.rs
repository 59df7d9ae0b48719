//! Signal graph rendered for one ambience profile.

use super::noise::generate_noise_buffer;
use super::oscillator::{Oscillator, Waveform};
use super::profile::{FilterKind, FilterStage, Recipe};
use crate::audio::SampleSource;
use biquad::{Biquad, Coefficients, DirectForm2Transposed, Hertz, Q_BUTTERWORTH_F32, Type};
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::warn;

/// Filter cutoffs are kept below this fraction of the sample rate.
const MAX_CUTOFF_RATIO: f32 = 0.45;

/// Swell depth around the layer gain: `gain * (1 - depth/2 + depth/2 * lfo)`.
const SWELL_DEPTH: f32 = 0.7;

/// Live master gain shared between the synthesizer and the render thread.
#[derive(Debug, Clone)]
pub struct MasterGain(Arc<AtomicU32>);

impl MasterGain {
    pub fn new(gain: f32) -> Self {
        Self(Arc::new(AtomicU32::new(gain.to_bits())))
    }

    pub fn set(&self, gain: f32) {
        self.0.store(gain.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

struct NoiseVoice {
    buffer: Vec<f32>,
    position: usize,
    filter: Option<DirectForm2Transposed<f32>>,
    gain: f32,
    swell: Option<Oscillator>,
}

impl NoiseVoice {
    fn next_sample(&mut self) -> f32 {
        if self.buffer.is_empty() {
            return 0.0;
        }
        let raw = self.buffer[self.position];
        self.position = (self.position + 1) % self.buffer.len();
        let shaped = match self.filter.as_mut() {
            Some(f) => f.run(raw),
            None => raw,
        };
        let gain = match self.swell.as_mut() {
            Some(lfo) => {
                self.gain * (1.0 - SWELL_DEPTH / 2.0 + SWELL_DEPTH / 2.0 * lfo.next_sample())
            }
            None => self.gain,
        };
        shaped * gain
    }
}

/// Summed tone bank plus an optional looped noise layer, scaled by the
/// master gain and hard-limited to `[-1, 1]`.
pub struct SignalGraph {
    tones: Vec<(Oscillator, f32)>,
    noise: Option<NoiseVoice>,
    master: MasterGain,
}

impl SignalGraph {
    /// Build a graph for `recipe`. The noise buffer is generated here, once.
    pub fn build<R: Rng>(
        recipe: &Recipe,
        sample_rate: u32,
        noise_buffer_secs: f32,
        master: MasterGain,
        rng: &mut R,
    ) -> Self {
        let tones = recipe
            .tones
            .iter()
            .map(|t| (Oscillator::new(t.waveform, t.freq_hz, sample_rate), t.gain))
            .collect();

        let noise = recipe.noise.map(|layer| {
            let len = (sample_rate as f32 * noise_buffer_secs.max(0.1)) as usize;
            NoiseVoice {
                buffer: generate_noise_buffer(layer.color, len, rng),
                position: 0,
                filter: build_filter(&layer.filter, sample_rate),
                gain: layer.gain,
                swell: layer
                    .swell_hz
                    .map(|hz| Oscillator::new(Waveform::Sine, hz, sample_rate)),
            }
        });

        Self {
            tones,
            noise,
            master,
        }
    }

    pub fn tone_count(&self) -> usize {
        self.tones.len()
    }

    pub fn has_noise(&self) -> bool {
        self.noise.is_some()
    }
}

impl SampleSource for SignalGraph {
    fn fill(&mut self, out: &mut [f32]) {
        let master = self.master.get();
        for sample in out.iter_mut() {
            let mut sum = 0.0;
            for (osc, gain) in self.tones.iter_mut() {
                sum += osc.next_sample() * *gain;
            }
            if let Some(noise) = self.noise.as_mut() {
                sum += noise.next_sample();
            }
            *sample = (sum * master).clamp(-1.0, 1.0);
        }
    }
}

fn build_filter(stage: &FilterStage, sample_rate: u32) -> Option<DirectForm2Transposed<f32>> {
    let fs = sample_rate as f32;
    let cutoff = stage.cutoff_hz.min(fs * MAX_CUTOFF_RATIO);
    let kind = match stage.kind {
        FilterKind::LowPass => Type::LowPass,
        FilterKind::HighPass => Type::HighPass,
        FilterKind::BandPass => Type::BandPass,
    };
    let q = stage.q.unwrap_or(Q_BUTTERWORTH_F32);

    let coeffs = Hertz::<f32>::from_hz(fs).and_then(|fs| {
        Hertz::<f32>::from_hz(cutoff)
            .and_then(|f0| Coefficients::<f32>::from_params(kind, fs, f0, q))
    });
    match coeffs {
        Ok(c) => Some(DirectForm2Transposed::<f32>::new(c)),
        Err(e) => {
            warn!(
                "cannot build {:?} filter at {cutoff}Hz (fs={fs}): {e:?}, passing noise unfiltered",
                stage.kind
            );
            None
        }
    }
}
