//! Colored noise generation.
//!
//! Pink noise uses Paul Kellet's refined 7-pole approximation. Every pole
//! sits strictly inside the unit circle, so the filter's impulse response is
//! absolutely summable; dividing by that L1 norm bounds the output to
//! `[-1, 1]` for any input in `[-1, 1]`, however long it runs. Brown noise is
//! a leaky integrator whose L1 norm is exactly 1.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Noise spectral color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseColor {
    White,
    Pink,
    Brown,
}

/// Peak level generated buffers are normalized to.
pub const BUFFER_PEAK: f32 = 0.9;

const PINK_POLES: [f32; 6] = [0.99886, 0.99332, 0.96900, 0.86650, 0.55000, -0.7616];
const PINK_GAINS: [f32; 6] = [0.0555179, 0.0750759, 0.1538520, 0.3104856, 0.5329522, -0.0168980];
const PINK_DELAYED_GAIN: f32 = 0.115926;
const PINK_DIRECT_GAIN: f32 = 0.5362;

/// Worst-case gain of the pink filter: sum of |h[n]| over all n.
pub fn pink_l1_norm() -> f32 {
    let poles: f32 = PINK_POLES
        .iter()
        .zip(PINK_GAINS.iter())
        .map(|(a, b)| b.abs() / (1.0 - a.abs()))
        .sum();
    poles + PINK_DELAYED_GAIN + PINK_DIRECT_GAIN
}

/// Stateful pink-noise shaping filter.
#[derive(Debug, Clone)]
pub struct PinkFilter {
    state: [f32; 6],
    delayed: f32,
    scale: f32,
}

impl Default for PinkFilter {
    fn default() -> Self {
        Self {
            state: [0.0; 6],
            delayed: 0.0,
            scale: 1.0 / pink_l1_norm(),
        }
    }
}

impl PinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shape one white sample in `[-1, 1]`.
    pub fn process(&mut self, white: f32) -> f32 {
        let mut sum = 0.0;
        for ((s, a), b) in self.state.iter_mut().zip(PINK_POLES).zip(PINK_GAINS) {
            *s = a * *s + b * white;
            sum += *s;
        }
        let out = sum + self.delayed + white * PINK_DIRECT_GAIN;
        self.delayed = white * PINK_DELAYED_GAIN;
        (out * self.scale).clamp(-1.0, 1.0)
    }
}

/// Leaky integrator producing brown (red) noise.
#[derive(Debug, Clone, Default)]
pub struct BrownFilter {
    last: f32,
}

impl BrownFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, white: f32) -> f32 {
        self.last = ((self.last + 0.02 * white) / 1.02).clamp(-1.0, 1.0);
        self.last
    }
}

/// Generate `len` samples of colored noise, peak-normalized to
/// [`BUFFER_PEAK`].
pub fn generate_noise_buffer<R: Rng>(color: NoiseColor, len: usize, rng: &mut R) -> Vec<f32> {
    let mut white = || rng.gen_range(-1.0f32..=1.0);
    let mut buffer: Vec<f32> = match color {
        NoiseColor::White => (0..len).map(|_| white() * 0.5).collect(),
        NoiseColor::Pink => {
            let mut pink = PinkFilter::new();
            (0..len).map(|_| pink.process(white())).collect()
        }
        NoiseColor::Brown => {
            let mut brown = BrownFilter::new();
            (0..len).map(|_| brown.process(white())).collect()
        }
    };
    normalize_peak(&mut buffer, BUFFER_PEAK);
    buffer
}

/// Scale `samples` so the largest magnitude equals `peak`. Silent buffers
/// are left alone.
pub fn normalize_peak(samples: &mut [f32], peak: f32) {
    let max = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if max > f32::EPSILON {
        let gain = peak / max;
        for s in samples.iter_mut() {
            *s *= gain;
        }
    }
}
