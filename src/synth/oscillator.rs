//! Phase-accumulator tone generators.

use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
}

/// Continuous oscillator with unit amplitude.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    /// Normalized phase in `[0, 1)`.
    phase: f32,
    increment: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform, freq_hz: f32, sample_rate: u32) -> Self {
        let increment = if sample_rate == 0 || !freq_hz.is_finite() {
            0.0
        } else {
            (freq_hz / sample_rate as f32).clamp(0.0, 0.5)
        };
        Self {
            waveform,
            phase: 0.0,
            increment,
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        let value = match self.waveform {
            Waveform::Sine => (self.phase * TAU).sin(),
            Waveform::Triangle => 1.0 - 4.0 * (self.phase - 0.5).abs(),
        };
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        value
    }
}
