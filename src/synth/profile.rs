//! Ambience profiles and their synthesis recipes.

use super::noise::NoiseColor;
use super::oscillator::Waveform;
use crate::error::BreathlineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Closed set of procedural soundscapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbienceProfile {
    /// Silence.
    None,
    #[default]
    Cosmic,
    Rain,
    Birds,
    Ocean,
    Forest,
    Tibetan,
    Meditation,
    Spiritual,
}

impl AmbienceProfile {
    pub const ALL: [AmbienceProfile; 9] = [
        AmbienceProfile::None,
        AmbienceProfile::Cosmic,
        AmbienceProfile::Rain,
        AmbienceProfile::Birds,
        AmbienceProfile::Ocean,
        AmbienceProfile::Forest,
        AmbienceProfile::Tibetan,
        AmbienceProfile::Meditation,
        AmbienceProfile::Spiritual,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Cosmic => "cosmic",
            Self::Rain => "rain",
            Self::Birds => "birds",
            Self::Ocean => "ocean",
            Self::Forest => "forest",
            Self::Tibetan => "tibetan",
            Self::Meditation => "meditation",
            Self::Spiritual => "spiritual",
        }
    }

    /// Parse a tag, falling back to [`AmbienceProfile::None`] for anything
    /// outside the closed set.
    pub fn parse_lossy(tag: &str) -> Self {
        tag.parse().unwrap_or_else(|_| {
            warn!("unknown ambience '{tag}', using none");
            Self::None
        })
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }

    /// Deterministic recipe for this profile. `None` has no recipe.
    pub fn recipe(self) -> Option<Recipe> {
        use FilterKind::{BandPass, HighPass, LowPass};
        use Waveform::{Sine, Triangle};

        let recipe = match self {
            Self::None => return None,
            Self::Cosmic => Recipe::drone(&[
                ToneLayer::new(60.0, 0.15, Sine),
                ToneLayer::new(90.0, 0.10, Sine),
                ToneLayer::new(120.0, 0.08, Triangle),
                ToneLayer::new(180.0, 0.05, Sine),
            ]),
            Self::Tibetan => Recipe::drone(&[
                ToneLayer::new(174.0, 0.12, Sine),
                ToneLayer::new(285.0, 0.10, Sine),
                ToneLayer::new(396.0, 0.08, Sine),
                ToneLayer::new(528.0, 0.06, Sine),
                ToneLayer::new(639.0, 0.04, Triangle),
            ]),
            // 100/104 Hz beat at 4 Hz for a slow shimmer.
            Self::Meditation => Recipe::drone(&[
                ToneLayer::new(100.0, 0.15, Sine),
                ToneLayer::new(104.0, 0.15, Sine),
                ToneLayer::new(200.0, 0.08, Sine),
                ToneLayer::new(300.0, 0.05, Triangle),
            ]),
            Self::Spiritual => Recipe::drone(&[
                ToneLayer::new(256.0, 0.10, Sine),
                ToneLayer::new(384.0, 0.08, Sine),
                ToneLayer::new(512.0, 0.06, Sine),
                ToneLayer::new(768.0, 0.04, Triangle),
            ])
            .with_noise(NoiseLayer::new(
                NoiseColor::White,
                FilterStage::new(HighPass, 8000.0),
                0.02,
            )),
            Self::Rain => Recipe::noise(NoiseLayer::new(
                NoiseColor::Pink,
                FilterStage::new(LowPass, 3000.0),
                0.4,
            )),
            Self::Ocean => Recipe::noise(
                NoiseLayer::new(NoiseColor::Brown, FilterStage::new(LowPass, 800.0), 0.5)
                    .with_swell(0.1),
            ),
            Self::Forest => Recipe::noise(NoiseLayer::new(
                NoiseColor::Pink,
                FilterStage::new(BandPass, 1500.0).with_q(0.5),
                0.25,
            )),
            Self::Birds => Recipe::drone(&[
                ToneLayer::new(2000.0, 0.02, Sine),
                ToneLayer::new(2500.0, 0.015, Sine),
                ToneLayer::new(3000.0, 0.01, Triangle),
            ])
            .with_noise(NoiseLayer::new(
                NoiseColor::Pink,
                FilterStage::new(HighPass, 1000.0),
                0.1,
            )),
        };
        Some(recipe)
    }
}

impl fmt::Display for AmbienceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AmbienceProfile {
    type Err = BreathlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == tag)
            .ok_or_else(|| BreathlineError::Config(format!("unknown ambience profile '{s}'")))
    }
}

/// Clamp a volume into `[0, 1]`. NaN is treated as silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// A profile plus its master volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbienceSetting {
    pub profile: AmbienceProfile,
    pub volume: f32,
}

impl AmbienceSetting {
    pub fn new(profile: AmbienceProfile, volume: f32) -> Self {
        Self {
            profile,
            volume: clamp_volume(volume),
        }
    }

    pub fn silent() -> Self {
        Self::new(AmbienceProfile::None, 0.0)
    }
}

impl Default for AmbienceSetting {
    fn default() -> Self {
        Self::new(AmbienceProfile::default(), 0.2)
    }
}

/// One continuous tone generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneLayer {
    pub freq_hz: f32,
    pub gain: f32,
    pub waveform: Waveform,
}

impl ToneLayer {
    pub const fn new(freq_hz: f32, gain: f32, waveform: Waveform) -> Self {
        Self {
            freq_hz,
            gain,
            waveform,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    HighPass,
    BandPass,
}

/// Single filter stage applied to a noise layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterStage {
    pub kind: FilterKind,
    pub cutoff_hz: f32,
    /// `None` selects a Butterworth response.
    pub q: Option<f32>,
}

impl FilterStage {
    pub const fn new(kind: FilterKind, cutoff_hz: f32) -> Self {
        Self {
            kind,
            cutoff_hz,
            q: None,
        }
    }

    pub const fn with_q(mut self, q: f32) -> Self {
        self.q = Some(q);
        self
    }
}

/// Looped colored noise through one filter stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseLayer {
    pub color: NoiseColor,
    pub filter: FilterStage,
    pub gain: f32,
    /// Optional slow gain modulation rate in Hz.
    pub swell_hz: Option<f32>,
}

impl NoiseLayer {
    pub const fn new(color: NoiseColor, filter: FilterStage, gain: f32) -> Self {
        Self {
            color,
            filter,
            gain,
            swell_hz: None,
        }
    }

    pub const fn with_swell(mut self, hz: f32) -> Self {
        self.swell_hz = Some(hz);
        self
    }
}

/// Everything needed to build one signal graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub tones: Vec<ToneLayer>,
    pub noise: Option<NoiseLayer>,
}

impl Recipe {
    fn drone(tones: &[ToneLayer]) -> Self {
        Self {
            tones: tones.to_vec(),
            noise: None,
        }
    }

    fn noise(layer: NoiseLayer) -> Self {
        Self {
            tones: Vec::new(),
            noise: Some(layer),
        }
    }

    fn with_noise(mut self, layer: NoiseLayer) -> Self {
        self.noise = Some(layer);
        self
    }
}
