//! Voice profiles and host-voice selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default speaking rate relative to the host's normal rate.
pub const DEFAULT_RATE: f32 = 0.95;

const FEMININE_HINTS: &[&str] = &["female", "sonia", "serena", "libby", "kate", "emma"];
const MASCULINE_HINTS: &[&str] = &["male", "daniel", "george", "arthur", "ryan", "brian"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Female,
    #[default]
    Male,
}

impl VoiceGender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Female => "female",
            Self::Male => "male",
        }
    }

    fn hints(self) -> &'static [&'static str] {
        match self {
            Self::Female => FEMININE_HINTS,
            Self::Male => MASCULINE_HINTS,
        }
    }

    /// Whether a host voice name suggests this gender.
    pub fn matches_name(self, name: &str) -> bool {
        let name = name.to_lowercase();
        if self == Self::Male && name.contains("female") {
            return false;
        }
        self.hints().iter().any(|hint| name.contains(hint))
    }

    /// Synthesis pitch multiplier. Simulated voices are pushed further to
    /// approximate the missing gender.
    pub fn pitch(self, simulated: bool) -> f32 {
        match (self, simulated) {
            (Self::Female, true) => 1.20,
            (Self::Female, false) => 1.06,
            (Self::Male, true) => 0.86,
            (Self::Male, false) => 0.92,
        }
    }
}

impl FromStr for VoiceGender {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "female" | "f" | "woman" => Ok(Self::Female),
            "male" | "m" | "man" => Ok(Self::Male),
            _ => Err(()),
        }
    }
}

/// Requested narration voice: gender by locale.
///
/// Serialized as a single tag such as `en-GB-female`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct VoiceProfile {
    pub gender: VoiceGender,
    /// BCP-47 style tag, e.g. `en-GB`.
    pub locale: String,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self::new(VoiceGender::Male, "en-GB")
    }
}

impl VoiceProfile {
    pub fn new(gender: VoiceGender, locale: impl Into<String>) -> Self {
        Self {
            gender,
            locale: normalize_locale(&locale.into()),
        }
    }

    /// Parse a profile tag, falling back to the default for unknown input.
    ///
    /// Accepts `female`, `male`, `uk-male`, `british-female`, or
    /// `<locale>-<gender>` such as `en-US-female`.
    pub fn parse_lossy(tag: &str) -> Self {
        let tag = tag.trim();
        let lower = tag.to_ascii_lowercase();
        if let Ok(gender) = lower.parse::<VoiceGender>() {
            return Self::new(gender, "en-GB");
        }
        let Some((prefix, gender)) = lower.rsplit_once('-') else {
            return Self::default();
        };
        let Ok(gender) = gender.parse::<VoiceGender>() else {
            return Self::default();
        };
        match prefix {
            "uk" | "british" | "gb" => Self::new(gender, "en-GB"),
            "us" | "american" => Self::new(gender, "en-US"),
            _ if is_locale_tag(prefix) => Self::new(gender, prefix),
            _ => Self::default(),
        }
    }

    /// Language subtag, e.g. `en` for `en-GB`.
    pub fn language(&self) -> &str {
        language_of(&self.locale)
    }

    /// Directory name used for pre-recorded cues, e.g. `en-GB-female`.
    pub fn cue_dir_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for VoiceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.locale, self.gender.as_str())
    }
}

impl From<String> for VoiceProfile {
    fn from(tag: String) -> Self {
        Self::parse_lossy(&tag)
    }
}

impl From<VoiceProfile> for String {
    fn from(profile: VoiceProfile) -> Self {
        profile.to_string()
    }
}

fn is_locale_tag(tag: &str) -> bool {
    let mut parts = tag.split('-');
    let lang_ok = parts
        .next()
        .is_some_and(|l| (2..=3).contains(&l.len()) && l.chars().all(|c| c.is_ascii_alphabetic()));
    lang_ok && parts.all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// `en_gb` / `EN-gb` → `en-GB`.
pub fn normalize_locale(locale: &str) -> String {
    let mut parts = locale.trim().split(['-', '_']);
    let mut out = parts.next().unwrap_or_default().to_ascii_lowercase();
    for part in parts {
        out.push('-');
        if part.len() == 2 {
            out.push_str(&part.to_ascii_uppercase());
        } else {
            out.push_str(part);
        }
    }
    out
}

fn language_of(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(locale)
}

/// A voice offered by the host speech service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    /// Identifier passed back to the service when speaking.
    pub id: String,
    /// Human-readable name, used for gender hints.
    pub name: String,
    /// Locale tag as reported by the host.
    pub lang: String,
}

impl VoiceInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lang: lang.into(),
        }
    }

    fn locale_matches(&self, locale: &str) -> bool {
        normalize_locale(&self.lang).eq_ignore_ascii_case(locale)
    }

    fn language_matches(&self, language: &str) -> bool {
        language_of(&self.lang).eq_ignore_ascii_case(language)
    }
}

/// The chosen host voice and how to drive it.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceChoice {
    pub voice: VoiceInfo,
    /// The voice's gender is approximated by pitch rather than native.
    pub simulated: bool,
    pub pitch: f32,
}

/// Pick a host voice for `profile`.
///
/// Preference order: locale match with a gender hint; first locale match
/// (simulated); same-language match with a hint; first same-language voice
/// (simulated); any voice (simulated). Returns `None` only for an empty
/// list.
pub fn select_voice(voices: &[VoiceInfo], profile: &VoiceProfile) -> Option<VoiceChoice> {
    let gender = profile.gender;
    let choose = |voice: &VoiceInfo, simulated: bool| VoiceChoice {
        voice: voice.clone(),
        simulated,
        pitch: gender.pitch(simulated),
    };

    let in_locale: Vec<&VoiceInfo> = voices
        .iter()
        .filter(|v| v.locale_matches(&profile.locale))
        .collect();
    if let Some(v) = in_locale.iter().find(|v| gender.matches_name(&v.name)) {
        return Some(choose(v, false));
    }
    if let Some(v) = in_locale.first() {
        return Some(choose(v, true));
    }

    let in_language: Vec<&VoiceInfo> = voices
        .iter()
        .filter(|v| v.language_matches(profile.language()))
        .collect();
    if let Some(v) = in_language.iter().find(|v| gender.matches_name(&v.name)) {
        return Some(choose(v, false));
    }
    if let Some(v) = in_language.first() {
        return Some(choose(v, true));
    }

    voices.first().map(|v| choose(v, true))
}
