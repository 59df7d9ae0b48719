//! Breathing technique catalog.
//!
//! A [`Technique`] is an ordered, cyclic list of [`Phase`]s. Techniques are
//! immutable once built; the built-in set is created once per process by
//! [`TechniqueCatalog::builtin`].

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Pre-recorded narration cue attached to a phase.
///
/// This is the closed set of recordings the cue fallback knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueId {
    Inhale,
    Hold,
    Exhale,
}

impl CueId {
    /// All cue identifiers, in breathing order.
    pub const ALL: [CueId; 3] = [CueId::Inhale, CueId::Hold, CueId::Exhale];

    /// File stem used by the cue library (`inhale`, `hold`, `exhale`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inhale => "inhale",
            Self::Hold => "hold",
            Self::Exhale => "exhale",
        }
    }

    /// Infer a cue from a phase label such as `"Inhale"`, `"Breathe out"`
    /// or `"Hold (empty)"`.
    ///
    /// Used when a phase is authored; narration itself never guesses.
    pub fn infer(label: &str) -> Option<Self> {
        let lower = label.to_lowercase();
        if lower.contains("inhale") || lower.contains("breathe in") {
            Some(Self::Inhale)
        } else if lower.contains("exhale") || lower.contains("breathe out") {
            Some(Self::Exhale)
        } else if lower.contains("hold") || lower.contains("pause") || lower.contains("rest") {
            Some(Self::Hold)
        } else {
            None
        }
    }
}

/// A named, fixed-duration segment of a technique.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    name: String,
    duration_secs: f64,
    cue: Option<CueId>,
}

impl Phase {
    /// Create a phase, deriving its cue from the name.
    pub fn new(name: impl Into<String>, duration_secs: f64) -> Self {
        let name = name.into();
        let cue = CueId::infer(&name);
        Self {
            name,
            duration_secs,
            cue,
        }
    }

    /// Create a phase with an explicit cue (or none).
    pub fn with_cue(name: impl Into<String>, duration_secs: f64, cue: Option<CueId>) -> Self {
        Self {
            name: name.into(),
            duration_secs,
            cue,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn cue(&self) -> Option<CueId> {
        self.cue
    }
}

/// An ordered, cyclic breathing pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Technique {
    id: String,
    display_name: String,
    description: String,
    phases: Vec<Phase>,
    cycle_duration: f64,
}

impl Technique {
    /// Build a technique.
    ///
    /// Returns `None` if `phases` is empty or any duration is not a finite
    /// positive number.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        phases: Vec<Phase>,
    ) -> Option<Self> {
        if phases.is_empty() {
            return None;
        }
        if phases
            .iter()
            .any(|p| !p.duration_secs.is_finite() || p.duration_secs <= 0.0)
        {
            return None;
        }
        let cycle_duration = phases.iter().map(|p| p.duration_secs).sum();
        Some(Self {
            id: id.into(),
            display_name: display_name.into(),
            description: String::new(),
            phases,
            cycle_duration,
        })
    }

    /// Attach a short human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Build an inhale / hold / exhale / hold pattern, dropping zero-length
    /// phases (4-0-6-0 yields Inhale then Exhale).
    ///
    /// Returns `None` if every duration is zero or any is negative or
    /// non-finite.
    pub fn custom(inhale: f64, hold1: f64, exhale: f64, hold2: f64) -> Option<Self> {
        let parts = [
            ("Inhale", inhale, CueId::Inhale),
            ("Hold", hold1, CueId::Hold),
            ("Exhale", exhale, CueId::Exhale),
            ("Hold", hold2, CueId::Hold),
        ];
        if parts.iter().any(|(_, d, _)| !d.is_finite() || *d < 0.0) {
            return None;
        }
        let phases: Vec<Phase> = parts
            .iter()
            .filter(|(_, d, _)| *d > 0.0)
            .map(|(name, d, cue)| Phase::with_cue(*name, *d, Some(*cue)))
            .collect();
        let label = [inhale, hold1, exhale, hold2]
            .iter()
            .map(|d| format_seconds(*d))
            .collect::<Vec<_>>()
            .join("-");
        Self::new("custom", format!("Custom {label}"), phases)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Phase at `index`, wrapping around the cycle.
    pub fn phase(&self, index: usize) -> &Phase {
        &self.phases[index % self.phases.len()]
    }

    /// Sum of all phase durations. Always positive.
    pub fn cycle_duration(&self) -> f64 {
        self.cycle_duration
    }

    /// Durations joined with `-`, e.g. `"4-7-8"`.
    pub fn pattern(&self) -> String {
        self.phases
            .iter()
            .map(|p| format_seconds(p.duration_secs))
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Number of whole cycles that fit in `total_secs`.
    pub fn planned_cycles(&self, total_secs: f64) -> u32 {
        if !total_secs.is_finite() || total_secs <= 0.0 {
            return 0;
        }
        (total_secs / self.cycle_duration).floor() as u32
    }
}

fn format_seconds(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{}", secs as i64)
    } else {
        format!("{secs}")
    }
}

/// The fixed set of techniques offered to the user.
#[derive(Debug, Clone)]
pub struct TechniqueCatalog {
    techniques: Vec<Technique>,
}

impl TechniqueCatalog {
    /// Build a catalog from a non-empty list. The first entry is the
    /// fallback for unknown ids.
    pub fn new(techniques: Vec<Technique>) -> Option<Self> {
        if techniques.is_empty() {
            return None;
        }
        Some(Self { techniques })
    }

    /// The built-in techniques: box, 4-7-8, coherent and SOS.
    pub fn builtin() -> Self {
        let techniques = [
            Technique::new(
                "box",
                "Box Breathing",
                vec![
                    Phase::with_cue("Inhale", 4.0, Some(CueId::Inhale)),
                    Phase::with_cue("Hold", 4.0, Some(CueId::Hold)),
                    Phase::with_cue("Exhale", 4.0, Some(CueId::Exhale)),
                    Phase::with_cue("Hold", 4.0, Some(CueId::Hold)),
                ],
            )
            .map(|t| {
                t.with_description("Equal 4-4-4-4 timing for all phases. Good for focus and calm.")
            }),
            Technique::new(
                "4-7-8",
                "4-7-8 Breathing",
                vec![
                    Phase::with_cue("Inhale", 4.0, Some(CueId::Inhale)),
                    Phase::with_cue("Hold", 7.0, Some(CueId::Hold)),
                    Phase::with_cue("Exhale", 8.0, Some(CueId::Exhale)),
                ],
            )
            .map(|t| t.with_description("Extended hold and exhale for deep relaxation.")),
            Technique::new(
                "coherent",
                "Coherent 5-5",
                vec![
                    Phase::with_cue("Inhale", 5.0, Some(CueId::Inhale)),
                    Phase::with_cue("Exhale", 5.0, Some(CueId::Exhale)),
                ],
            )
            .map(|t| t.with_description("Even inhale and exhale at about six breaths a minute.")),
            Technique::new(
                "sos",
                "SOS 60s Reset",
                vec![
                    Phase::with_cue("Inhale", 4.0, Some(CueId::Inhale)),
                    Phase::with_cue("Exhale", 6.0, Some(CueId::Exhale)),
                ],
            )
            .map(|t| t.with_description("Longer exhale for quick calm during transitions.")),
        ];
        Self {
            techniques: techniques.into_iter().flatten().collect(),
        }
    }

    /// Look up a technique by id. Accepts the short aliases `478` and
    /// `box-breathing`.
    pub fn get(&self, id: &str) -> Option<&Technique> {
        let id = normalize_id(id);
        self.techniques.iter().find(|t| t.id == id)
    }

    /// Look up a technique, falling back to the first one for unknown ids.
    pub fn resolve(&self, id: &str) -> &Technique {
        match self.get(id) {
            Some(t) => t,
            None => {
                let fallback = self.default_technique();
                warn!(
                    "unknown technique '{id}', falling back to '{}'",
                    fallback.id
                );
                fallback
            }
        }
    }

    /// The first technique in the catalog.
    pub fn default_technique(&self) -> &Technique {
        &self.techniques[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Technique> {
        self.techniques.iter()
    }

    pub fn len(&self) -> usize {
        self.techniques.len()
    }

    pub fn is_empty(&self) -> bool {
        self.techniques.is_empty()
    }
}

impl Default for TechniqueCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize_id(id: &str) -> String {
    let id = id.trim().to_lowercase();
    match id.as_str() {
        "478" => "4-7-8".to_owned(),
        "box-breathing" => "box".to_owned(),
        _ => id,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn builtin_catalog_order_and_cycles() {
        let catalog = TechniqueCatalog::builtin();
        let ids: Vec<&str> = catalog.iter().map(Technique::id).collect();
        assert_eq!(ids, ["box", "4-7-8", "coherent", "sos"]);

        for technique in catalog.iter() {
            let sum: f64 = technique.phases().iter().map(Phase::duration_secs).sum();
            assert!((sum - technique.cycle_duration()).abs() < f64::EPSILON);
            assert!(technique.cycle_duration() > 0.0);
        }
        assert_eq!(catalog.get("4-7-8").unwrap().cycle_duration(), 19.0);
    }

    #[test]
    fn every_builtin_phase_has_a_cue() {
        let catalog = TechniqueCatalog::builtin();
        for technique in catalog.iter() {
            for phase in technique.phases() {
                assert!(phase.cue().is_some(), "{} has no cue", phase.name());
            }
        }
    }

    #[test]
    fn unknown_id_resolves_to_first_technique() {
        let catalog = TechniqueCatalog::builtin();
        assert_eq!(catalog.resolve("does-not-exist").id(), "box");
        assert_eq!(catalog.resolve("478").id(), "4-7-8");
        assert_eq!(catalog.resolve(" Box-Breathing ").id(), "box");
    }

    #[test]
    fn technique_rejects_empty_or_non_positive_phases() {
        assert!(Technique::new("x", "X", vec![]).is_none());
        assert!(Technique::new("x", "X", vec![Phase::new("Inhale", 0.0)]).is_none());
        assert!(Technique::new("x", "X", vec![Phase::new("Inhale", -1.0)]).is_none());
        assert!(Technique::new("x", "X", vec![Phase::new("Inhale", f64::NAN)]).is_none());
    }

    #[test]
    fn custom_technique_drops_zero_phases() {
        let t = Technique::custom(4.0, 0.0, 6.0, 0.0).unwrap();
        let names: Vec<&str> = t.phases().iter().map(Phase::name).collect();
        assert_eq!(names, ["Inhale", "Exhale"]);
        assert_eq!(t.pattern(), "4-6");
        assert_eq!(t.display_name(), "Custom 4-0-6-0");
        assert!(Technique::custom(0.0, 0.0, 0.0, 0.0).is_none());
        assert!(Technique::custom(4.0, -1.0, 4.0, 0.0).is_none());
    }

    #[test]
    fn pattern_and_planned_cycles() {
        let catalog = TechniqueCatalog::builtin();
        let t = catalog.get("4-7-8").unwrap();
        assert_eq!(t.pattern(), "4-7-8");
        assert_eq!(t.planned_cycles(60.0), 3);
        assert_eq!(t.planned_cycles(0.0), 0);
        let half = Technique::new("h", "H", vec![Phase::new("Inhale", 2.5)]).unwrap();
        assert_eq!(half.pattern(), "2.5");
    }

    #[test]
    fn cue_inference_covers_common_labels() {
        assert_eq!(CueId::infer("Inhale"), Some(CueId::Inhale));
        assert_eq!(CueId::infer("Breathe in"), Some(CueId::Inhale));
        assert_eq!(CueId::infer("Breathe out"), Some(CueId::Exhale));
        assert_eq!(CueId::infer("Hold (empty)"), Some(CueId::Hold));
        assert_eq!(CueId::infer("Sigh"), None);
    }

    #[test]
    fn phase_wraps_around() {
        let catalog = TechniqueCatalog::builtin();
        let t = catalog.get("coherent").unwrap();
        assert_eq!(t.phase(2).name(), "Inhale");
        assert_eq!(t.phase(3).name(), "Exhale");
    }
}
