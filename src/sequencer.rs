//! Tick-driven phase sequencer.
//!
//! [`PhaseSequencer`] is a pure state machine: it owns no timers and
//! performs no I/O. A host tick source calls [`PhaseSequencer::tick`] with
//! the elapsed wall-clock delta and receives the [`SequencerEvent`]s that
//! delta produced, in order.

use crate::technique::{CueId, Phase, Technique};
use tracing::{debug, warn};

/// Tolerance applied to boundary and completion comparisons so that
/// fractional tick sums (ten ticks of 0.1 s) land on the boundary.
pub const TIME_EPSILON: f64 = 1e-9;

/// Session length used when `configure` is handed a non-positive or
/// non-finite duration.
pub const FALLBACK_DURATION_SECS: f64 = 60.0;

/// Mutable sequencer counters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SequencerState {
    /// Index of the current phase, always `< phases.len()`.
    pub phase_index: usize,
    /// Seconds spent in the current phase.
    pub phase_elapsed_secs: f64,
    /// Seconds spent in the session while running.
    pub total_elapsed_secs: f64,
    /// Whether ticks currently advance the counters.
    pub running: bool,
}

/// Events raised by [`PhaseSequencer::tick`].
#[derive(Debug, Clone, PartialEq)]
pub enum SequencerEvent {
    /// A new phase began. Carries the incoming phase.
    PhaseEntered {
        index: usize,
        name: String,
        cue: Option<CueId>,
    },
    /// The configured session length has elapsed. Raised once.
    SessionComplete { total_elapsed_secs: f64 },
}

/// Cyclic phase state machine for one technique.
#[derive(Debug, Clone, Default)]
pub struct PhaseSequencer {
    technique: Option<Technique>,
    total_duration_secs: f64,
    state: SequencerState,
    cycles_completed: u32,
    complete: bool,
}

impl PhaseSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a technique and session length, resetting all counters.
    pub fn configure(&mut self, technique: Technique, total_duration_secs: f64) {
        let total = if total_duration_secs.is_finite() && total_duration_secs > 0.0 {
            total_duration_secs
        } else {
            warn!(
                "invalid session duration {total_duration_secs}, using {FALLBACK_DURATION_SECS}s"
            );
            FALLBACK_DURATION_SECS
        };
        debug!(
            "sequencer configured: technique={}, total={total}s",
            technique.id()
        );
        self.technique = Some(technique);
        self.total_duration_secs = total;
        self.reset();
    }

    /// Zero the counters without forgetting the technique.
    pub fn reset(&mut self) {
        self.state = SequencerState::default();
        self.cycles_completed = 0;
        self.complete = false;
    }

    /// Let ticks advance the counters. Elapsed time is kept, so this also
    /// resumes a paused sequence.
    ///
    /// Returns `false` if nothing is configured or the session already
    /// completed.
    pub fn start(&mut self) -> bool {
        if self.technique.is_none() || self.complete {
            return false;
        }
        self.state.running = true;
        true
    }

    /// Stop advancing. Counters are kept for reporting.
    pub fn stop(&mut self) {
        self.state.running = false;
    }

    /// Advance by `delta_secs` of running time.
    ///
    /// A delta may cross several phase boundaries; one `PhaseEntered` is
    /// raised per boundary, in order, before any `SessionComplete`.
    /// Only the part of the delta that fits before the session end is
    /// applied. Non-positive or non-finite deltas are ignored.
    pub fn tick(&mut self, delta_secs: f64) -> Vec<SequencerEvent> {
        let mut events = Vec::new();
        if !self.state.running || !delta_secs.is_finite() || delta_secs <= 0.0 {
            return events;
        }
        let Some(technique) = self.technique.as_ref() else {
            return events;
        };

        let applied = delta_secs.min(self.remaining_secs());
        self.state.phase_elapsed_secs += applied;
        self.state.total_elapsed_secs += applied;

        loop {
            let current = technique.phase(self.state.phase_index);
            if self.state.phase_elapsed_secs + TIME_EPSILON < current.duration_secs() {
                break;
            }
            self.state.phase_elapsed_secs =
                (self.state.phase_elapsed_secs - current.duration_secs()).max(0.0);
            self.state.phase_index = (self.state.phase_index + 1) % technique.phases().len();
            if self.state.phase_index == 0 {
                self.cycles_completed += 1;
            }
            let entered = technique.phase(self.state.phase_index);
            events.push(SequencerEvent::PhaseEntered {
                index: self.state.phase_index,
                name: entered.name().to_owned(),
                cue: entered.cue(),
            });
        }

        if self.state.total_elapsed_secs + TIME_EPSILON >= self.total_duration_secs {
            self.state.running = false;
            self.complete = true;
            events.push(SequencerEvent::SessionComplete {
                total_elapsed_secs: self.state.total_elapsed_secs,
            });
        }

        events
    }

    /// Whole-session progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.total_duration_secs <= 0.0 {
            return 0.0;
        }
        (self.state.total_elapsed_secs / self.total_duration_secs).clamp(0.0, 1.0)
    }

    /// Progress through the current phase in `[0, 1]`.
    pub fn phase_progress(&self) -> f64 {
        match self.current_phase() {
            Some(phase) => (self.state.phase_elapsed_secs / phase.duration_secs()).clamp(0.0, 1.0),
            None => 0.0,
        }
    }

    /// Seconds left in the current phase.
    pub fn phase_remaining_secs(&self) -> f64 {
        self.current_phase()
            .map(|p| (p.duration_secs() - self.state.phase_elapsed_secs).max(0.0))
            .unwrap_or(0.0)
    }

    /// Seconds left in the session.
    pub fn remaining_secs(&self) -> f64 {
        (self.total_duration_secs - self.state.total_elapsed_secs).max(0.0)
    }

    pub fn current_phase(&self) -> Option<&Phase> {
        self.technique
            .as_ref()
            .map(|t| t.phase(self.state.phase_index))
    }

    pub fn technique(&self) -> Option<&Technique> {
        self.technique.as_ref()
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.total_duration_secs
    }

    /// Number of times the sequence wrapped back to its first phase.
    pub fn cycles_completed(&self) -> u32 {
        self.cycles_completed
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}
