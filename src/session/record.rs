//! Completed-session summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Summary emitted once per session that made progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub technique_id: String,
    /// Elapsed running time, capped at the configured session length.
    pub duration_seconds: f64,
    pub cycles: u32,
    /// Phase durations, e.g. `4-7-8`.
    pub pattern: String,
    pub completed_at: DateTime<Utc>,
    /// `false` when the user stopped early.
    pub completed: bool,
}

impl SessionRecord {
    pub fn new(
        session_id: Uuid,
        technique_id: impl Into<String>,
        elapsed_secs: f64,
        total_secs: f64,
        cycles: u32,
        pattern: impl Into<String>,
        completed: bool,
    ) -> Self {
        Self {
            session_id,
            technique_id: technique_id.into(),
            duration_seconds: elapsed_secs.min(total_secs).max(0.0),
            cycles,
            pattern: pattern.into(),
            completed_at: Utc::now(),
            completed,
        }
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_seconds / 60.0
    }
}
