//! On-disk session history.
//!
//! A JSON document holding the most recent records plus running totals.
//! Totals cover every session ever recorded, not only the retained ones.

use super::ProgressRecorder;
use super::record::SessionRecord;
use crate::error::{BreathlineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Records kept in the history file.
pub const MAX_RECORDS: usize = 100;

/// Running totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionStats {
    pub total_sessions: u64,
    pub total_cycles: u64,
    pub total_minutes: f64,
    pub last_session: Option<DateTime<Utc>>,
}

/// Contents of the history file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionHistory {
    pub records: Vec<SessionRecord>,
    pub stats: SessionStats,
}

impl SessionHistory {
    /// Append a record, trimming to [`MAX_RECORDS`] and updating totals.
    pub fn push(&mut self, record: SessionRecord) {
        self.stats.total_sessions += 1;
        self.stats.total_cycles += u64::from(record.cycles);
        self.stats.total_minutes += record.duration_minutes();
        self.stats.last_session = Some(record.completed_at);
        self.records.push(record);
        if self.records.len() > MAX_RECORDS {
            let excess = self.records.len() - MAX_RECORDS;
            self.records.drain(..excess);
        }
    }
}

/// [`ProgressRecorder`] appending to a JSON history file.
pub struct SessionLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SessionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Log at `paths::session_log_file()`.
    pub fn open_default() -> Self {
        Self::new(crate::paths::session_log_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the history. A missing file is an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`BreathlineError::Storage`] if the file exists but is not
    /// valid history JSON.
    pub fn load(&self) -> Result<SessionHistory> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionHistory::default());
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map_err(|e| {
            BreathlineError::Storage(format!("invalid session log {}: {e}", self.path.display()))
        })
    }

    /// Append `record` and rewrite the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn append(&self, record: &SessionRecord) -> Result<SessionHistory> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut history = match self.load() {
            Ok(h) => h,
            Err(e @ BreathlineError::Storage(_)) => {
                let backup = self.backup_path();
                std::fs::rename(&self.path, &backup)?;
                warn!(
                    "{e}; moved to {} and starting a fresh history",
                    backup.display()
                );
                SessionHistory::default()
            }
            Err(e) => return Err(e),
        };
        history.push(record.clone());
        self.write(&history)?;
        debug!(
            "session logged: {} ({} total)",
            record.technique_id, history.stats.total_sessions
        );
        Ok(history)
    }

    /// Where an unreadable history file is kept (`sessions.json.bak`).
    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("json.bak")
    }

    fn write(&self, history: &SessionHistory) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(history)
            .map_err(|e| BreathlineError::Storage(format!("cannot encode session log: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ProgressRecorder for SessionLog {
    fn record(&self, record: &SessionRecord) {
        if let Err(e) = self.append(record) {
            warn!("failed to record session: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use uuid::Uuid;

    fn record(cycles: u32, secs: f64) -> SessionRecord {
        SessionRecord::new(Uuid::new_v4(), "box", secs, 600.0, cycles, "4-4-4-4", true)
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let log = SessionLog::new(dir.path().join("sessions.json"));
        assert_eq!(log.load().unwrap(), SessionHistory::default());
    }

    #[test]
    fn append_accumulates_stats() {
        let dir = tempfile::tempdir().unwrap();
        let log = SessionLog::new(dir.path().join("data").join("sessions.json"));
        log.record(&record(3, 60.0));
        log.record(&record(2, 30.0));

        let history = log.load().unwrap();
        assert_eq!(history.records.len(), 2);
        assert_eq!(history.stats.total_sessions, 2);
        assert_eq!(history.stats.total_cycles, 5);
        assert!((history.stats.total_minutes - 1.5).abs() < 1e-9);
        assert_eq!(
            history.stats.last_session,
            Some(history.records[1].completed_at)
        );
    }

    #[test]
    fn keeps_only_recent_records_but_all_time_totals() {
        let mut history = SessionHistory::default();
        for i in 0..(MAX_RECORDS as u32 + 5) {
            history.push(record(i, 1.0));
        }
        assert_eq!(history.records.len(), MAX_RECORDS);
        assert_eq!(history.records[0].cycles, 5);
        assert_eq!(history.stats.total_sessions, MAX_RECORDS as u64 + 5);
    }

    #[test]
    fn corrupt_file_is_backed_up_before_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, "{ not json").unwrap();
        let log = SessionLog::new(&path);
        assert!(log.load().is_err());

        let history = log.append(&record(1, 10.0)).unwrap();
        assert_eq!(history.stats.total_sessions, 1);
        assert_eq!(log.load().unwrap().records.len(), 1);
        assert_eq!(
            std::fs::read_to_string(log.backup_path()).unwrap(),
            "{ not json"
        );
        assert_eq!(log.backup_path(), dir.path().join("sessions.json.bak"));
    }

    #[test]
    fn file_uses_camel_case_stats() {
        let dir = tempfile::tempdir().unwrap();
        let log = SessionLog::new(dir.path().join("sessions.json"));
        log.record(&record(1, 6.0));
        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert!(raw.contains("\"totalSessions\": 1"));
        assert!(raw.contains("\"lastSession\""));
    }
}
