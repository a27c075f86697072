//! Session statistics.
//!
//! Counters for one capture session, cheap enough to update from the hot
//! sampling path. A serializable snapshot is written next to the output files
//! at session end so a recording is auditable after the fact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Live counters for the current capture session.
#[derive(Debug)]
pub struct SessionStats {
    /// Unique id for this session
    session_id: Uuid,
    /// Host the session ran on
    host: String,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Number of sweeps performed
    sweeps: AtomicU64,
    /// Number of pose samples produced
    samples: AtomicU64,
    /// Number of invalid poses skipped
    invalid_poses: AtomicU64,
    /// Number of identity lookups that fell back to a placeholder
    identity_fallbacks: AtomicU64,
    /// Number of batch flushes (terminal drain included)
    flushes: AtomicU64,
    /// Number of data rows written to disk
    rows_written: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            host: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
            session_start: Utc::now(),
            sweeps: AtomicU64::new(0),
            samples: AtomicU64::new(0),
            invalid_poses: AtomicU64::new(0),
            identity_fallbacks: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            rows_written: AtomicU64::new(0),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Record one completed sweep and the samples it produced.
    pub fn record_sweep(&self, sample_count: u64) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.samples.fetch_add(sample_count, Ordering::Relaxed);
    }

    pub fn record_invalid_pose(&self) {
        self.invalid_poses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_identity_fallback(&self) {
        self.identity_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rows_written(&self, count: u64) {
        self.rows_written.fetch_add(count, Ordering::Relaxed);
    }

    /// Get the current counters as a serializable snapshot.
    pub fn snapshot(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id,
            host: self.host.clone(),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
            sweeps: self.sweeps.load(Ordering::Relaxed),
            samples: self.samples.load(Ordering::Relaxed),
            invalid_poses: self.invalid_poses.load(Ordering::Relaxed),
            identity_fallbacks: self.identity_fallbacks.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let s = self.snapshot();
        format!(
            "Session Statistics:\n\
             - Sweeps: {}\n\
             - Samples recorded: {}\n\
             - Invalid poses skipped: {}\n\
             - Identity fallbacks: {}\n\
             - Flushes: {}\n\
             - Rows written: {}\n\
             - Session duration: {} seconds",
            s.sweeps,
            s.samples,
            s.invalid_poses,
            s.identity_fallbacks,
            s.flushes,
            s.rows_written,
            s.session_duration_secs
        )
    }

    /// Write the summary snapshot as JSON into `dir`.
    pub fn save(&self, dir: &Path) -> std::io::Result<()> {
        let snapshot = self.snapshot();
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(dir.join("session_summary.json"), json)
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the session counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub host: String,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
    pub sweeps: u64,
    pub samples: u64,
    pub invalid_poses: u64,
    pub identity_fallbacks: u64,
    pub flushes: u64,
    pub rows_written: u64,
}
