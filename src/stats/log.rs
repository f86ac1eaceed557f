//! Session statistics.
//!
//! Counters are updated from the producer, engine and command threads and
//! can be summarised or persisted at exit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Running counters for one process lifetime.
#[derive(Debug)]
pub struct SessionStats {
    /// Batches accepted by the handoff queue
    batches_enqueued: AtomicU64,
    /// Batches dropped on shutdown, acquisition stop or session change
    batches_dropped: AtomicU64,
    /// Events consumed by the windowing engine
    events_processed: AtomicU64,
    /// Events outside the sensor geometry
    events_out_of_bounds: AtomicU64,
    /// Windows finalized and published
    windows_finalized: AtomicU64,
    /// Window files written
    frames_recorded: AtomicU64,
    /// Window files that could not be written
    record_failures: AtomicU64,
    started_at: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            batches_enqueued: AtomicU64::new(0),
            batches_dropped: AtomicU64::new(0),
            events_processed: AtomicU64::new(0),
            events_out_of_bounds: AtomicU64::new(0),
            windows_finalized: AtomicU64::new(0),
            frames_recorded: AtomicU64::new(0),
            record_failures: AtomicU64::new(0),
            started_at: Utc::now(),
            persist_path: None,
        }
    }

    /// Create stats that [`SessionStats::save`] writes to `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);
        stats
    }

    /// Record a batch accepted by the handoff queue.
    pub fn record_batch_enqueued(&self) {
        self.batches_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `count` batches discarded before reaching the engine.
    pub fn record_batches_dropped(&self, count: u64) {
        self.batches_dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// Record `count` events consumed by the engine.
    pub fn record_events(&self, count: u64) {
        self.events_processed.fetch_add(count, Ordering::Relaxed);
    }

    /// Record an event that fell outside the sensor.
    pub fn record_out_of_bounds(&self) {
        self.events_out_of_bounds.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a window closed and published.
    pub fn record_window_finalized(&self) {
        self.windows_finalized.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a window file written to disk.
    pub fn record_frame_written(&self) {
        self.frames_recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a window that should have been recorded but was not.
    pub fn record_write_failure(&self) {
        self.record_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            batches_enqueued: self.batches_enqueued.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            events_processed: self.events_processed.load(Ordering::Relaxed),
            events_out_of_bounds: self.events_out_of_bounds.load(Ordering::Relaxed),
            windows_finalized: self.windows_finalized.load(Ordering::Relaxed),
            frames_recorded: self.frames_recorded.load(Ordering::Relaxed),
            record_failures: self.record_failures.load(Ordering::Relaxed),
            started_at: self.started_at,
            duration_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Multi-line summary for display at exit.
    pub fn summary(&self) -> String {
        let s = self.snapshot();
        format!(
            "Session Statistics:\n\
             - Batches enqueued: {}\n\
             - Batches dropped: {}\n\
             - Events processed: {}\n\
             - Out-of-bounds events: {}\n\
             - Windows finalized: {}\n\
             - Frames recorded: {}\n\
             - Record failures: {}\n\
             - Session duration: {} seconds",
            s.batches_enqueued,
            s.batches_dropped,
            s.events_processed,
            s.events_out_of_bounds,
            s.windows_finalized,
            s.frames_recorded,
            s.record_failures,
            s.duration_secs
        )
    }

    /// Write the current snapshot as JSON, if a path was configured.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string_pretty(&self.snapshot())
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub batches_enqueued: u64,
    pub batches_dropped: u64,
    pub events_processed: u64,
    pub events_out_of_bounds: u64,
    pub windows_finalized: u64,
    pub frames_recorded: u64,
    pub record_failures: u64,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
}

/// Thread-safe shared statistics.
pub type SharedStats = Arc<SessionStats>;

/// Create new shared statistics.
pub fn create_shared_stats() -> SharedStats {
    Arc::new(SessionStats::new())
}

/// Create shared statistics that save to `path`.
pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedStats {
    Arc::new(SessionStats::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = SessionStats::new();
        stats.record_batch_enqueued();
        stats.record_batch_enqueued();
        stats.record_batches_dropped(3);
        stats.record_events(10);
        stats.record_window_finalized();

        let s = stats.snapshot();
        assert_eq!(s.batches_enqueued, 2);
        assert_eq!(s.batches_dropped, 3);
        assert_eq!(s.events_processed, 10);
        assert_eq!(s.windows_finalized, 1);
        assert_eq!(s.frames_recorded, 0);
    }

    #[test]
    fn test_summary_format() {
        let summary = SessionStats::new().summary();
        assert!(summary.contains("Windows finalized: 0"));
        assert!(summary.contains("Record failures"));
    }

    #[test]
    fn test_save_writes_json() {
        let dir = std::env::temp_dir().join(format!("evs-stats-test-{}", std::process::id()));
        let path = dir.join("stats.json");
        let stats = SessionStats::with_persistence(path.clone());
        stats.record_frame_written();
        stats.save().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: StatsSnapshot = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.frames_recorded, 1);
        let _ = std::fs::remove_dir_all(dir);
    }
}
