//! Session statistics for the logger.
//!
//! Tracks how many batches and events moved through the pipeline and what
//! was written to disk.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_stats, create_shared_stats_with_persistence, SessionStats, SharedStats,
    StatsSnapshot,
};
