//! EVS Window Logger - fixed-window accumulation for event-based vision sensors.
//!
//! Events streamed by a camera are partitioned into fixed, non-overlapping
//! slices of sensor time (2 ms by default). Each slice is rasterized into a
//! binary frame for live display and, while recording, written out as a text
//! file listing every event position.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        EVS Window Logger                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────────┐        │
//! │  │ EventSource │──▶│  Handoff    │──▶│  Window engine   │        │
//! │  │ (callback)  │   │  queue      │   │  (2 ms slices)   │        │
//! │  └─────────────┘   └─────────────┘   └──────────────────┘        │
//! │         ▲                                │            │          │
//! │         │                                ▼            ▼          │
//! │  ┌─────────────┐                  ┌────────────┐ ┌───────────┐   │
//! │  │  Console /  │◀─────────────────│  Latest    │ │ Recording │   │
//! │  │  commands   │                  │  frame     │ │  (files)  │   │
//! │  └─────────────┘                  └────────────┘ └───────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use evs_window_logger::{collector, control, core, stats};
//! use std::sync::Arc;
//!
//! let control = control::create_shared_control();
//! let stats = stats::create_shared_stats();
//! let latest = core::create_shared_frame();
//! let queue = Arc::new(core::HandoffQueue::new(200, control.clone(), stats.clone()));
//!
//! let engine = core::WindowEngine::new(2000, queue.clone(), control.clone(), latest.clone(), stats);
//! let handle = engine.spawn().expect("Failed to spawn engine");
//!
//! let provider = collector::SyntheticProvider::new(collector::SyntheticConfig::default());
//! let mut interpreter = control::CommandInterpreter::new(
//!     Box::new(provider),
//!     queue,
//!     control,
//!     latest,
//!     "output".into(),
//! );
//! interpreter.handle(control::Command::AcquisitionOn).expect("Failed to start camera");
//! interpreter.shutdown();
//! handle.join().unwrap();
//! ```

pub mod bias;
pub mod collector;
pub mod config;
pub mod console;
pub mod control;
pub mod core;
pub mod display;
pub mod stats;

// Re-export key types at crate root for convenience
pub use bias::{BiasError, BiasFacility, StepSelector};
pub use collector::{Event, EventBatch, EventSource, Geometry, SourceError, SourceProvider};
pub use config::{Config, ConfigError};
pub use control::{BiasPresets, Command, CommandError, CommandInterpreter, SharedControl};
pub use core::{HandoffQueue, PersistenceError, WindowEngine, WindowManager};
pub use stats::{SessionStats, SharedStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_matches_key_bindings() {
        for key in ['o', 'f', 's', 'e', 'b', 'B', 'p', 'c', 'h', 'q'] {
            assert!(control::Command::from_key(key).is_some());
            assert!(control::COMMAND_HELP.contains(&format!("{key}(")), "missing {key}");
        }
        assert!(control::COMMAND_HELP.contains("n <name>"));
        assert!(control::COMMAND_HELP.contains("n <name>=<value>"));
        assert!(!VERSION.is_empty());
    }
}
