//! Core functionality for the logger.
//!
//! This module contains:
//! - The bounded handoff queue between source callback and engine
//! - Window management partitioning the stream into fixed slices
//! - Frame rasterization and latest-frame publication
//! - Persistence of recorded windows
//! - The engine thread tying these together

pub mod engine;
pub mod frame;
pub mod queue;
pub mod recording;
pub mod windowing;

// Re-export commonly used types
pub use engine::WindowEngine;
pub use frame::{create_shared_frame, Frame, LatestFrame, PublishedFrame, SharedFrame};
pub use queue::{HandoffQueue, PushOutcome, DEFAULT_MAX_QUEUE_SIZE};
pub use recording::{FrameRecorder, PersistenceError};
pub use windowing::{
    EventOutcome, Window, WindowManager, WindowSink, WindowState, DEFAULT_WINDOW_DURATION_US,
    MAX_WINDOW_DURATION_US,
};
