//! Event collection for the logger.
//!
//! This module defines the event types, the source/provider interfaces a
//! camera backend implements, and a synthetic camera used when no hardware
//! backend is linked in.

pub mod source;
pub mod synthetic;
pub mod types;

// Re-export commonly used types
pub use source::{EventCallback, EventSource, SourceError, SourceId, SourceProvider};
pub use synthetic::{SyntheticConfig, SyntheticProvider, SyntheticSource};
pub use types::{Event, EventBatch, Geometry, Polarity, Timestamp};
