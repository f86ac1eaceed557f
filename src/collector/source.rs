//! Event source and provider interfaces.
//!
//! A provider enumerates and opens sources. An open source reports its
//! geometry, accepts batch callbacks, and may expose a bias facility.
//! Callbacks fire on a thread owned by the source.

use crate::bias::BiasFacility;
use crate::collector::types::{Event, Geometry};
use std::fmt;

/// Callback invoked with each batch of events, on the source's own thread.
pub type EventCallback = Box<dyn FnMut(&[Event]) + Send>;

/// Identifier of an available source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors that can occur while opening or driving a source.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("source is already running")]
    AlreadyRunning,
}

/// Enumerates and opens event sources.
pub trait SourceProvider {
    fn list_available(&self) -> Vec<SourceId>;

    fn open(&mut self, id: &SourceId) -> Result<Box<dyn EventSource>, SourceError>;

    /// Open the first source reported by [`SourceProvider::list_available`].
    fn open_first_available(&mut self) -> Result<Box<dyn EventSource>, SourceError> {
        let id = self
            .list_available()
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::DeviceUnavailable("no camera detected".to_string()))?;
        self.open(&id)
    }
}

/// An opened event source.
pub trait EventSource: Send {
    fn id(&self) -> &SourceId;

    /// Sensor resolution.
    fn geometry(&self) -> Geometry;

    /// Register a batch callback. Must be called before [`EventSource::start`].
    fn subscribe(&mut self, callback: EventCallback);

    fn start(&mut self) -> Result<(), SourceError>;

    /// Stop delivery and wait for the delivery thread to exit.
    ///
    /// A callback blocked in a full handoff queue must be released first,
    /// otherwise this waits on it.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// The device's bias facility, if it has one.
    fn biases(&mut self) -> Option<&mut dyn BiasFacility>;
}
