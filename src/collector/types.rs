//! Event types carried from the sensor to the windowing engine.
//!
//! Timestamps are sensor-clock microseconds. They never decrease within a
//! batch, nor across batches taken in arrival order.

use serde::{Deserialize, Serialize};

/// Sensor timestamp in microseconds.
pub type Timestamp = i64;

/// Direction of the brightness change that triggered an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    /// Brightness decreased
    Off,
    /// Brightness increased
    On,
}

/// A single contrast-detection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub x: u16,
    pub y: u16,
    pub polarity: Polarity,
    /// Microseconds on the sensor clock
    pub t: Timestamp,
}

impl Event {
    pub fn new(x: u16, y: u16, polarity: Polarity, t: Timestamp) -> Self {
        Self { x, y, polarity, t }
    }
}

/// Sensor resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether a pixel coordinate lies on the sensor.
    pub fn contains(&self, x: u16, y: u16) -> bool {
        u32::from(x) < self.width && u32::from(y) < self.height
    }

    /// Number of pixels on the sensor.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// The events delivered by one invocation of a source callback.
///
/// `session` identifies the acquisition session the batch was produced in;
/// the engine drops batches that belong to an older session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBatch {
    pub session: u64,
    pub events: Vec<Event>,
}

impl EventBatch {
    pub fn new(session: u64, events: Vec<Event>) -> Self {
        Self { session, events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Timestamp of the first event, if any.
    pub fn first_timestamp(&self) -> Option<Timestamp> {
        self.events.first().map(|e| e.t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_bounds() {
        let geometry = Geometry::new(640, 480);
        assert!(geometry.contains(0, 0));
        assert!(geometry.contains(639, 479));
        assert!(!geometry.contains(640, 0));
        assert!(!geometry.contains(0, 480));
        assert_eq!(geometry.area(), 640 * 480);
    }

    #[test]
    fn test_empty_geometry_contains_nothing() {
        let geometry = Geometry::default();
        assert!(geometry.is_empty());
        assert!(!geometry.contains(0, 0));
    }

    #[test]
    fn test_batch_first_timestamp() {
        let batch = EventBatch::new(
            1,
            vec![
                Event::new(1, 1, Polarity::On, 42),
                Event::new(2, 2, Polarity::Off, 43),
            ],
        );
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.first_timestamp(), Some(42));
        assert_eq!(EventBatch::new(1, Vec::new()).first_timestamp(), None);
    }
}
