//! Single-channel canvases and the latest-frame slot.

use crate::collector::types::{Geometry, Timestamp};
use std::sync::{Arc, Mutex, PoisonError};

/// Pixel value of a canvas with no event.
pub const BACKGROUND: u8 = 0;
/// Pixel value written at every event coordinate.
pub const FOREGROUND: u8 = 255;

/// A single-channel 8-bit image, one byte per sensor pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    geometry: Geometry,
    pixels: Vec<u8>,
}

impl Frame {
    /// A frame filled with [`BACKGROUND`].
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            pixels: vec![BACKGROUND; geometry.area()],
        }
    }

    /// Sensor resolution this frame covers.
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.geometry.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.geometry.height
    }

    /// Raw row-major pixel bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel value at `(x, y)`, or `None` off the sensor.
    pub fn get(&self, x: u16, y: u16) -> Option<u8> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Set the pixel at `(x, y)` to [`FOREGROUND`].
    ///
    /// Returns false, leaving the frame untouched, if the coordinate is off
    /// the sensor. Marking a pixel twice is the same as marking it once.
    pub fn mark(&mut self, x: u16, y: u16) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.pixels[i] = FOREGROUND;
                true
            }
            None => false,
        }
    }

    /// Reset every pixel to [`BACKGROUND`].
    pub fn clear(&mut self) {
        self.pixels.fill(BACKGROUND);
    }

    /// Number of pixels that are not background.
    pub fn lit_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&p| p != BACKGROUND).count()
    }

    fn index(&self, x: u16, y: u16) -> Option<usize> {
        self.geometry
            .contains(x, y)
            .then(|| y as usize * self.geometry.width as usize + x as usize)
    }
}

/// A frame as published by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedFrame {
    /// Window index within the current acquisition
    pub index: u64,
    /// Start of the window the frame was rasterized from
    pub window_start: Timestamp,
    pub frame: Frame,
}

/// One-slot publication of the most recent frame.
///
/// Each publish replaces the previous frame; readers copy out and may skip
/// frames.
#[derive(Debug, Default)]
pub struct LatestFrame {
    slot: Mutex<Option<PublishedFrame>>,
}

/// Thread-safe shared latest-frame slot.
pub type SharedFrame = Arc<LatestFrame>;

impl LatestFrame {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published frame with a copy of `frame`.
    pub fn publish(&self, index: u64, window_start: Timestamp, frame: &Frame) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_mut() {
            Some(published) => {
                published.index = index;
                published.window_start = window_start;
                published.frame.clone_from(frame);
            }
            None => {
                *slot = Some(PublishedFrame {
                    index,
                    window_start,
                    frame: frame.clone(),
                });
            }
        }
    }

    /// Copy of the latest frame, if any has been published.
    pub fn snapshot(&self) -> Option<PublishedFrame> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Copy of the latest frame if it differs from the one last seen.
    pub fn snapshot_if_newer(&self, last_seen: Option<(u64, Timestamp)>) -> Option<PublishedFrame> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(p) if last_seen != Some((p.index, p.window_start)) => Some(p.clone()),
            _ => None,
        }
    }
}

/// Create a new, empty shared latest-frame slot.
pub fn create_shared_frame() -> SharedFrame {
    Arc::new(LatestFrame::new())
}
