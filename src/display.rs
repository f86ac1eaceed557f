//! Presentation of published frames.
//!
//! The interactive loop hands every newly published frame to a
//! [`FrameDisplay`]. Windowing backends plug in here; the built-in
//! [`HeadlessDisplay`] only traces what it would have drawn.

use crate::core::frame::PublishedFrame;

/// Something that can show the latest frame.
pub trait FrameDisplay {
    /// Show `frame`. Called only when a newer frame was published.
    fn show(&mut self, frame: &PublishedFrame);

    /// Number of frames shown so far.
    fn shown(&self) -> u64;
}

/// Display that draws nothing.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    shown: u64,
    last: Option<(u64, i64)>,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index and start of the last frame shown.
    pub fn last(&self) -> Option<(u64, i64)> {
        self.last
    }
}

impl FrameDisplay for HeadlessDisplay {
    fn show(&mut self, frame: &PublishedFrame) {
        self.shown += 1;
        self.last = Some((frame.index, frame.window_start));
        tracing::trace!(
            frame = frame.index,
            t0 = frame.window_start,
            lit = frame.frame.lit_pixels(),
            "display refresh"
        );
    }

    fn shown(&self) -> u64 {
        self.shown
    }
}
