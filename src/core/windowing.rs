//! Window management for partitioning the event stream into fixed slices.
//!
//! Windows are `[start, start + duration)` in sensor microseconds. The first
//! window opens at the first event's timestamp; every following window starts
//! exactly where the previous one ended, whatever the arrival jitter. When an
//! event lands past the current window, every window it skipped is closed in
//! turn, including empty ones, so the window cadence never breaks.

use crate::collector::types::{Event, Geometry, Timestamp};
use crate::core::frame::Frame;

/// Default window length in microseconds.
pub const DEFAULT_WINDOW_DURATION_US: i64 = 2000;

/// Longest supported window: one hour.
pub const MAX_WINDOW_DURATION_US: i64 = 3_600_000_000;

/// One time slice being accumulated.
#[derive(Debug, Clone)]
pub struct Window {
    /// Position of this window since the last reset
    pub index: u64,
    pub start: Timestamp,
    pub end: Timestamp,
    /// Raster of the events seen so far
    pub canvas: Frame,
    /// Raw events, retained only when `recording` is set
    pub events: Vec<Event>,
    /// Recording state latched when the window opened
    pub recording: bool,
    touched: bool,
}

impl Window {
    fn open(index: u64, start: Timestamp, duration: i64, geometry: Geometry, recording: bool) -> Self {
        Self {
            index,
            start,
            end: start.saturating_add(duration),
            canvas: Frame::new(geometry),
            events: Vec::new(),
            recording,
            touched: false,
        }
    }

    /// Check if a timestamp falls within this window.
    pub fn contains(&self, t: Timestamp) -> bool {
        t >= self.start && t < self.end
    }

    /// Whether no in-bounds event has landed in this window.
    pub fn is_empty(&self) -> bool {
        !self.touched
    }

    /// Move to the next contiguous window, reusing the buffers.
    fn advance(&mut self, duration: i64, recording: bool) {
        self.index += 1;
        self.start = self.end;
        self.end = self.start.saturating_add(duration);
        if self.touched {
            self.canvas.clear();
            self.touched = false;
        }
        self.events.clear();
        self.recording = recording;
    }

    fn add(&mut self, event: Event) -> bool {
        if !self.canvas.mark(event.x, event.y) {
            return false;
        }
        self.touched = true;
        if self.recording {
            self.events.push(event);
        }
        true
    }
}

/// Receives each window as it closes.
///
/// The window is lent for the duration of the call; its buffers are reused
/// for the next window afterwards.
pub trait WindowSink {
    fn window_closed(&mut self, window: &Window);
}

impl<F: FnMut(&Window)> WindowSink for F {
    fn window_closed(&mut self, window: &Window) {
        self(window)
    }
}

/// Where the manager is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// No current window
    Idle,
    /// A window is open and collecting events
    Accumulating,
}

/// What happened to one processed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Rasterized into the current window
    Accepted,
    /// Off the sensor; neither rasterized nor recorded
    OutOfBounds,
    /// No geometry known yet; the event cannot open a window
    NoGeometry,
}

/// Manages the partitioning of events into contiguous windows.
pub struct WindowManager {
    duration: i64,
    geometry: Geometry,
    current: Option<Window>,
    next_index: u64,
}

impl WindowManager {
    /// Create a manager producing windows of `duration_us` microseconds.
    ///
    /// The duration is clamped to `1..=MAX_WINDOW_DURATION_US`.
    pub fn new(duration_us: i64, geometry: Geometry) -> Self {
        Self {
            duration: duration_us.clamp(1, MAX_WINDOW_DURATION_US),
            geometry,
            current: None,
            next_index: 0,
        }
    }

    pub fn duration_us(&self) -> i64 {
        self.duration
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Change the sensor geometry. Drops any in-flight window.
    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
        self.reset();
    }

    pub fn state(&self) -> WindowState {
        if self.current.is_some() {
            WindowState::Accumulating
        } else {
            WindowState::Idle
        }
    }

    pub fn current(&self) -> Option<&Window> {
        self.current.as_ref()
    }

    /// Discard the in-flight window unconditionally and return to idle.
    ///
    /// Window indices restart at zero.
    pub fn reset(&mut self) {
        self.current = None;
        self.next_index = 0;
    }

    /// Process one event.
    ///
    /// `recording` is the current recording flag; it is only latched when a
    /// window opens. Windows the event moves past are handed to `sink`.
    pub fn process_event(
        &mut self,
        event: Event,
        recording: bool,
        sink: &mut impl WindowSink,
    ) -> EventOutcome {
        if self.geometry.is_empty() {
            return EventOutcome::NoGeometry;
        }

        let duration = self.duration;
        let window = match self.current {
            Some(ref mut window) => {
                // A window ending at the clock limit is never closed.
                while event.t >= window.end && window.end < Timestamp::MAX {
                    sink.window_closed(window);
                    window.advance(duration, recording);
                }
                window
            }
            None => {
                let window = Window::open(self.next_index, event.t, duration, self.geometry, recording);
                self.current.insert(window)
            }
        };
        self.next_index = window.index + 1;

        if window.add(event) {
            EventOutcome::Accepted
        } else {
            EventOutcome::OutOfBounds
        }
    }

    /// Close the current window early (e.g., when draining before exit).
    pub fn flush(&mut self, sink: &mut impl WindowSink) {
        if let Some(window) = self.current.take() {
            sink.window_closed(&window);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::Polarity;
    use crate::core::frame::FOREGROUND;

    #[derive(Default)]
    struct Collected {
        windows: Vec<(u64, Timestamp, Timestamp, usize, Vec<(u16, u16)>)>,
    }

    impl WindowSink for Collected {
        fn window_closed(&mut self, w: &Window) {
            self.windows.push((
                w.index,
                w.start,
                w.end,
                w.canvas.lit_pixels(),
                w.events.iter().map(|e| (e.x, e.y)).collect(),
            ));
        }
    }

    fn ev(x: u16, y: u16, t: Timestamp) -> Event {
        Event::new(x, y, Polarity::On, t)
    }

    fn manager() -> WindowManager {
        WindowManager::new(2000, Geometry::new(16, 16))
    }

    #[test]
    fn test_window_opens_at_first_event() {
        let mut manager = manager();
        let mut sink = Collected::default();
        assert_eq!(manager.state(), WindowState::Idle);

        manager.process_event(ev(0, 0, 1000), false, &mut sink);
        manager.process_event(ev(5, 5, 1500), false, &mut sink);
        manager.process_event(ev(0, 0, 2100), false, &mut sink);

        assert_eq!(manager.state(), WindowState::Accumulating);
        let window = manager.current().unwrap();
        assert_eq!((window.start, window.end), (1000, 3000));
        assert!(window.contains(2100));
        assert_eq!(window.canvas.get(0, 0), Some(FOREGROUND));
        assert_eq!(window.canvas.get(5, 5), Some(FOREGROUND));
        assert!(sink.windows.is_empty());

        manager.process_event(ev(1, 1, 3000), false, &mut sink);
        assert_eq!(sink.windows.len(), 1);
        assert_eq!(sink.windows[0].1, 1000);
        assert_eq!(sink.windows[0].2, 3000);
        assert_eq!(sink.windows[0].3, 2);

        let window = manager.current().unwrap();
        assert_eq!((window.start, window.end), (3000, 5000));
        assert_eq!(window.canvas.lit_pixels(), 1);
    }

    #[test]
    fn test_huge_duration_is_clamped() {
        let mut manager = WindowManager::new(i64::MAX, Geometry::new(4, 4));
        assert_eq!(manager.duration_us(), MAX_WINDOW_DURATION_US);
        let mut sink = Collected::default();
        manager.process_event(ev(1, 1, 1000), false, &mut sink);
        let window = manager.current().unwrap();
        assert_eq!(window.end, 1000 + MAX_WINDOW_DURATION_US);
    }

    #[test]
    fn test_window_end_saturates_at_clock_limit() {
        let mut manager = manager();
        let mut sink = Collected::default();
        manager.process_event(ev(1, 1, Timestamp::MAX - 10), false, &mut sink);
        assert_eq!(manager.current().unwrap().end, Timestamp::MAX);

        manager.process_event(ev(2, 2, Timestamp::MAX), false, &mut sink);
        assert!(sink.windows.is_empty());
        assert_eq!(manager.current().unwrap().start, Timestamp::MAX - 10);
    }

    #[test]
    fn test_gap_emits_contiguous_empty_windows() {
        let mut manager = manager();
        let mut sink = Collected::default();
        manager.process_event(ev(1, 1, 0), false, &mut sink);
        manager.process_event(ev(2, 2, 9500), false, &mut sink);

        let starts: Vec<Timestamp> = sink.windows.iter().map(|w| w.1).collect();
        assert_eq!(starts, vec![0, 2000, 4000, 6000]);
        let lit: Vec<usize> = sink.windows.iter().map(|w| w.3).collect();
        assert_eq!(lit, vec![1, 0, 0, 0]);
        let indices: Vec<u64> = sink.windows.iter().map(|w| w.0).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(manager.current().unwrap().start, 8000);
        assert_eq!(manager.current().unwrap().index, 4);
    }

    #[test]
    fn test_windows_partition_bursty_stream() {
        let mut manager = WindowManager::new(700, Geometry::new(4, 4));
        let mut sink = Collected::default();
        let mut t = 13;
        for i in 0..500u32 {
            // Irregular spacing, including repeated timestamps.
            t += i64::from((i * 7919) % 11) * 37;
            manager.process_event(ev((i % 4) as u16, 0, t), false, &mut sink);
        }
        manager.flush(&mut sink);

        assert_eq!(sink.windows.first().unwrap().1, 13);
        for pair in sink.windows.windows(2) {
            assert_eq!(pair[0].2 - pair[0].1, 700);
            assert_eq!(pair[0].2, pair[1].1);
        }
        assert!(sink.windows.last().unwrap().2 > t);
    }

    #[test]
    fn test_recording_retains_in_bounds_events_only() {
        let mut manager = WindowManager::new(2000, Geometry::new(4, 4));
        let mut sink = Collected::default();
        assert_eq!(manager.process_event(ev(1, 2, 0), true, &mut sink), EventOutcome::Accepted);
        assert_eq!(manager.process_event(ev(9, 2, 10), true, &mut sink), EventOutcome::OutOfBounds);
        assert_eq!(manager.process_event(ev(3, 3, 20), true, &mut sink), EventOutcome::Accepted);
        manager.flush(&mut sink);

        assert_eq!(sink.windows[0].4, vec![(1, 2), (3, 3)]);
        assert_eq!(manager.state(), WindowState::Idle);
    }

    #[test]
    fn test_recording_latched_at_window_open() {
        let mut manager = manager();
        let mut sink = Collected::default();
        manager.process_event(ev(1, 1, 0), true, &mut sink);
        // Recording turned off mid-window: the window still records fully.
        manager.process_event(ev(2, 2, 100), false, &mut sink);
        // Next window opens with recording off.
        manager.process_event(ev(3, 3, 2500), false, &mut sink);
        manager.flush(&mut sink);

        assert_eq!(sink.windows[0].4, vec![(1, 1), (2, 2)]);
        assert!(sink.windows[1].4.is_empty());
        assert_eq!(sink.windows[1].3, 1);
    }

    #[test]
    fn test_reset_discards_in_flight_window() {
        let mut manager = manager();
        let mut sink = Collected::default();
        manager.process_event(ev(1, 1, 1_000_000), false, &mut sink);
        manager.reset();
        assert_eq!(manager.state(), WindowState::Idle);

        manager.process_event(ev(2, 2, 50), false, &mut sink);
        let window = manager.current().unwrap();
        assert_eq!(window.start, 50);
        assert_eq!(window.index, 0);
        assert_eq!(window.canvas.get(1, 1), Some(0));
        assert!(sink.windows.is_empty());
    }

    #[test]
    fn test_no_geometry_skips_events() {
        let mut manager = WindowManager::new(2000, Geometry::default());
        let mut sink = Collected::default();
        assert_eq!(manager.process_event(ev(0, 0, 0), false, &mut sink), EventOutcome::NoGeometry);
        assert_eq!(manager.state(), WindowState::Idle);

        manager.set_geometry(Geometry::new(2, 2));
        assert_eq!(manager.process_event(ev(0, 0, 0), false, &mut sink), EventOutcome::Accepted);
    }

    #[test]
    fn test_duplicate_events_leave_canvas_unchanged() {
        let mut once = manager();
        let mut twice = manager();
        let mut sink = Collected::default();
        once.process_event(ev(4, 4, 10), false, &mut sink);
        twice.process_event(ev(4, 4, 10), false, &mut sink);
        twice.process_event(ev(4, 4, 10), false, &mut sink);
        assert_eq!(once.current().unwrap().canvas, twice.current().unwrap().canvas);
    }

    #[test]
    fn test_closure_sink() {
        let mut manager = manager();
        let mut starts = Vec::new();
        let mut sink = |w: &Window| starts.push(w.start);
        manager.process_event(ev(0, 0, 0), false, &mut sink);
        manager.process_event(ev(0, 0, 4000), false, &mut sink);
        assert_eq!(starts, vec![0, 2000]);
    }
}
