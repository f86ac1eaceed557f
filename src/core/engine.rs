//! The windowing engine: the single consumer of the handoff queue.
//!
//! The engine owns all window state. Per batch it applies pending resets,
//! drops batches from a superseded session, and feeds the events through the
//! [`WindowManager`]. Each closed window is recorded (if it was opened while
//! recording), published as the latest frame, then recycled.

use crate::collector::types::EventBatch;
use crate::control::state::SharedControl;
use crate::core::frame::SharedFrame;
use crate::core::queue::HandoffQueue;
use crate::core::recording::FrameRecorder;
use crate::core::windowing::{EventOutcome, Window, WindowManager, WindowSink};
use crate::stats::SharedStats;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Consumer that turns queued batches into published frames.
pub struct WindowEngine {
    manager: WindowManager,
    recorder: FrameRecorder,
    queue: Arc<HandoffQueue>,
    control: SharedControl,
    latest: SharedFrame,
    stats: SharedStats,
}

impl WindowEngine {
    pub fn new(
        window_duration_us: i64,
        queue: Arc<HandoffQueue>,
        control: SharedControl,
        latest: SharedFrame,
        stats: SharedStats,
    ) -> Self {
        Self {
            manager: WindowManager::new(window_duration_us, control.geometry()),
            recorder: FrameRecorder::new(),
            queue,
            control,
            latest,
            stats,
        }
    }

    pub fn manager(&self) -> &WindowManager {
        &self.manager
    }

    /// Run the engine on a dedicated thread.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("window-engine".to_string())
            .spawn(move || self.run())
    }

    /// Consume batches until shutdown.
    ///
    /// Queued batches and the in-flight window are abandoned on shutdown.
    pub fn run(mut self) {
        tracing::debug!(duration_us = self.manager.duration_us(), "window engine started");
        while self.control.is_running() {
            self.apply_resets();
            let Some(batch) = self.queue.pop() else {
                break;
            };
            self.process_batch(batch);
        }
        tracing::debug!("window engine stopped");
    }

    /// Observe pending reset requests.
    ///
    /// A session reset drops the in-flight window and picks up the geometry
    /// of the newly opened source. Frame numbering restarts only with a new
    /// recording, so a reopened camera keeps appending to the same run.
    pub fn apply_resets(&mut self) {
        if self.control.take_reset() {
            self.manager.set_geometry(self.control.geometry());
            tracing::debug!("window state reset");
        }
        if self.control.take_recording_reset() {
            self.recorder.reset_counter();
        }
    }

    /// Feed one batch through the window state machine.
    pub fn process_batch(&mut self, batch: EventBatch) {
        // A reset may have been requested while this batch sat in the queue.
        self.apply_resets();
        if batch.session != self.control.session() {
            self.stats.record_batches_dropped(1);
            return;
        }

        let mut finalizer = Finalizer {
            recorder: &mut self.recorder,
            queue: &self.queue,
            control: &self.control,
            latest: &self.latest,
            stats: &self.stats,
        };

        self.stats.record_events(batch.events.len() as u64);
        for event in batch.events {
            let recording = self.control.recording_enabled();
            match self.manager.process_event(event, recording, &mut finalizer) {
                EventOutcome::Accepted | EventOutcome::NoGeometry => {}
                EventOutcome::OutOfBounds => self.stats.record_out_of_bounds(),
            }
        }
    }
}

/// Finalizes closed windows: record, publish, log.
struct Finalizer<'a> {
    recorder: &'a mut FrameRecorder,
    queue: &'a HandoffQueue,
    control: &'a SharedControl,
    latest: &'a SharedFrame,
    stats: &'a SharedStats,
}

impl WindowSink for Finalizer<'_> {
    fn window_closed(&mut self, window: &Window) {
        if window.recording {
            match self.control.recording_dir() {
                Some(dir) => match self.recorder.write_window(&dir, window) {
                    Ok(_) => self.stats.record_frame_written(),
                    Err(e) => {
                        self.stats.record_write_failure();
                        tracing::warn!(error = %e, t0 = window.start, "skipping window recording");
                    }
                },
                None => self.stats.record_write_failure(),
            }
        }

        self.latest.publish(window.index, window.start, &window.canvas);
        self.stats.record_window_finalized();

        tracing::debug!(
            frame = window.index,
            t0 = window.start,
            queue = self.queue.len(),
            recording = window.recording,
            "window finalized"
        );
    }
}
