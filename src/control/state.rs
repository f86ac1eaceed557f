//! Control-plane state shared between the command loop and the engine.
//!
//! Flags are plain atomics. The two reset requests are consumed with
//! `swap(false)` so each request is observed exactly once.

use crate::collector::types::Geometry;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Flags and session data observed by every thread in the pipeline.
#[derive(Debug)]
pub struct ControlState {
    running: AtomicBool,
    acquisition: AtomicBool,
    recording: AtomicBool,
    reset_requested: AtomicBool,
    recording_reset_requested: AtomicBool,
    session: AtomicU64,
    width: AtomicU32,
    height: AtomicU32,
    recording_dir: Mutex<Option<PathBuf>>,
}

/// Thread-safe shared control state.
pub type SharedControl = Arc<ControlState>;

impl ControlState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            acquisition: AtomicBool::new(false),
            recording: AtomicBool::new(false),
            reset_requested: AtomicBool::new(false),
            recording_reset_requested: AtomicBool::new(false),
            session: AtomicU64::new(0),
            width: AtomicU32::new(0),
            height: AtomicU32::new(0),
            recording_dir: Mutex::new(None),
        }
    }

    /// False once shutdown has been requested.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Only flips a flag, so it is safe to call from a signal handler.
    pub fn request_shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn acquisition_enabled(&self) -> bool {
        self.acquisition.load(Ordering::SeqCst)
    }

    pub fn set_acquisition(&self, enabled: bool) {
        self.acquisition.store(enabled, Ordering::SeqCst);
    }

    pub fn recording_enabled(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    pub fn set_recording(&self, enabled: bool) {
        self.recording.store(enabled, Ordering::SeqCst);
    }

    /// Ask the engine to drop its in-flight window.
    pub fn request_reset(&self) {
        self.reset_requested.store(true, Ordering::SeqCst);
    }

    /// Consume a pending reset request.
    pub fn take_reset(&self) -> bool {
        self.reset_requested.swap(false, Ordering::SeqCst)
    }

    /// Ask the engine to restart the recorded-frame counter.
    pub fn request_recording_reset(&self) {
        self.recording_reset_requested.store(true, Ordering::SeqCst);
    }

    /// Consume a pending recording-counter reset.
    pub fn take_recording_reset(&self) -> bool {
        self.recording_reset_requested.swap(false, Ordering::SeqCst)
    }

    /// Start a new acquisition session and return its id.
    pub fn begin_session(&self) -> u64 {
        self.session.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn session(&self) -> u64 {
        self.session.load(Ordering::SeqCst)
    }

    /// Whether a batch produced in `session` may still enter the pipeline.
    pub fn accepts(&self, session: u64) -> bool {
        self.is_running() && self.acquisition_enabled() && self.session() == session
    }

    pub fn set_geometry(&self, geometry: Geometry) {
        self.width.store(geometry.width, Ordering::SeqCst);
        self.height.store(geometry.height, Ordering::SeqCst);
    }

    pub fn geometry(&self) -> Geometry {
        Geometry::new(
            self.width.load(Ordering::SeqCst),
            self.height.load(Ordering::SeqCst),
        )
    }

    pub fn set_recording_dir(&self, dir: Option<PathBuf>) {
        *self
            .recording_dir
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = dir;
    }

    pub fn recording_dir(&self) -> Option<PathBuf> {
        self.recording_dir
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a new shared control state.
pub fn create_shared_control() -> SharedControl {
    Arc::new(ControlState::new())
}
