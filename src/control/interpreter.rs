//! Command interpreter: applies operator commands to the pipeline.
//!
//! Runs on the interactive thread. Each command either performs its state
//! transition and returns the lines to show the operator, or fails its
//! precondition and returns a [`CommandError`] that the caller reports
//! without stopping anything.

use crate::bias::{
    adjust_bias, apply_bias, describe_biases, BiasError, BiasFacility, BiasWrite, StepSelector,
};
use crate::collector::source::{EventSource, SourceError, SourceProvider};
use crate::collector::types::{Event, EventBatch};
use crate::control::commands::{Command, COMMAND_HELP};
use crate::control::state::SharedControl;
use crate::core::frame::SharedFrame;
use crate::core::queue::HandoffQueue;
use crate::core::recording::{create_run_dir, save_capture, PersistenceError};
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;

/// Why a command did nothing.
#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("camera already ON")]
    AcquisitionAlreadyOn,
    #[error("camera already OFF")]
    AcquisitionAlreadyOff,
    #[error("recording already ON")]
    RecordingAlreadyOn,
    #[error("recording already OFF")]
    RecordingAlreadyOff,
    #[error("camera must be ON before using bias commands")]
    AcquisitionRequired,
    #[error("no bias selected; use 'n <name>' to select one")]
    NoBiasSelected,
    #[error("no frame available to capture")]
    NoFrame,
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Bias(#[from] BiasError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl CommandError {
    /// Whether this is an expected precondition notice rather than a failure.
    pub fn is_notice(&self) -> bool {
        !matches!(
            self,
            CommandError::Source(_)
                | CommandError::Persistence(_)
                | CommandError::Bias(BiasError::WriteFailed { .. })
        )
    }
}

/// Bias values to apply whenever acquisition opens a source.
#[derive(Debug, Clone, Default)]
pub struct BiasPresets {
    pub values: Vec<(String, i32)>,
    /// Print every bias on the first open
    pub print_on_open: bool,
}

impl BiasPresets {
    /// Whether the presets ask for acquisition to start immediately.
    pub fn wants_auto_open(&self) -> bool {
        !self.values.is_empty() || self.print_on_open
    }
}

/// Lines of output produced by a successful command.
pub type Reply = Vec<String>;

/// Maps operator commands onto control state and device operations.
pub struct CommandInterpreter {
    provider: Box<dyn SourceProvider>,
    source: Option<Box<dyn EventSource>>,
    queue: Arc<HandoffQueue>,
    control: SharedControl,
    latest: SharedFrame,
    output_root: PathBuf,
    selected_bias: Option<String>,
    steps: StepSelector,
    presets: BiasPresets,
}

impl CommandInterpreter {
    pub fn new(
        provider: Box<dyn SourceProvider>,
        queue: Arc<HandoffQueue>,
        control: SharedControl,
        latest: SharedFrame,
        output_root: PathBuf,
    ) -> Self {
        Self {
            provider,
            source: None,
            queue,
            control,
            latest,
            output_root,
            selected_bias: None,
            steps: StepSelector::default(),
            presets: BiasPresets::default(),
        }
    }

    pub fn with_steps(mut self, steps: StepSelector) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_presets(mut self, presets: BiasPresets) -> Self {
        self.presets = presets;
        self
    }

    pub fn selected_bias(&self) -> Option<&str> {
        self.selected_bias.as_deref()
    }

    pub fn step(&self) -> i32 {
        self.steps.current()
    }

    /// Execute one command.
    pub fn handle(&mut self, command: Command) -> Result<Reply, CommandError> {
        match command {
            Command::AcquisitionOn => self.acquisition_on(),
            Command::AcquisitionOff => self.acquisition_off(),
            Command::RecordingStart => self.recording_start(),
            Command::RecordingStop => self.recording_stop(),
            Command::Quit => {
                self.control.request_shutdown();
                self.queue.wake_all();
                Ok(vec!["Exit requested.".to_string()])
            }
            Command::BiasList => self.bias_list(false),
            Command::BiasListVerbose => self.bias_list(true),
            Command::BiasSelect(name) => self.bias_select(&name),
            Command::BiasIncrement => self.bias_adjust(1),
            Command::BiasDecrement => self.bias_adjust(-1),
            Command::BiasStepUp => Ok(vec![format!("Bias step set to {}", self.steps.up())]),
            Command::BiasStepDown => Ok(vec![format!("Bias step set to {}", self.steps.down())]),
            Command::BiasPrintSelected => self.bias_print_selected(),
            Command::BiasSet { name, value } => {
                let facility = facility(&self.control, &mut self.source)?;
                let write = apply_bias(facility, &name, value)?;
                Ok(vec![report_write(&write)])
            }
            Command::CaptureFrame => self.capture(),
            Command::Help => Ok(vec![COMMAND_HELP.to_string()]),
        }
    }

    fn acquisition_on(&mut self) -> Result<Reply, CommandError> {
        if self.control.acquisition_enabled() {
            return Err(CommandError::AcquisitionAlreadyOn);
        }
        let mut source = self.provider.open_first_available()?;
        let geometry = source.geometry();
        let mut reply = Vec::new();

        self.control.set_geometry(geometry);
        let session = self.control.begin_session();
        self.selected_bias = None;
        self.control.request_reset();
        self.control.set_acquisition(true);

        match source.biases() {
            Some(biases) => {
                for (name, value) in &self.presets.values {
                    match apply_bias(biases, name, *value) {
                        Ok(write) => reply.push(report_write(&write)),
                        Err(e) => tracing::warn!(bias = %name, error = %e, "bias preset not applied"),
                    }
                }
                if std::mem::take(&mut self.presets.print_on_open) {
                    reply.extend(bias_listing(biases, false));
                }
            }
            None => {
                tracing::info!("device exposes no bias facility; bias commands disabled");
                reply.push(BiasError::Unsupported.to_string());
            }
        }

        let queue = self.queue.clone();
        source.subscribe(Box::new(move |events: &[Event]| {
            if !events.is_empty() {
                queue.push(EventBatch::new(session, events.to_vec()));
            }
        }));
        if let Err(e) = source.start() {
            self.control.set_acquisition(false);
            self.control.request_reset();
            return Err(e.into());
        }

        tracing::info!(
            source = %source.id(),
            width = geometry.width,
            height = geometry.height,
            session,
            "camera ON"
        );
        reply.push(format!(
            "Camera ON. Resolution: {}x{}",
            geometry.width, geometry.height
        ));
        self.source = Some(source);
        Ok(reply)
    }

    fn acquisition_off(&mut self) -> Result<Reply, CommandError> {
        if !self.control.acquisition_enabled() {
            return Err(CommandError::AcquisitionAlreadyOff);
        }
        self.control.set_acquisition(false);
        // Release a producer blocked on a full queue before joining it.
        self.queue.clear();
        if let Some(mut source) = self.source.take() {
            source.stop();
        }
        self.queue.clear();
        self.selected_bias = None;
        self.control.request_reset();
        tracing::info!("camera OFF");
        Ok(vec!["Camera OFF.".to_string()])
    }

    fn recording_start(&mut self) -> Result<Reply, CommandError> {
        if self.control.recording_enabled() {
            return Err(CommandError::RecordingAlreadyOn);
        }
        let dir = create_run_dir(&self.output_root, Local::now())?;
        self.control.set_recording_dir(Some(dir.clone()));
        self.control.request_recording_reset();
        self.control.set_recording(true);
        tracing::info!(dir = %dir.display(), "recording ON");
        Ok(vec![format!("Recording ON. Output dir: {}", dir.display())])
    }

    fn recording_stop(&mut self) -> Result<Reply, CommandError> {
        if !self.control.recording_enabled() {
            return Err(CommandError::RecordingAlreadyOff);
        }
        self.control.set_recording(false);
        tracing::info!("recording OFF");
        Ok(vec!["Recording OFF.".to_string()])
    }

    fn bias_list(&mut self, verbose: bool) -> Result<Reply, CommandError> {
        let biases = facility(&self.control, &mut self.source)?;
        let mut reply = bias_listing(biases, verbose);
        if let Some(first) = biases.list().into_keys().next() {
            let selected = self.selected_bias.get_or_insert(first);
            reply.push(format!(
                "Selected bias: {} | step={} ({})",
                selected,
                self.steps.current(),
                self.steps.describe_options()
            ));
        }
        Ok(reply)
    }

    fn bias_select(&mut self, name: &str) -> Result<Reply, CommandError> {
        let biases = facility(&self.control, &mut self.source)?;
        let name = name.trim();
        if name.is_empty() {
            return Ok(vec!["Bias name not changed (empty input).".to_string()]);
        }
        if !biases.list().contains_key(name) {
            return Err(BiasError::UnknownBias(name.to_string()).into());
        }
        self.selected_bias = Some(name.to_string());
        Ok(vec![format!("Selected bias set to \"{name}\".")])
    }

    fn bias_adjust(&mut self, direction: i32) -> Result<Reply, CommandError> {
        let biases = facility(&self.control, &mut self.source)?;
        let name = self
            .selected_bias
            .as_deref()
            .ok_or(CommandError::NoBiasSelected)?;
        let write = adjust_bias(biases, name, direction * self.steps.current())?;
        Ok(vec![report_write(&write)])
    }

    fn bias_print_selected(&mut self) -> Result<Reply, CommandError> {
        let biases = facility(&self.control, &mut self.source)?;
        let name = self
            .selected_bias
            .as_deref()
            .ok_or(CommandError::NoBiasSelected)?;
        let value = biases
            .list()
            .get(name)
            .copied()
            .ok_or_else(|| BiasError::UnknownBias(name.to_string()))?;
        Ok(vec![format!(
            "Selected bias: {name} = {value} | step={}",
            self.steps.current()
        )])
    }

    fn capture(&mut self) -> Result<Reply, CommandError> {
        let published = self.latest.snapshot().ok_or(CommandError::NoFrame)?;
        let path = save_capture(&self.output_root, &published.frame, Local::now())?;
        tracing::info!(path = %path.display(), t0 = published.window_start, "frame captured");
        Ok(vec![format!("Captured image saved to: {}", path.display())])
    }

    /// Stop acquisition and release every waiter. Idempotent.
    pub fn shutdown(&mut self) {
        self.control.request_shutdown();
        self.control.set_acquisition(false);
        self.queue.wake_all();
        if let Some(mut source) = self.source.take() {
            source.stop();
        }
    }
}

impl Drop for CommandInterpreter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The bias facility of the open source, if commands may use it.
fn facility<'a>(
    control: &SharedControl,
    source: &'a mut Option<Box<dyn EventSource>>,
) -> Result<&'a mut dyn BiasFacility, CommandError> {
    if !control.acquisition_enabled() {
        return Err(CommandError::AcquisitionRequired);
    }
    source
        .as_mut()
        .and_then(|source| source.biases())
        .ok_or(CommandError::Bias(BiasError::Unsupported))
}

fn bias_listing(biases: &dyn BiasFacility, verbose: bool) -> Reply {
    let lines = describe_biases(biases, verbose);
    if lines.is_empty() {
        return vec!["No biases reported by the camera.".to_string()];
    }
    let mut reply = Vec::with_capacity(lines.len() + 1);
    reply.push("Available biases:".to_string());
    reply.extend(lines);
    reply
}

fn report_write(write: &BiasWrite) -> String {
    if write.clamped {
        tracing::info!(
            bias = %write.name,
            requested = write.requested,
            applied = write.applied,
            "bias clamped to recommended range"
        );
    }
    write.to_string()
}
