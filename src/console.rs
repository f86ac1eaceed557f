//! Interactive console loop.
//!
//! Lines typed on stdin are read on a detached thread and forwarded over a
//! channel. The loop waits at most one display interval for input, runs any
//! commands, then refreshes the display if a newer frame was published.

use crate::control::commands::{ConsoleInput, ConsoleParser};
use crate::control::interpreter::CommandInterpreter;
use crate::control::state::SharedControl;
use crate::core::frame::SharedFrame;
use crate::display::FrameDisplay;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::io::{self, BufRead};
use std::thread;
use std::time::Duration;

/// Spawn a thread forwarding stdin lines. The channel closes at end of input.
pub fn spawn_stdin_reader() -> io::Result<Receiver<String>> {
    let (tx, rx) = bounded(16);
    thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// The interactive thread: commands in, frames out.
pub struct Console<D: FrameDisplay> {
    interpreter: CommandInterpreter,
    parser: ConsoleParser,
    display: D,
    control: SharedControl,
    latest: SharedFrame,
    interval: Duration,
    last_seen: Option<(u64, i64)>,
}

impl<D: FrameDisplay> Console<D> {
    pub fn new(
        interpreter: CommandInterpreter,
        display: D,
        control: SharedControl,
        latest: SharedFrame,
        interval: Duration,
    ) -> Self {
        Self {
            interpreter,
            parser: ConsoleParser::new(),
            display,
            control,
            latest,
            interval,
            last_seen: None,
        }
    }

    pub fn interpreter_mut(&mut self) -> &mut CommandInterpreter {
        &mut self.interpreter
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Run until shutdown is requested.
    ///
    /// When stdin closes the loop keeps refreshing the display until
    /// shutdown arrives from elsewhere (Ctrl+C).
    pub fn run(&mut self, lines: Receiver<String>) {
        let mut input = Some(lines);
        while self.control.is_running() {
            match input.as_ref().map(|rx| rx.recv_timeout(self.interval)) {
                Some(Ok(line)) => {
                    for out in self.handle_line(&line) {
                        println!("{out}");
                    }
                }
                Some(Err(RecvTimeoutError::Timeout)) => {}
                Some(Err(RecvTimeoutError::Disconnected)) => {
                    tracing::debug!("console input closed");
                    input = None;
                }
                None => thread::sleep(self.interval),
            }
            self.refresh_display();
        }
        self.interpreter.shutdown();
    }

    /// Parse and execute one console line. Returns the text to show.
    pub fn handle_line(&mut self, line: &str) -> Vec<String> {
        let commands = match self.parser.parse_line(line) {
            ConsoleInput::Commands(commands) => commands,
            ConsoleInput::AwaitBiasName => return vec!["Enter bias name:".to_string()],
            ConsoleInput::Nothing => return Vec::new(),
        };

        let mut output = Vec::new();
        for command in commands {
            let label = command.to_string();
            match self.interpreter.handle(command) {
                Ok(reply) => output.extend(reply),
                Err(e) if e.is_notice() => output.push(e.to_string()),
                Err(e) => {
                    tracing::warn!(command = %label, error = %e, "command failed");
                    output.push(format!("Error: {e}"));
                }
            }
            if !self.control.is_running() {
                break;
            }
        }
        output
    }

    /// Show the latest frame if it is newer than the last one shown.
    pub fn refresh_display(&mut self) -> bool {
        match self.latest.snapshot_if_newer(self.last_seen) {
            Some(published) => {
                self.last_seen = Some((published.index, published.window_start));
                self.display.show(&published);
                true
            }
            None => false,
        }
    }
}
