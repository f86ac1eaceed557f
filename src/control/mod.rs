//! Control plane: shared flags, operator commands and their interpreter.

pub mod commands;
pub mod interpreter;
pub mod state;

// Re-export commonly used types
pub use commands::{Command, ConsoleInput, ConsoleParser, COMMAND_HELP};
pub use interpreter::{BiasPresets, CommandError, CommandInterpreter, Reply};
pub use state::{create_shared_control, ControlState, SharedControl};
