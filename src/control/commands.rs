//! Operator commands and their console key bindings.

use std::fmt;

/// The closed set of operator commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AcquisitionOn,
    AcquisitionOff,
    RecordingStart,
    RecordingStop,
    Quit,
    BiasList,
    BiasListVerbose,
    BiasSelect(String),
    BiasIncrement,
    BiasDecrement,
    BiasStepUp,
    BiasStepDown,
    BiasPrintSelected,
    /// Set a bias directly: `n <name>=<value>` at the console, or a
    /// display slider
    BiasSet { name: String, value: i32 },
    /// Save the latest frame as an image
    CaptureFrame,
    Help,
}

/// Console help line listing every key.
pub const COMMAND_HELP: &str = "Commands: o(Camera ON), f(Camera OFF), s(Record START), e(Record END), \
b(List biases), B(Verbose bias info), n <name>(Select bias), n <name>=<value>(Set bias), +/-(Bias +/-), [ ](Step), \
p(Print selection), c(Capture frame), h(Help), q(Quit)";

impl Command {
    /// Map a single key to a command.
    ///
    /// Selecting a bias needs a name and has no single-key form.
    pub fn from_key(key: char) -> Option<Self> {
        let command = match key {
            'o' | 'O' => Command::AcquisitionOn,
            'f' | 'F' => Command::AcquisitionOff,
            's' | 'S' => Command::RecordingStart,
            'e' | 'E' => Command::RecordingStop,
            'q' | 'Q' => Command::Quit,
            'b' => Command::BiasList,
            'B' => Command::BiasListVerbose,
            '+' => Command::BiasIncrement,
            '-' => Command::BiasDecrement,
            ']' => Command::BiasStepUp,
            '[' => Command::BiasStepDown,
            'p' | 'P' => Command::BiasPrintSelected,
            'c' | 'C' => Command::CaptureFrame,
            'h' | 'H' | '?' => Command::Help,
            _ => return None,
        };
        Some(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::BiasSelect(name) => write!(f, "BiasSelect({name})"),
            Command::BiasSet { name, value } => write!(f, "BiasSet({name}={value})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Result of parsing one console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    /// One or more commands, in typed order
    Commands(Vec<Command>),
    /// `n` with no name: the next line is the bias name
    AwaitBiasName,
    /// Blank line or unknown keys only
    Nothing,
}

/// Parses console lines, remembering a pending bias-name prompt.
#[derive(Debug, Default)]
pub struct ConsoleParser {
    awaiting_name: bool,
}

impl ConsoleParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the next line will be read as a bias name.
    pub fn awaiting_name(&self) -> bool {
        self.awaiting_name
    }

    /// Interpret one line typed at the console.
    ///
    /// `n <name>` selects a bias and `n <name>=<value>` sets it. Any other
    /// line is read key by key, so `++` adjusts twice. Unknown keys are ignored.
    pub fn parse_line(&mut self, line: &str) -> ConsoleInput {
        let line = line.trim();
        if std::mem::take(&mut self.awaiting_name) {
            return if line.is_empty() {
                ConsoleInput::Nothing
            } else {
                bias_name_command(line)
            };
        }

        if let Some(rest) = line.strip_prefix(['n', 'N']) {
            let name = rest.trim();
            if name.is_empty() {
                self.awaiting_name = true;
                return ConsoleInput::AwaitBiasName;
            }
            if rest.starts_with(char::is_whitespace) {
                return bias_name_command(name);
            }
        }

        let commands: Vec<Command> = line.chars().filter_map(Command::from_key).collect();
        if commands.is_empty() {
            ConsoleInput::Nothing
        } else {
            ConsoleInput::Commands(commands)
        }
    }
}

/// `name` selects a bias, `name=value` sets it. A malformed value is ignored.
fn bias_name_command(text: &str) -> ConsoleInput {
    let Some((name, value)) = text.split_once('=') else {
        return ConsoleInput::Commands(vec![Command::BiasSelect(text.to_string())]);
    };
    let name = name.trim();
    match value.trim().parse::<i32>() {
        Ok(value) if !name.is_empty() => ConsoleInput::Commands(vec![Command::BiasSet {
            name: name.to_string(),
            value,
        }]),
        _ => ConsoleInput::Nothing,
    }
}
