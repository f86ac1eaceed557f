//! Bias operations shared by the command interpreter and CLI presets.

use super::facility::{BiasError, BiasFacility};
use std::fmt;

/// Default increments offered by the step selector.
pub const DEFAULT_BIAS_STEPS: [i32; 5] = [1, 5, 10, 20, 50];

/// Result of a successful bias write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiasWrite {
    pub name: String,
    /// Value before the write, when the device reported one
    pub previous: Option<i32>,
    pub requested: i32,
    /// Value the device reports after the write
    pub applied: i32,
    /// Whether `requested` was pulled into the recommended range
    pub clamped: bool,
}

impl fmt::Display for BiasWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.previous {
            Some(previous) => write!(f, "bias \"{}\" updated: {} -> {}", self.name, previous, self.applied)?,
            None => write!(f, "bias \"{}\" = {}", self.name, self.applied)?,
        }
        if self.clamped {
            write!(f, " (requested {}, clamped)", self.requested)?;
        }
        Ok(())
    }
}

/// Write `value` to `name`, clamped to the recommended range.
///
/// Read-only biases are rejected before the device is touched.
pub fn apply_bias(
    facility: &mut dyn BiasFacility,
    name: &str,
    value: i32,
) -> Result<BiasWrite, BiasError> {
    let info = facility
        .info(name)
        .ok_or_else(|| BiasError::UnknownBias(name.to_string()))?;
    if !info.modifiable {
        return Err(BiasError::ReadOnly(name.to_string()));
    }

    let previous = facility.get(name);
    let target = info.recommended.clamp(value);
    facility.set(name, target)?;
    let applied = facility.get(name).unwrap_or(target);

    Ok(BiasWrite {
        name: name.to_string(),
        previous,
        requested: value,
        applied,
        clamped: target != value,
    })
}

/// Move `name` by `delta` from its current value.
pub fn adjust_bias(
    facility: &mut dyn BiasFacility,
    name: &str,
    delta: i32,
) -> Result<BiasWrite, BiasError> {
    let current = facility
        .list()
        .get(name)
        .copied()
        .ok_or_else(|| BiasError::UnknownBias(name.to_string()))?;
    apply_bias(facility, name, current.saturating_add(delta))
}

/// One display line per reported bias.
///
/// The verbose form adds ranges, description, category and modifiability.
pub fn describe_biases(facility: &dyn BiasFacility, verbose: bool) -> Vec<String> {
    facility
        .list()
        .into_iter()
        .map(|(name, value)| {
            let mut line = format!("  - {name} = {value}");
            if verbose {
                match facility.info(&name) {
                    Some(info) => {
                        line.push_str(&format!(" | range={}", info.recommended));
                        if info.allowed != info.recommended {
                            line.push_str(&format!(" (allowed {})", info.allowed));
                        }
                        if !info.description.is_empty() {
                            line.push_str(&format!(" | desc={}", info.description));
                        }
                        if !info.category.is_empty() {
                            line.push_str(&format!(" | category={}", info.category));
                        }
                        line.push_str(if info.modifiable {
                            " | modifiable=yes"
                        } else {
                            " | modifiable=no"
                        });
                    }
                    None => line.push_str(" | info=unavailable"),
                }
            }
            line
        })
        .collect()
}

/// Saturating cursor over the available bias increments.
#[derive(Debug, Clone)]
pub struct StepSelector {
    options: Vec<i32>,
    index: usize,
}

impl StepSelector {
    /// Falls back to [`DEFAULT_BIAS_STEPS`] when `options` is empty.
    pub fn new(options: Vec<i32>) -> Self {
        let options = if options.is_empty() {
            DEFAULT_BIAS_STEPS.to_vec()
        } else {
            options
        };
        Self { options, index: 0 }
    }

    pub fn current(&self) -> i32 {
        self.options[self.index]
    }

    /// Select the next larger step. Returns the new step.
    pub fn up(&mut self) -> i32 {
        if self.index + 1 < self.options.len() {
            self.index += 1;
        }
        self.current()
    }

    /// Select the next smaller step. Returns the new step.
    pub fn down(&mut self) -> i32 {
        self.index = self.index.saturating_sub(1);
        self.current()
    }

    /// The options joined as `1/5/10`.
    pub fn describe_options(&self) -> String {
        self.options
            .iter()
            .map(i32::to_string)
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl Default for StepSelector {
    fn default() -> Self {
        Self::new(DEFAULT_BIAS_STEPS.to_vec())
    }
}
