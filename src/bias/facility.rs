//! The bias facility a sensor may expose.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Inclusive integer range of bias values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasRange {
    pub min: i32,
    pub max: i32,
}

impl BiasRange {
    /// Build a range, swapping the bounds if a device reports them reversed.
    pub fn new(a: i32, b: i32) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: i32) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Default for BiasRange {
    fn default() -> Self {
        Self { min: 0, max: 255 }
    }
}

impl fmt::Display for BiasRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}

/// Device-reported metadata for one bias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasInfo {
    /// Range writes are clamped to
    pub recommended: BiasRange,
    /// Wider range the hardware accepts
    pub allowed: BiasRange,
    pub modifiable: bool,
    pub description: String,
    pub category: String,
}

impl BiasInfo {
    pub fn new(recommended: BiasRange, modifiable: bool) -> Self {
        Self {
            recommended,
            allowed: recommended,
            modifiable,
            description: String::new(),
            category: String::new(),
        }
    }

    pub fn with_allowed(mut self, allowed: BiasRange) -> Self {
        self.allowed = allowed;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>, category: impl Into<String>) -> Self {
        self.description = description.into();
        self.category = category.into();
        self
    }
}

/// Errors raised by bias operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BiasError {
    #[error("this device does not expose a bias facility")]
    Unsupported,
    #[error("bias \"{0}\" is not available on this camera")]
    UnknownBias(String),
    #[error("bias \"{0}\" is read-only and cannot be modified")]
    ReadOnly(String),
    #[error("failed to set bias \"{name}\" to {value}")]
    WriteFailed { name: String, value: i32 },
}

/// Access to a sensor's tunable biases.
///
/// `list` returns every bias the device reports, keyed by name in sorted
/// order. Writes are expected to be pre-validated by the caller; see
/// [`crate::bias::apply_bias`].
pub trait BiasFacility: Send {
    fn list(&self) -> BTreeMap<String, i32>;
    fn info(&self, name: &str) -> Option<BiasInfo>;
    fn get(&self, name: &str) -> Option<i32>;
    fn set(&mut self, name: &str, value: i32) -> Result<(), BiasError>;
}
