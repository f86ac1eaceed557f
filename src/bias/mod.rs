//! Sensor bias access.
//!
//! Biases are tuned through a [`BiasFacility`] obtained from the open event
//! source. Every write is clamped to the recommended range and read-only
//! biases are never written.

pub mod facility;
pub mod memory;
pub mod ops;

pub use facility::{BiasError, BiasFacility, BiasInfo, BiasRange};
pub use memory::MemoryBiases;
pub use ops::{adjust_bias, apply_bias, describe_biases, BiasWrite, StepSelector, DEFAULT_BIAS_STEPS};
