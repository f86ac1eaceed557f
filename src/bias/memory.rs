//! In-memory bias facility.
//!
//! Backs the synthetic camera and stands in for hardware in tests.

use super::facility::{BiasError, BiasFacility, BiasInfo, BiasRange};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct Entry {
    value: i32,
    info: BiasInfo,
}

/// A bias facility that keeps values in a map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBiases {
    entries: BTreeMap<String, Entry>,
    set_calls: usize,
    fail_writes: bool,
}

impl MemoryBiases {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bias set of a typical contrast-detection sensor.
    pub fn with_defaults() -> Self {
        let mut biases = Self::new();
        biases.insert(
            "bias_diff",
            0,
            BiasInfo::new(BiasRange::new(-25, 23), false)
                .with_description("Reference level of the contrast detector", "Contrast"),
        );
        biases.insert(
            "bias_diff_on",
            0,
            BiasInfo::new(BiasRange::new(-85, 140), true)
                .with_allowed(BiasRange::new(-85, 180))
                .with_description("ON contrast threshold", "Contrast"),
        );
        biases.insert(
            "bias_diff_off",
            0,
            BiasInfo::new(BiasRange::new(-35, 190), true)
                .with_allowed(BiasRange::new(-35, 210))
                .with_description("OFF contrast threshold", "Contrast"),
        );
        biases.insert(
            "bias_fo",
            0,
            BiasInfo::new(BiasRange::new(-35, 55), true)
                .with_description("Low-pass filter cut-off", "Bandwidth"),
        );
        biases.insert(
            "bias_hpf",
            0,
            BiasInfo::new(BiasRange::new(0, 120), true)
                .with_description("High-pass filter cut-off", "Bandwidth"),
        );
        biases.insert(
            "bias_refr",
            0,
            BiasInfo::new(BiasRange::new(-20, 235), true)
                .with_description("Refractory period", "Advanced"),
        );
        biases
    }

    pub fn insert(&mut self, name: impl Into<String>, value: i32, info: BiasInfo) {
        self.entries.insert(name.into(), Entry { value, info });
    }

    /// Number of times [`BiasFacility::set`] reached this facility.
    pub fn set_calls(&self) -> usize {
        self.set_calls
    }

    /// Make every subsequent write fail, as a flaky device would.
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl BiasFacility for MemoryBiases {
    fn list(&self) -> BTreeMap<String, i32> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.value))
            .collect()
    }

    fn info(&self, name: &str) -> Option<BiasInfo> {
        self.entries.get(name).map(|entry| entry.info.clone())
    }

    fn get(&self, name: &str) -> Option<i32> {
        self.entries.get(name).map(|entry| entry.value)
    }

    fn set(&mut self, name: &str, value: i32) -> Result<(), BiasError> {
        self.set_calls += 1;
        if self.fail_writes {
            return Err(BiasError::WriteFailed {
                name: name.to_string(),
                value,
            });
        }
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| BiasError::UnknownBias(name.to_string()))?;
        if !entry.info.allowed.contains(value) {
            return Err(BiasError::WriteFailed {
                name: name.to_string(),
                value,
            });
        }
        entry.value = value;
        Ok(())
    }
}
