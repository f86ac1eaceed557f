//! Configuration for the window logger.

use crate::bias::DEFAULT_BIAS_STEPS;
use crate::collector::synthetic::SyntheticConfig;
use crate::core::queue::DEFAULT_MAX_QUEUE_SIZE;
use crate::core::windowing::{DEFAULT_WINDOW_DURATION_US, MAX_WINDOW_DURATION_US};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the logger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Length of each accumulation window in sensor microseconds
    pub window_duration_us: i64,

    /// Capacity of the handoff queue, in batches
    pub max_queue_size: usize,

    /// Root directory for recording runs and captures
    pub output_root: PathBuf,

    /// How often the interactive loop refreshes the display
    #[serde(with = "duration_serde")]
    pub display_interval: Duration,

    /// Increments offered by the bias step selector
    pub bias_steps: Vec<i32>,

    /// The software camera used when no hardware backend is present
    pub synthetic: SyntheticConfig,

    /// Where to save the session statistics on exit
    pub stats_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_duration_us: DEFAULT_WINDOW_DURATION_US,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            output_root: PathBuf::from("output"),
            display_interval: Duration::from_millis(1),
            bias_steps: DEFAULT_BIAS_STEPS.to_vec(),
            synthetic: SyntheticConfig::default(),
            stats_path: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("evs-window-logger")
            .join("config.json")
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_WINDOW_DURATION_US).contains(&self.window_duration_us) {
            return Err(ConfigError::Invalid(format!(
                "window_duration_us must be in 1..={MAX_WINDOW_DURATION_US}, got {}",
                self.window_duration_us
            )));
        }
        if self.max_queue_size == 0 {
            return Err(ConfigError::Invalid("max_queue_size must be at least 1".into()));
        }
        if self.bias_steps.is_empty() {
            return Err(ConfigError::Invalid("bias_steps must not be empty".into()));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Serialize error: {0}")]
    Serialize(serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration, as whole milliseconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("evs-config-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window_duration_us, 2000);
        assert_eq!(config.max_queue_size, 200);
        assert_eq!(config.output_root, PathBuf::from("output"));
        assert_eq!(config.display_interval, Duration::from_millis(1));
        assert_eq!(config.bias_steps, vec![1, 5, 10, 20, 50]);
        assert!(config.stats_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let path = scratch("partial");
        fs::write(&path, r#"{"window_duration_us": 5000, "display_interval": 16}"#).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.window_duration_us, 5000);
        assert_eq!(config.display_interval, Duration::from_millis(16));
        assert_eq!(config.max_queue_size, 200);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_save_and_load() {
        let path = scratch("roundtrip");
        let config = Config {
            output_root: PathBuf::from("/tmp/evs-out"),
            stats_path: Some(PathBuf::from("/tmp/evs-stats.json")),
            ..Config::default()
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_validation() {
        let zero_window = Config {
            window_duration_us: 0,
            ..Config::default()
        };
        assert!(matches!(zero_window.validate(), Err(ConfigError::Invalid(_))));

        let huge_window = Config {
            window_duration_us: i64::MAX,
            ..Config::default()
        };
        assert!(matches!(huge_window.validate(), Err(ConfigError::Invalid(_))));

        let one_hour = Config {
            window_duration_us: MAX_WINDOW_DURATION_US,
            ..Config::default()
        };
        assert!(one_hour.validate().is_ok());

        let zero_queue = Config {
            max_queue_size: 0,
            ..Config::default()
        };
        assert!(zero_queue.validate().is_err());

        let no_steps = Config {
            bias_steps: Vec::new(),
            ..Config::default()
        };
        assert!(no_steps.validate().is_err());
    }

    #[test]
    fn test_malformed_file() {
        let path = scratch("malformed");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
        let _ = fs::remove_file(path);
    }
}
