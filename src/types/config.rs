//! Configuration for flagtrail.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{FlagError, FlagResult};

/// Default number of flag evaluations retained per scope.
pub const DEFAULT_FLAG_CAPACITY: usize = 100;

/// Main configuration for flagtrail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Flag buffer settings.
    #[serde(default)]
    pub flags: FlagsConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];

/// Flag buffer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagsConfig {
    /// Record evaluations at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of distinct flags kept per scope.
    #[serde(default = "default_flag_capacity")]
    pub capacity: usize,
}

impl Default for FlagsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_flag_capacity(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_flag_capacity() -> usize {
    DEFAULT_FLAG_CAPACITY
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> FlagResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> FlagResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Creates default configuration.
    pub fn default_config() -> Self {
        Self {
            general: GeneralConfig::default(),
            flags: FlagsConfig::default(),
        }
    }

    /// Checks values serde cannot reject on its own.
    pub fn validate(&self) -> FlagResult<()> {
        if self.flags.capacity == 0 {
            return Err(FlagError::InvalidCapacity(0));
        }
        if !LOG_LEVELS.contains(&self.general.log_level.as_str()) {
            return Err(FlagError::config(format!(
                "unknown log level '{}' (expected one of: {})",
                self.general.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        if !LOG_FORMATS.contains(&self.general.log_format.as_str()) {
            return Err(FlagError::config(format!(
                "unknown log format '{}' (expected text or json)",
                self.general.log_format
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default_config();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "text");
        assert!(config.flags.enabled);
        assert_eq!(config.flags.capacity, DEFAULT_FLAG_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[flags]\ncapacity = 7\n").unwrap();
        assert_eq!(config.flags.capacity, 7);
        assert!(config.flags.enabled);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flagtrail.toml");

        let mut config = Config::default_config();
        config.flags.capacity = 42;
        config.general.log_format = "json".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.flags.capacity, 42);
        assert_eq!(loaded.general.log_format, "json");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flagtrail.toml");
        std::fs::write(&path, "[flags]\ncapacity = 0\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, FlagError::InvalidCapacity(0)));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut config = Config::default_config();
        config.general.log_level = "loud".to_string();
        assert!(matches!(config.validate(), Err(FlagError::Config(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = Config::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, FlagError::Io(_)));
    }
}
