//! Store configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file is a valid
//! configuration.

use crate::calendar::ZoneCalendar;
use crate::error::{RateError, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Roughly 90 days of half-hourly samples
pub const DEFAULT_RATE_HISTORY_CAPACITY: usize = 24 * 90;

/// Minimum age of the newest sample before another is admitted
pub const DEFAULT_MIN_SAMPLE_INTERVAL_MINUTES: i64 = 30;

pub const DEFAULT_CONVERSION_HISTORY_CAPACITY: usize = 50;

/// Configuration for the stores and the reporting calendar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatekeeperConfig {
    /// IANA timezone every day key is computed in
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_rate_history_capacity")]
    pub rate_history_capacity: usize,

    #[serde(default = "default_min_sample_interval_minutes")]
    pub min_sample_interval_minutes: i64,

    #[serde(default = "default_conversion_history_capacity")]
    pub conversion_history_capacity: usize,

    /// Directory for file and SQLite backends
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_rate_history_capacity() -> usize {
    DEFAULT_RATE_HISTORY_CAPACITY
}

fn default_min_sample_interval_minutes() -> i64 {
    DEFAULT_MIN_SAMPLE_INTERVAL_MINUTES
}

fn default_conversion_history_capacity() -> usize {
    DEFAULT_CONVERSION_HISTORY_CAPACITY
}

impl Default for RatekeeperConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            rate_history_capacity: default_rate_history_capacity(),
            min_sample_interval_minutes: default_min_sample_interval_minutes(),
            conversion_history_capacity: default_conversion_history_capacity(),
            data_dir: None,
        }
    }
}

impl RatekeeperConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| RateError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Reject settings the stores cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.rate_history_capacity == 0 {
            return Err(RateError::ConfigError(
                "rate_history_capacity must be greater than zero".to_string(),
            ));
        }
        if self.conversion_history_capacity == 0 {
            return Err(RateError::ConfigError(
                "conversion_history_capacity must be greater than zero".to_string(),
            ));
        }
        if self.min_sample_interval_minutes < 0 {
            return Err(RateError::ConfigError(format!(
                "min_sample_interval_minutes must not be negative, got {}",
                self.min_sample_interval_minutes
            )));
        }
        if Duration::try_minutes(self.min_sample_interval_minutes).is_none() {
            return Err(RateError::ConfigError(format!(
                "min_sample_interval_minutes is out of range, got {}",
                self.min_sample_interval_minutes
            )));
        }
        self.calendar()?;
        Ok(())
    }

    /// Reporting calendar for the configured timezone
    pub fn calendar(&self) -> Result<ZoneCalendar> {
        ZoneCalendar::from_name(&self.timezone)
    }

    /// Throttle interval; saturates for values `validate` would reject
    pub fn min_sample_interval(&self) -> Duration {
        Duration::try_minutes(self.min_sample_interval_minutes).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::DayCalendar;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RatekeeperConfig::from_toml_str("").unwrap();
        assert_eq!(config, RatekeeperConfig::default());
        assert_eq!(config.rate_history_capacity, 2160);
        assert_eq!(config.conversion_history_capacity, 50);
        assert_eq!(config.min_sample_interval(), Duration::minutes(30));
    }

    #[test]
    fn test_partial_config() {
        let config = RatekeeperConfig::from_toml_str(
            r#"
            timezone = "America/Caracas"
            rate_history_capacity = 100
            data_dir = "/tmp/ratekeeper"
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_history_capacity, 100);
        assert_eq!(config.conversion_history_capacity, 50);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/ratekeeper")));
        assert_eq!(
            config.calendar().unwrap().timezone(),
            chrono_tz::America::Caracas
        );
    }

    #[test]
    fn test_invalid_configs() {
        assert!(RatekeeperConfig::from_toml_str("rate_history_capacity = 0").is_err());
        assert!(RatekeeperConfig::from_toml_str("conversion_history_capacity = 0").is_err());
        assert!(RatekeeperConfig::from_toml_str("min_sample_interval_minutes = -5").is_err());
        assert!(RatekeeperConfig::from_toml_str(
            "min_sample_interval_minutes = 9223372036854775807"
        )
        .is_err());
        assert!(RatekeeperConfig::from_toml_str(r#"timezone = "Nowhere/City""#).is_err());
        assert!(RatekeeperConfig::from_toml_str("timezone = [").is_err());
    }

    #[test]
    fn test_unvalidated_interval_saturates() {
        let config = RatekeeperConfig {
            min_sample_interval_minutes: i64::MAX,
            ..RatekeeperConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.min_sample_interval(), Duration::MAX);
    }
}
