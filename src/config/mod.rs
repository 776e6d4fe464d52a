//! Configuration module
//!
//! Application settings, config file discovery and environment overrides.

pub mod env;
pub mod file;

pub use env::EnvConfig;
pub use file::ConfigFile;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::executor::{RetryPolicy, StationConfig};
use crate::report::DurationMode;
use crate::results::Outbox;

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Reporting service settings
    pub reporting: ReportingConfig,

    /// Station overrides applied to every fixture
    pub station: StationSettings,

    /// Directory holding sub-unit pool files
    pub pool_dir: PathBuf,

    /// Outbox for undeliverable submissions; user data dir when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbox_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Units per `run` when `-n` is not given
    pub default_units: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reporting: ReportingConfig::default(),
            station: StationSettings::default(),
            pool_dir: PathBuf::from("pools"),
            outbox_dir: None,
            log_level: "info".to_string(),
            default_units: 1,
        }
    }
}

impl AppConfig {
    /// Station settings for a run
    pub fn station_config(&self) -> StationConfig {
        StationConfig {
            retry: self.station.max_retries.map(RetryPolicy::new),
            policy: None,
            duration_mode: self.station.duration_mode,
            suffix_length: self.station.suffix_length,
            static_segment: self.station.static_segment.clone(),
            seed: self.station.seed,
            pool_dir: self.pool_dir.clone(),
        }
    }

    pub fn outbox(&self) -> Outbox {
        Outbox::new(self.outbox_dir.clone().unwrap_or_else(Outbox::default_dir))
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.reporting.timeout_secs == 0 {
            anyhow::bail!("reporting.timeout_secs must be greater than 0");
        }
        if let Some(len) = self.station.suffix_length {
            if !(1..=12).contains(&len) {
                anyhow::bail!("station.suffix_length must be between 1 and 12, got {len}");
            }
        }
        if self.default_units == 0 {
            anyhow::bail!("default_units must be at least 1");
        }
        Ok(())
    }

    /// Copy with the API key hidden, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.reporting.api_key.is_some() {
            config.reporting.api_key = Some("********".to_string());
        }
        config
    }
}

/// Reporting service configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Base URL; submissions go to `<endpoint>/v1/runs`
    pub endpoint: String,

    /// Bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,

    /// Write submissions here instead of sending them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offline_dir: Option<PathBuf>,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            api_key: None,
            timeout_secs: 30,
            offline_dir: None,
        }
    }
}

/// Station overrides
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationSettings {
    /// Re-runs for failed units; the fixture's own policy when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Declared or measured step durations in submissions
    pub duration_mode: DurationMode,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix_length: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_segment: Option<String>,

    /// Seed for simulation and serial numbers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.reporting.timeout_secs, 30);
        assert_eq!(config.default_units, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_station_config_mapping() {
        let mut config = AppConfig::default();
        config.station.max_retries = Some(2);
        config.station.seed = Some(9);
        config.pool_dir = PathBuf::from("/var/lib/pools");

        let station = config.station_config();
        assert_eq!(station.retry, Some(RetryPolicy::new(2)));
        assert_eq!(station.seed, Some(9));
        assert_eq!(station.pool_dir, PathBuf::from("/var/lib/pools"));
        assert_eq!(station.policy, None);
    }

    #[test]
    fn test_validate_ranges() {
        let mut config = AppConfig::default();
        config.station.suffix_length = Some(13);
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.reporting.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_redacted_hides_api_key() {
        let mut config = AppConfig::default();
        config.reporting.api_key = Some("secret".to_string());
        assert_eq!(config.redacted().reporting.api_key.as_deref(), Some("********"));
        assert_eq!(AppConfig::default().redacted().reporting.api_key, None);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("reporting:\n  endpoint: https://reports.local\n").unwrap();
        assert_eq!(config.reporting.endpoint, "https://reports.local");
        assert_eq!(config.reporting.timeout_secs, 30);
        assert_eq!(config.pool_dir, PathBuf::from("pools"));
    }
}
