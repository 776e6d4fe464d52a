//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;
use std::path::PathBuf;

use super::AppConfig;

/// Environment variable prefix
const ENV_PREFIX: &str = "FIXTURE_RUNNER";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Reporting endpoint from FIXTURE_RUNNER_ENDPOINT
    pub endpoint: Option<String>,
    /// API key from FIXTURE_RUNNER_API_KEY
    pub api_key: Option<String>,
    /// Units per run from FIXTURE_RUNNER_UNITS
    pub units: Option<usize>,
    /// Retries from FIXTURE_RUNNER_RETRIES
    pub retries: Option<u32>,
    /// Seed from FIXTURE_RUNNER_SEED
    pub seed: Option<u64>,
    /// Log level from FIXTURE_RUNNER_LOG
    pub log: Option<String>,
    /// Pool directory from FIXTURE_RUNNER_POOL_DIR
    pub pool_dir: Option<String>,
    /// Outbox directory from FIXTURE_RUNNER_OUTBOX_DIR
    pub outbox_dir: Option<String>,
    /// Config file from FIXTURE_RUNNER_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            endpoint: get_env("ENDPOINT"),
            api_key: get_env("API_KEY"),
            units: get_env_parse("UNITS"),
            retries: get_env_parse("RETRIES"),
            seed: get_env_parse("SEED"),
            log: get_env("LOG"),
            pool_dir: get_env("POOL_DIR"),
            outbox_dir: get_env("OUTBOX_DIR"),
            config_file: get_env("CONFIG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.endpoint.is_some()
            || self.api_key.is_some()
            || self.units.is_some()
            || self.retries.is_some()
            || self.seed.is_some()
            || self.log.is_some()
            || self.pool_dir.is_some()
            || self.outbox_dir.is_some()
            || self.config_file.is_some()
    }

    /// Override file settings with whatever is set here
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.reporting.endpoint = endpoint.clone();
        }
        if let Some(key) = &self.api_key {
            config.reporting.api_key = Some(key.clone());
        }
        if let Some(units) = self.units {
            config.default_units = units;
        }
        if let Some(retries) = self.retries {
            config.station.max_retries = Some(retries);
        }
        if let Some(seed) = self.seed {
            config.station.seed = Some(seed);
        }
        if let Some(log) = &self.log {
            config.log_level = log.clone();
        }
        if let Some(dir) = &self.pool_dir {
            config.pool_dir = PathBuf::from(dir);
        }
        if let Some(dir) = &self.outbox_dir {
            config.outbox_dir = Some(PathBuf::from(dir));
        }
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_ENDPOINT:   {:?}", ENV_PREFIX, self.endpoint);
        println!(
            "  {}_API_KEY:    {}",
            ENV_PREFIX,
            if self.api_key.is_some() { "(set)" } else { "None" }
        );
        println!("  {}_UNITS:      {:?}", ENV_PREFIX, self.units);
        println!("  {}_RETRIES:    {:?}", ENV_PREFIX, self.retries);
        println!("  {}_SEED:       {:?}", ENV_PREFIX, self.seed);
        println!("  {}_LOG:        {:?}", ENV_PREFIX, self.log);
        println!("  {}_POOL_DIR:   {:?}", ENV_PREFIX, self.pool_dir);
        println!("  {}_OUTBOX_DIR: {:?}", ENV_PREFIX, self.outbox_dir);
        println!("  {}_CONFIG:     {:?}", ENV_PREFIX, self.config_file);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.is_empty())
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Builder for setting environment variables (useful for testing)
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    fn var(mut self, name: &str, value: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_{name}"), value.into()));
        self
    }

    pub fn endpoint(self, endpoint: impl Into<String>) -> Self {
        self.var("ENDPOINT", endpoint)
    }

    pub fn api_key(self, key: impl Into<String>) -> Self {
        self.var("API_KEY", key)
    }

    pub fn units(self, units: usize) -> Self {
        self.var("UNITS", units.to_string())
    }

    pub fn retries(self, retries: u32) -> Self {
        self.var("RETRIES", retries.to_string())
    }

    pub fn seed(self, seed: u64) -> Self {
        self.var("SEED", seed.to_string())
    }

    pub fn pool_dir(self, dir: impl Into<String>) -> Self {
        self.var("POOL_DIR", dir)
    }

    /// Apply environment variables
    pub fn apply(self) {
        for (key, value) in self.vars {
            env::set_var(key, value);
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

impl Default for EnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that restores environment variables on drop
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all FIXTURE_RUNNER environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_ENDPOINT     Reporting service base URL");
    println!("  {ENV_PREFIX}_API_KEY      Reporting service API key");
    println!("  {ENV_PREFIX}_UNITS        Units per run");
    println!("  {ENV_PREFIX}_RETRIES      Re-runs for failed units");
    println!("  {ENV_PREFIX}_SEED         Seed for simulation and serial numbers");
    println!("  {ENV_PREFIX}_LOG          Log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_POOL_DIR     Directory of sub-unit pool files");
    println!("  {ENV_PREFIX}_OUTBOX_DIR   Directory for undeliverable submissions");
    println!("  {ENV_PREFIX}_CONFIG       Path to configuration file");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_ENDPOINT=https://reports.example.com/api");
    println!("  export {ENV_PREFIX}_API_KEY=...");
    println!("  fixture-runner run pcba-rf-motherboard -n 10");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.endpoint.is_none());
        assert!(!config.has_any());
    }

    #[test]
    fn test_env_builder() {
        let _guard = EnvBuilder::new()
            .endpoint("https://reports.test")
            .retries(3)
            .seed(77)
            .apply_scoped();

        let config = EnvConfig::load();
        assert_eq!(config.endpoint.as_deref(), Some("https://reports.test"));
        assert_eq!(config.retries, Some(3));
        assert_eq!(config.seed, Some(77));
    }

    #[test]
    fn test_apply_to_overrides_file_settings() {
        let env = EnvConfig {
            api_key: Some("k".to_string()),
            units: Some(25),
            pool_dir: Some("/tmp/pools".to_string()),
            ..Default::default()
        };
        assert!(env.has_any());

        let mut config = AppConfig::default();
        env.apply_to(&mut config);
        assert_eq!(config.reporting.api_key.as_deref(), Some("k"));
        assert_eq!(config.default_units, 25);
        assert_eq!(config.pool_dir, PathBuf::from("/tmp/pools"));
        assert_eq!(config.reporting.timeout_secs, 30);
    }
}
