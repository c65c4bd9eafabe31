//! # Accessd Config - Configuration Management
//!
//! Handles configuration loading from files and environment variables.
//!
//! ```yaml
//! logging: "info"
//! log_format: "text"
//! cache:
//!   enabled: true
//!   max_capacity: 50
//!   ttl: 86400
//! ```

pub mod validation;

use std::{path::Path, time::Duration};

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

pub use validation::{ValidationError, validate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_logging")]
    pub logging: String,

    /// Log output format (text, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: default_logging(),
            log_format: default_log_format(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Whether logs should be emitted as JSON lines
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

fn default_logging() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Snapshot cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache computed snapshots; when false every lookup recomputes
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Maximum number of cached snapshots
    #[serde(default = "default_cache_max_capacity")]
    pub max_capacity: u64,

    /// Snapshot time-to-live in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            max_capacity: default_cache_max_capacity(),
            ttl: default_cache_ttl(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_max_capacity() -> u64 {
    50
}

fn default_cache_ttl() -> u64 {
    86400 // 24 hours
}

/// Load configuration from file and environment
///
/// Environment variables use the `ACCESSD__` prefix:
/// - `ACCESSD__LOGGING=debug`
/// - `ACCESSD__CACHE__ENABLED=false`
/// - `ACCESSD__CACHE__TTL=3600`
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    // Layer 1 (defaults) is handled by serde deserialization
    // Layer 2: file source, only overrides if the file exists
    let builder = ConfigBuilder::builder().add_source(File::from(path.as_ref()).required(false));

    // Layer 3: environment variables (highest precedence)
    let builder =
        builder.add_source(Environment::with_prefix("ACCESSD").separator("__").try_parsing(true));

    builder.build()?.try_deserialize()
}

/// Load configuration with defaults
///
/// Logs a warning and falls back to defaults instead of failing.
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Config {
    match load(path.as_ref()) {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully from {:?}", path.as_ref());
            config
        },
        Err(e) => {
            tracing::warn!(
                "Failed to load config from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Config::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging, "info");
        assert!(!config.json_logs());
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_capacity, 50);
        assert_eq!(config.cache.ttl(), Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "logging: debug\nlog_format: json\ncache:\n  enabled: false\n  ttl: 60")
            .unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.logging, "debug");
        assert!(config.json_logs());
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.ttl, 60);
        // Unset keys keep their defaults
        assert_eq!(config.cache.max_capacity, 50);
    }

    #[test]
    fn test_load_or_default_on_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "cache: [this is not a map").unwrap();

        let config = load_or_default(file.path());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_cache_config_deserialize_partial() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, r#"{{"cache": {{"max_capacity": 500}}}}"#).unwrap();

        let config = load(file.path()).unwrap();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_capacity, 500);
        assert_eq!(config.cache.ttl, 86400);
    }
}
