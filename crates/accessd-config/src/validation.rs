//! Configuration validation
//!
//! Validates configuration values and ensures consistency

use thiserror::Error;

use crate::{CacheConfig, Config};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid cache capacity: {0} (must be > 0)")]
    InvalidCacheCapacity(u64),

    #[error("Invalid cache TTL: {0} (must be > 0)")]
    InvalidCacheTTL(u64),

    #[error("Invalid log level: {0} (must be one of: trace, debug, info, warn, error)")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0} (must be one of: text, json)")]
    InvalidLogFormat(String),

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type alias for validation operations
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Validate complete configuration
pub fn validate(config: &Config) -> Result<()> {
    let mut errors: Vec<ValidationError> = [
        validate_logging(&config.logging),
        validate_log_format(&config.log_format),
        validate_cache(&config.cache),
    ]
    .into_iter()
    .filter_map(std::result::Result::err)
    .collect();

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

/// Validate logging level
pub fn validate_logging(level: &str) -> Result<()> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::InvalidLogLevel(level.to_string())),
    }
}

/// Validate log output format
pub fn validate_log_format(format: &str) -> Result<()> {
    match format.to_lowercase().as_str() {
        "text" | "json" => Ok(()),
        _ => Err(ValidationError::InvalidLogFormat(format.to_string())),
    }
}

/// Validate cache configuration
///
/// Capacity and TTL only matter when caching is enabled.
pub fn validate_cache(config: &CacheConfig) -> Result<()> {
    if config.enabled {
        if config.max_capacity == 0 {
            return Err(ValidationError::InvalidCacheCapacity(config.max_capacity));
        }

        if config.ttl == 0 {
            return Err(ValidationError::InvalidCacheTTL(config.ttl));
        }
    }

    Ok(())
}
