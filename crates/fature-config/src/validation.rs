//! Configuration validation.
//!
//! Collects every problem in one pass so a misconfigured deployment fails
//! fast at startup with the full list instead of one error per restart.

use crate::{AppConfig, CacheBackend, CacheConfig, DatabaseConfig, ObservabilityConfig};
use std::fmt;
use std::net::SocketAddr;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// Cache host is empty.
    EmptyHost,
    /// Port number is invalid (must be 1-65535).
    InvalidPort { name: String, value: u16 },
    /// Pool size must be at least one.
    EmptyPool,
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: usize, maximum: usize },
    /// URL or address format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Timeout value must be positive.
    NonPositiveTimeout { name: String },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// Log format is invalid.
    InvalidLogFormat { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyHost => write!(f, "Cache host cannot be empty"),
            Self::InvalidPort { name, value } => {
                write!(f, "Invalid port for {}: {} (must be 1-65535)", name, value)
            }
            Self::EmptyPool => write!(f, "Cache pool size must be at least 1"),
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(f, "Pool size {} exceeds maximum allowed ({})", value, maximum)
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::NonPositiveTimeout { name } => {
                write!(f, "Timeout '{}' must be positive", name)
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
            Self::InvalidLogFormat { value } => {
                write!(f, "Invalid log format: '{}' (valid: json, pretty)", value)
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connections per partition pool.
    const MAX_POOL_SIZE: usize = 1000;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];
    /// Valid log formats.
    const VALID_LOG_FORMATS: &'static [&'static str] = &["json", "pretty"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_cache(&config.cache, &mut errors);
        Self::validate_database(&config.database, &mut errors);
        Self::validate_observability(&config.observability, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_cache(config: &CacheConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.pool_size == 0 {
            errors.push(ConfigValidationError::EmptyPool);
        } else if config.pool_size > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeTooLarge {
                value: config.pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        if config.health_check_interval_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "cache.health_check_interval_secs".to_string(),
            });
        }

        // Transport settings are irrelevant for the in-process backend.
        if config.backend == CacheBackend::Memory {
            return;
        }

        if config.host.trim().is_empty() {
            errors.push(ConfigValidationError::EmptyHost);
        }
        if config.port == 0 {
            errors.push(ConfigValidationError::InvalidPort {
                name: "cache.port".to_string(),
                value: config.port,
            });
        }
        if config.socket_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "cache.socket_timeout_secs".to_string(),
            });
        }
        if config.socket_connect_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "cache.socket_connect_timeout_secs".to_string(),
            });
        }
        if !config.host.trim().is_empty() && config.port != 0 {
            if let Err(e) = config.connection_url(0) {
                errors.push(ConfigValidationError::InvalidUrl {
                    url_type: "cache".to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    fn validate_database(config: &DatabaseConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.url.is_empty() {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL cannot be empty".to_string(),
            });
        } else if url::Url::parse(&config.url).is_err() {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: format!("Invalid URL format: {}", config.url),
            });
        }
    }

    fn validate_observability(config: &ObservabilityConfig, errors: &mut Vec<ConfigValidationError>) {
        let level = config.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
            });
        }

        let format = config.log_format.to_lowercase();
        if !Self::VALID_LOG_FORMATS.contains(&format.as_str()) {
            errors.push(ConfigValidationError::InvalidLogFormat {
                value: config.log_format.clone(),
            });
        }

        if config.metrics_enabled && config.metrics_addr.parse::<SocketAddr>().is_err() {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "metrics_addr".to_string(),
                message: format!("Invalid socket address: {}", config.metrics_addr),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigValidator::validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_cache_errors() {
        let mut config = AppConfig::default();
        config.cache.host = String::new();
        config.cache.port = 0;
        config.cache.socket_timeout_secs = 0;
        config.cache.pool_size = 0;

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert!(errors.contains(&ConfigValidationError::EmptyHost));
        assert!(errors.contains(&ConfigValidationError::EmptyPool));
        assert!(errors.iter().any(|e| matches!(e, ConfigValidationError::InvalidPort { .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigValidationError::NonPositiveTimeout { name } if name == "cache.socket_timeout_secs")));
    }

    #[test]
    fn test_memory_backend_skips_transport_checks() {
        let mut config = AppConfig::default();
        config.cache.backend = CacheBackend::Memory;
        config.cache.host = String::new();
        config.cache.port = 0;

        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_pool_size_too_large() {
        let mut config = AppConfig::default();
        config.cache.pool_size = 5000;

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ConfigValidationError::PoolSizeTooLarge {
                value: 5000,
                maximum: 1000
            }]
        );
    }

    #[test]
    fn test_invalid_observability() {
        let mut config = AppConfig::default();
        config.observability.log_level = "loud".to_string();
        config.observability.log_format = "xml".to_string();

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("loud"));
        assert!(errors[1].to_string().contains("xml"));
    }

    #[test]
    fn test_invalid_database_url() {
        let mut config = AppConfig::default();
        config.database.url = "not a url".to_string();

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert!(matches!(&errors[0], ConfigValidationError::InvalidUrl { url_type, .. } if url_type == "database"));
    }
}
