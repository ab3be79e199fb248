//! # Observability Configuration
//!
//! Environment-specific configuration for logging and metrics.

use std::env;

use crate::errors::{AppError, AppResult};

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Observability configuration for different environments
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// Log level for the engine's tracing target
    pub log_level: String,
    /// Whether to install the Prometheus metrics recorder
    pub enable_metrics_export: bool,
    /// Additional tags attached to metrics
    pub tags: Vec<(String, String)>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            enable_metrics_export: true,
            tags: Vec::new(),
        }
    }
}

impl ObservabilityConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("OBSERVABILITY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            enable_metrics_export: env::var("ENABLE_METRICS_EXPORT")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            tags: env::var("METRICS_TAGS")
                .map(|tags| parse_tags(&tags))
                .unwrap_or_default(),
        };
        config.add_default_tags();
        config
    }

    /// Add default tags based on environment and configuration
    fn add_default_tags(&mut self) {
        self.tags
            .push(("environment".to_string(), self.environment.clone()));
        self.tags
            .push(("service".to_string(), "citation-scan".to_string()));

        if let Ok(version) = env::var("SERVICE_VERSION") {
            self.tags.push(("version".to_string(), version));
        }
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Invalid observability log level: {}",
                self.log_level
            )));
        }

        if self.environment.trim().is_empty() {
            return Err(AppError::Config(
                "Environment name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse tags from environment variable string
/// Format: "key1=value1,key2=value2,key3=value3"
fn parse_tags(tags_str: &str) -> Vec<(String, String)> {
    tags_str
        .split(',')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(key), Some(value)) => {
                    Some((key.trim().to_string(), value.trim().to_string()))
                }
                _ => None,
            }
        })
        .collect()
}

/// Environment-specific configuration presets
pub mod presets {
    use super::ObservabilityConfig;

    /// Development configuration with verbose logging
    pub fn development() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "development".to_string(),
            log_level: "debug".to_string(),
            enable_metrics_export: true,
            ..Default::default()
        }
    }

    /// Production configuration
    pub fn production() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "production".to_string(),
            log_level: "warn".to_string(),
            enable_metrics_export: true,
            ..Default::default()
        }
    }

    /// Minimal configuration for batch runs
    pub fn minimal() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "minimal".to_string(),
            log_level: "error".to_string(),
            enable_metrics_export: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.environment, "development");
        assert_eq!(config.log_level, "info");
        assert!(config.enable_metrics_export);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ObservabilityConfig::default();

        // Invalid log level
        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());

        // Case-insensitive log level
        config.log_level = "DEBUG".to_string();
        assert!(config.validate().is_ok());

        // Invalid empty environment
        config.environment = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tag_parsing() {
        let tags = parse_tags("env=prod,version=1.2.3,broken");

        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0], ("env".to_string(), "prod".to_string()));
        assert_eq!(tags[1], ("version".to_string(), "1.2.3".to_string()));
    }

    #[test]
    fn test_presets() {
        let dev = presets::development();
        assert!(dev.is_development());
        assert!(!dev.is_production());

        let prod = presets::production();
        assert!(prod.is_production());

        let minimal = presets::minimal();
        assert!(!minimal.enable_metrics_export);
    }
}
