//! # Application Error Types
//!
//! This module defines the error types used throughout the citation scanning engine.
//! Classification itself never fails: only construction of the engine from its
//! static tables and configuration can produce an error.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration defects (invalid pattern tables, weights that do not sum to 1.0)
    Config(String),
    /// Malformed caller input at the binary edge (bad JSON payloads)
    Validation(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Validation(msg) => write!(f, "[VALIDATION] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<regex::Error> for AppError {
    fn from(err: regex::Error) -> Self {
        AppError::Config(format!("invalid regex pattern: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("invalid JSON: {}", err))
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the application
pub mod error_logging {
    use tracing::error;

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }

    /// Log validation errors with input context
    pub fn log_validation_error(
        error: &impl std::fmt::Display,
        operation: &str,
        input_type: &str,
        input_value: Option<&str>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            input_type = %input_type,
            input_value = ?input_value.map(truncate_for_log),
            "Validation failed"
        );
    }

    fn truncate_for_log(value: &str) -> String {
        if value.chars().count() > 100 {
            format!("{}...", value.chars().take(100).collect::<String>())
        } else {
            value.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_is_tagged() {
        assert_eq!(
            AppError::Config("bad weights".to_string()).to_string(),
            "[CONFIG] bad weights"
        );
        assert_eq!(
            AppError::Validation("bad payload".to_string()).to_string(),
            "[VALIDATION] bad payload"
        );
    }

    #[test]
    fn test_regex_error_maps_to_config() {
        let err = regex::Regex::new("([0-9]").unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Config(_)));
    }

    #[test]
    fn test_json_error_maps_to_validation() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Validation(_)));
    }
}
