//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (status codes, range bounds)
//! - Reject blank method names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RetrySlotConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{RetryConfig, RetrySlotConfig, StatusRule};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("status code {0} is outside 100..=999")]
    StatusOutOfRange(u16),

    #[error("status range [{low}, {high}] has low > high")]
    InvertedRange { low: u16, high: u16 },

    #[error("allowed_methods contains an empty method name")]
    EmptyMethod,

    #[error("log level '{0}' is not one of trace, debug, info, warn, error")]
    UnknownLogLevel(String),
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a full configuration file.
pub fn validate_config(config: &RetrySlotConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = retry_errors(&config.retry);

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the retry section alone.
pub fn validate_retry(config: &RetryConfig) -> Result<(), Vec<ValidationError>> {
    let errors = retry_errors(config);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn retry_errors(config: &RetryConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for rule in &config.allowed_http_status {
        match *rule {
            StatusRule::Code(code) => check_status(code, &mut errors),
            StatusRule::Range([low, high]) => {
                check_status(low, &mut errors);
                check_status(high, &mut errors);
                if low > high {
                    errors.push(ValidationError::InvertedRange { low, high });
                }
            }
        }
    }

    if let Some(methods) = &config.allowed_methods {
        if methods.iter().any(|m| m.trim().is_empty()) {
            errors.push(ValidationError::EmptyMethod);
        }
    }

    errors
}

fn check_status(code: u16, errors: &mut Vec<ValidationError>) {
    if !(100..=999).contains(&code) {
        errors.push(ValidationError::StatusOutOfRange(code));
    }
}
