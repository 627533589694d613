//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Reject ambiguous middleware declarations
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WebConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::WebConfig;

/// A single semantic problem, tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &WebConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ValidationError::new("server.port", "must be greater than 0"));
    }

    if config.dispatcher.max_forwards == 0 {
        errors.push(ValidationError::new("dispatcher.max_forwards", "must be greater than 0"));
    }

    let mut seen = HashSet::new();
    for name in &config.dispatcher.middleware {
        if name.trim().is_empty() {
            errors.push(ValidationError::new("dispatcher.middleware", "names must not be empty"));
        } else if !seen.insert(name.as_str()) {
            errors.push(ValidationError::new(
                "dispatcher.middleware",
                format!("'{}' is listed more than once", name),
            ));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.context.sweep_enabled && config.context.cleanup_interval_secs == 0 {
        errors.push(ValidationError::new(
            "context.cleanup_interval_secs",
            "must be greater than 0 when sweeping is enabled",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
