//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Reject unit paths that could escape the handler root
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.limits.max_concurrency == 0 {
        errors.push(ValidationError::new(
            "limits.max_concurrency",
            "must be at least 1",
        ));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be positive"));
    }

    let extension = &config.handlers.extension;
    if extension.is_empty() || extension.contains('.') || extension.contains('/') {
        errors.push(ValidationError::new(
            "handlers.extension",
            "must be a bare extension such as 'rhai'",
        ));
    }

    if let Some(entry) = &config.handlers.entry_unit {
        if entry.contains("..") {
            errors.push(ValidationError::new(
                "handlers.entry_unit",
                "must not contain '..'",
            ));
        }
    }

    if let Some(0) = config.timeouts.request_secs {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be positive when set",
        ));
    }

    let index = &config.static_files.index_file;
    if index.is_empty() || index.contains('/') || index.contains("..") {
        errors.push(ValidationError::new(
            "static_files.index_file",
            "must be a plain file name",
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
