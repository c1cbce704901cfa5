//! Configuration validation.
//!
//! Serde handles syntax; this checks values a parsed file can still get
//! wrong. Every problem is reported, not just the first.

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

const DATABASE_SCHEMES: &[&str] = &["memory:", "mysql:", "sqlite:"];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
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

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let url = config.database.url.trim();
    if url.is_empty() {
        errors.push(ValidationError::new("database.url", "must not be empty"));
    } else if !DATABASE_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        errors.push(ValidationError::new(
            "database.url",
            format!("unsupported scheme, expected one of {}", DATABASE_SCHEMES.join(", ")),
        ));
    }

    if config.database.max_connections == 0 {
        errors.push(ValidationError::new("database.max_connections", "must be at least 1"));
    }

    if config.database.acquire_timeout_secs == 0 {
        errors.push(ValidationError::new("database.acquire_timeout_secs", "must be at least 1"));
    }

    if config.blocklist.interval_key.trim().is_empty() {
        errors.push(ValidationError::new("blocklist.interval_key", "must not be empty"));
    }

    if config.blocklist.default_interval_secs == 0 {
        errors.push(ValidationError::new(
            "blocklist.default_interval_secs",
            "must be at least 1",
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be at least 1"));
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("'{}' is not a log level", config.observability.log_level),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
