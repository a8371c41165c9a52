//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::pipeline::compress::MAX_QUALITY;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
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

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.backend.address.contains("://") {
        errors.push(ValidationError::new(
            "backend.address",
            "expected host:port without a scheme",
        ));
    } else if config.backend.address.parse::<Authority>().is_err() {
        errors.push(ValidationError::new(
            "backend.address",
            format!("'{}' is not a valid authority", config.backend.address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let pipeline = &config.pipeline;
    if pipeline.size_limiter.max_bytes == 0 {
        errors.push(ValidationError::new(
            "pipeline.size_limiter.max_bytes",
            "must be greater than 0",
        ));
    }
    if pipeline.compressor.quality > MAX_QUALITY {
        errors.push(ValidationError::new(
            "pipeline.compressor.quality",
            format!("must be at most {MAX_QUALITY}"),
        ));
    }
    if pipeline.max_read_bytes == Some(0) {
        errors.push(ValidationError::new("pipeline.max_read_bytes", "must be greater than 0"));
    }
    if pipeline.budget_ms == Some(0) {
        errors.push(ValidationError::new("pipeline.budget_ms", "must be greater than 0"));
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", observability.log_level),
        ));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&ProxyConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.backend.address = "http://127.0.0.1:2025".into();
        config.pipeline.size_limiter.max_bytes = 0;
        config.pipeline.compressor.quality = 12;
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();

        assert_eq!(
            fields,
            [
                "listener.bind_address",
                "backend.address",
                "pipeline.size_limiter.max_bytes",
                "pipeline.compressor.quality",
                "observability.log_level",
            ]
        );
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
