//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds, windows and timeouts > 0)
//! - Check that the selected storage backend has what it needs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ConfigurationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::{ServiceConfig, StorageKind};
use crate::error::ConfigurationError;

/// Validate a loaded configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ConfigurationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ConfigurationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ConfigurationError::new(
            "server.request_timeout_secs",
            "must be positive",
        ));
    }

    let breaker = &config.circuit_breaker;
    if breaker.fail_threshold == 0 {
        errors.push(ConfigurationError::new(
            "circuit_breaker.fail_threshold",
            "must be positive",
        ));
    }
    if breaker.reset_timeout_secs == 0 {
        errors.push(ConfigurationError::new(
            "circuit_breaker.reset_timeout_secs",
            "must be positive",
        ));
    }

    let limit = &config.rate_limit;
    if limit.capacity == 0 {
        errors.push(ConfigurationError::new("rate_limit.capacity", "must be positive"));
    }
    if limit.window_secs == 0 {
        errors.push(ConfigurationError::new("rate_limit.window_secs", "must be positive"));
    }
    if limit.storage == StorageKind::Redis
        && limit.redis_url.as_deref().map_or(true, |url| url.trim().is_empty())
    {
        errors.push(ConfigurationError::new(
            "rate_limit.redis_url",
            "required when storage is redis",
        ));
    }
    if limit.sweep_interval_secs == 0 {
        errors.push(ConfigurationError::new(
            "rate_limit.sweep_interval_secs",
            "must be positive",
        ));
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ConfigurationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ConfigurationError::new(
            "admin.api_key",
            "must not be empty when admin is enabled",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
