//! Configuration validation.
//!
//! Semantic checks run after the environment has been parsed. Validation is
//! a pure function over the assembled config and reports every violation,
//! not just the first.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic violation found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("AUTH_TOKEN must not be empty")]
    EmptyAuthToken,

    #[error("MAX_CONNECTIONS must be positive")]
    ZeroMaxConnections,

    #[error("CONNECTION_TIMEOUT_MINUTES must be positive")]
    ZeroConnectionTimeout,

    #[error("RATE_LIMIT_MESSAGES must be positive")]
    ZeroRateLimitMessages,

    #[error("RATE_LIMIT_WINDOW_MS must be positive")]
    ZeroRateLimitWindow,

    #[error("AUTO_SHUTDOWN_HOURS must be positive when auto-shutdown is enabled")]
    NonPositiveAutoShutdown,

    #[error("IP_WHITELIST must not be empty when the whitelist is enabled")]
    EmptyWhitelist,

    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("invalid metrics address: {0}")]
    InvalidMetricsAddress(String),
}

/// Validate a fully assembled config, collecting all errors.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.auth.token.is_empty() {
        errors.push(ValidationError::EmptyAuthToken);
    }
    if config.limits.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.limits.connection_timeout_minutes == 0 {
        errors.push(ValidationError::ZeroConnectionTimeout);
    }
    if config.rate_limit.max_messages == 0 {
        errors.push(ValidationError::ZeroRateLimitMessages);
    }
    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::ZeroRateLimitWindow);
    }
    if config.auto_shutdown.enabled && config.auto_shutdown.after_hours <= 0.0 {
        errors.push(ValidationError::NonPositiveAutoShutdown);
    }
    if config.ip_whitelist.enabled && config.ip_whitelist.addresses.is_empty() {
        errors.push(ValidationError::EmptyWhitelist);
    }
    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
