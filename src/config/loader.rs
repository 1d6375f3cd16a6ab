//! Configuration loading from the environment.

use std::str::FromStr;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Parse { var: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse { var, value } => {
                write!(f, "Cannot parse {}={:?}", var, value)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from process environment variables.
pub fn load_from_env() -> Result<ServerConfig, ConfigError> {
    load_with(|name| std::env::var(name).ok())
}

/// Assemble a config from an arbitrary variable source.
///
/// Unset or empty variables fall back to the schema defaults.
pub fn load_with<F>(lookup: F) -> Result<ServerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ServerConfig::default();

    if let Some(token) = read(&lookup, "AUTH_TOKEN") {
        config.auth.token = token;
    }
    if let Some(v) = parse_var(&lookup, "MAX_CONNECTIONS")? {
        config.limits.max_connections = v;
    }
    if let Some(v) = parse_var(&lookup, "CONNECTION_TIMEOUT_MINUTES")? {
        config.limits.connection_timeout_minutes = v;
    }
    if let Some(v) = parse_var(&lookup, "RATE_LIMIT_MESSAGES")? {
        config.rate_limit.max_messages = v;
    }
    if let Some(v) = parse_var(&lookup, "RATE_LIMIT_WINDOW_MS")? {
        config.rate_limit.window_ms = v;
    }
    if let Some(v) = parse_var(&lookup, "AUTO_SHUTDOWN_HOURS")? {
        config.auto_shutdown.after_hours = v;
    }
    if let Some(v) = parse_bool(&lookup, "ENABLE_AUTO_SHUTDOWN")? {
        config.auto_shutdown.enabled = v;
    }
    if let Some(v) = parse_bool(&lookup, "ENABLE_IP_WHITELIST")? {
        config.ip_whitelist.enabled = v;
    }
    if let Some(list) = read(&lookup, "IP_WHITELIST") {
        config.ip_whitelist.addresses = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(addr) = read(&lookup, "BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(level) = read(&lookup, "LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(v) = parse_bool(&lookup, "METRICS_ENABLED")? {
        config.observability.metrics_enabled = v;
    }
    if let Some(addr) = read(&lookup, "METRICS_ADDRESS") {
        config.observability.metrics_address = addr;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn read<F>(lookup: &F, name: &'static str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.is_empty())
}

fn parse_var<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match read(lookup, name) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Parse { var: name, value }),
    }
}

fn parse_bool<F>(lookup: &F, name: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match read(lookup, name) {
        None => Ok(None),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" => Ok(Some(false)),
            _ => Err(ConfigError::Parse { var: name, value }),
        },
    }
}
