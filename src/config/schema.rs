//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits and carry defaults so a bare environment
//! still produces a runnable config.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Root configuration for the WebSocket probe server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Shared-secret authentication.
    pub auth: AuthConfig,

    /// Connection count and lifetime limits.
    pub limits: ConnectionLimitConfig,

    /// Per-source message rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Process-wide auto-shutdown timer.
    pub auto_shutdown: AutoShutdownConfig,

    /// Source-address whitelist.
    pub ip_whitelist: IpWhitelistConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ServerConfig {
    /// Fixed connection lifetime, measured from connect time.
    pub fn connection_lifetime(&self) -> Duration {
        Duration::from_secs(self.limits.connection_timeout_minutes * 60)
    }

    /// Length of one rate-limit counting window.
    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit.window_ms)
    }

    /// Delay before the auto-shutdown timer fires.
    pub fn shutdown_delay(&self) -> Duration {
        Duration::from_secs_f64(self.auto_shutdown.after_hours.max(0.0) * 3600.0)
    }

    /// Auto-shutdown horizon in hours, `None` when the timer is disabled.
    pub fn auto_shutdown_hours(&self) -> Option<f64> {
        self.auto_shutdown
            .enabled
            .then_some(self.auto_shutdown.after_hours)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Shared-secret authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Token required on the WebSocket handshake and the admin endpoints.
    pub token: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            token: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Connection count and lifetime limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionLimitConfig {
    /// Maximum concurrent connections.
    pub max_connections: usize,

    /// Fixed connection lifetime in minutes, measured from connect time.
    pub connection_timeout_minutes: u64,
}

impl Default for ConnectionLimitConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            connection_timeout_minutes: 30,
        }
    }
}

/// Per-source message rate limiting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum messages allowed per window.
    pub max_messages: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_messages: 10,
            window_ms: 60_000,
        }
    }
}

/// Process-wide auto-shutdown timer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AutoShutdownConfig {
    /// Arm the one-shot auto-shutdown timer at startup.
    pub enabled: bool,

    /// Hours until the timer fires.
    pub after_hours: f64,
}

impl Default for AutoShutdownConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            after_hours: 4.0,
        }
    }
}

/// Source-address whitelist.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct IpWhitelistConfig {
    /// Enforce the whitelist at admission time.
    pub enabled: bool,

    /// Allowed source addresses.
    pub addresses: HashSet<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics exporter.
    pub metrics_enabled: bool,

    /// Metrics exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
