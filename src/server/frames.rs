//! Wire frame definitions for the WebSocket surface.
//!
//! Field names are part of the protocol contract with the browser-side test
//! harness and must not change.

use serde::Serialize;
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::ServerConfig;

/// Close code sent when a connection exceeds its configured lifetime.
pub const CLOSE_LIFETIME_EXPIRED: u16 = 4000;
/// Close code sent to every open connection while the server drains.
pub const CLOSE_SERVER_SHUTDOWN: u16 = 4001;

pub const REASON_LIFETIME_EXPIRED: &str = "connection lifetime exceeded";
pub const REASON_SERVER_SHUTDOWN: &str = "server shutting down";

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// An inbound payload after the fallible parse step.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// The text was valid JSON.
    Structured(Value),
    /// Opaque raw text, echoed back verbatim.
    Raw(String),
}

impl Inbound {
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => Inbound::Structured(value),
            Err(_) => Inbound::Raw(text.to_string()),
        }
    }
}

/// A server-to-client frame.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    Welcome {
        client_id: u64,
        message: String,
        timestamp: u64,
        server_limits: ServerLimits,
        current_stats: CurrentStats,
    },
    Echo {
        client_id: u64,
        original_message: Value,
        server_timestamp: u64,
        active_connections: usize,
        /// Absent on the raw-text echo branch.
        #[serde(skip_serializing_if = "Option::is_none")]
        your_message_count: Option<u64>,
    },
    Error {
        message: String,
        timestamp: u64,
    },
    Heartbeat {
        timestamp: u64,
        active_connections: usize,
        uptime: u64,
    },
}

/// Configured limits advertised in the welcome frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerLimits {
    pub max_connections: usize,
    pub connection_timeout_minutes: u64,
    pub rate_limit: RateLimitInfo,
    /// Serialized as null when auto-shutdown is disabled.
    pub auto_shutdown_hours: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    pub max_messages: u32,
    pub per_minutes: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStats {
    pub active_connections: usize,
    #[serde(rename = "yourIP")]
    pub your_ip: String,
}

impl ServerFrame {
    pub fn welcome(
        client_id: u64,
        config: &ServerConfig,
        active_connections: usize,
        your_ip: &str,
    ) -> Self {
        ServerFrame::Welcome {
            client_id,
            message: "Connected to WebSocket test server".to_string(),
            timestamp: now_millis(),
            server_limits: ServerLimits {
                max_connections: config.limits.max_connections,
                connection_timeout_minutes: config.limits.connection_timeout_minutes,
                rate_limit: RateLimitInfo {
                    max_messages: config.rate_limit.max_messages,
                    per_minutes: config.rate_limit.window_ms as f64 / 60_000.0,
                },
                auto_shutdown_hours: config.auto_shutdown_hours(),
            },
            current_stats: CurrentStats {
                active_connections,
                your_ip: your_ip.to_string(),
            },
        }
    }

    pub fn echo(
        client_id: u64,
        original_message: Value,
        active_connections: usize,
        your_message_count: Option<u64>,
    ) -> Self {
        ServerFrame::Echo {
            client_id,
            original_message,
            server_timestamp: now_millis(),
            active_connections,
            your_message_count,
        }
    }

    pub fn error(message: String) -> Self {
        ServerFrame::Error {
            message,
            timestamp: now_millis(),
        }
    }

    pub fn heartbeat(active_connections: usize, uptime_secs: u64) -> Self {
        ServerFrame::Heartbeat {
            timestamp: now_millis(),
            active_connections,
            uptime: uptime_secs,
        }
    }
}
