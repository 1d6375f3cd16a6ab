//! Read-only statistics projections for the health and admin surfaces.
//!
//! Field names on these reports are part of the wire contract; note the
//! deliberate mix of casings on the health report.

use serde::Serialize;

use crate::config::ServerConfig;
use crate::registry::{ConnectionInfo, RegistrySnapshot};
use crate::security::RateLimiter;
use crate::server::frames;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: u64,
    pub uptime: UptimeReport,
    pub connections: ConnectionCounts,
    pub limits: LimitsReport,
}

#[derive(Debug, Serialize)]
pub struct UptimeReport {
    pub ms: u64,
    pub hours: f64,
    /// Milliseconds until auto-shutdown; null when the timer is disabled.
    #[serde(rename = "autoShutdownIn")]
    pub auto_shutdown_in: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionCounts {
    pub active: usize,
    pub max: usize,
    pub total_attempts: u64,
    pub rejected: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsReport {
    pub max_connections: usize,
    pub connection_timeout_minutes: u64,
    pub rate_limit_messages: u32,
    pub rate_limit_window_ms: u64,
    pub ip_whitelist_enabled: bool,
}

/// Detailed report for the authenticated admin endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub server: HealthReport,
    pub connections: Vec<ConnectionInfo>,
    pub rate_limiter: RateLimiterReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimiterReport {
    pub tracked_sources: usize,
    pub max_messages: u32,
    pub window_ms: u64,
}

pub fn health_report(config: &ServerConfig, snapshot: &RegistrySnapshot) -> HealthReport {
    let uptime_ms = snapshot.uptime.as_millis() as u64;
    let hours = uptime_ms as f64 / 3_600_000.0;
    let auto_shutdown_in = config
        .auto_shutdown
        .enabled
        .then(|| (config.shutdown_delay().as_millis() as u64).saturating_sub(uptime_ms));

    HealthReport {
        status: "ok",
        timestamp: frames::now_millis(),
        uptime: UptimeReport {
            ms: uptime_ms,
            hours: (hours * 100.0).round() / 100.0,
            auto_shutdown_in,
        },
        connections: ConnectionCounts {
            active: snapshot.active,
            max: config.limits.max_connections,
            total_attempts: snapshot.total_attempts,
            rejected: snapshot.rejected,
        },
        limits: LimitsReport {
            max_connections: config.limits.max_connections,
            connection_timeout_minutes: config.limits.connection_timeout_minutes,
            rate_limit_messages: config.rate_limit.max_messages,
            rate_limit_window_ms: config.rate_limit.window_ms,
            ip_whitelist_enabled: config.ip_whitelist.enabled,
        },
    }
}

pub fn stats_report(
    config: &ServerConfig,
    snapshot: &RegistrySnapshot,
    connections: Vec<ConnectionInfo>,
    limiter: &RateLimiter,
) -> StatsReport {
    StatsReport {
        server: health_report(config, snapshot),
        connections,
        rate_limiter: RateLimiterReport {
            tracked_sources: limiter.tracked_sources(),
            max_messages: config.rate_limit.max_messages,
            window_ms: config.rate_limit.window_ms,
        },
    }
}
