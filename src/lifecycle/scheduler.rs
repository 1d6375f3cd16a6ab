//! Time-driven actions: connection expiry, heartbeat, rate-limiter sweep,
//! and process auto-shutdown.
//!
//! # Design Decisions
//! - Every armed timer yields a handle stored on its owning entity: the
//!   expiry handle lives on the connection record, recurring handles on the
//!   scheduler itself
//! - Recurring tasks exit on the shutdown broadcast and are additionally
//!   aborted before the drain path touches registry state
//! - A cancelled expiry never observes a retired connection: `retire`
//!   aborts the timer while holding the registry lock

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time;

use crate::config::ServerConfig;
use crate::lifecycle::shutdown::{Shutdown, ShutdownReason};
use crate::observability::metrics;
use crate::registry::ConnectionRegistry;
use crate::security::RateLimiter;
use crate::server::frames::{
    ServerFrame, CLOSE_LIFETIME_EXPIRED, REASON_LIFETIME_EXPIRED,
};

/// Heartbeat broadcast period.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
/// Rate-limiter garbage collection period.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub struct LifecycleScheduler {
    registry: Arc<ConnectionRegistry>,
    limiter: Arc<RateLimiter>,
    config: Arc<ServerConfig>,
    shutdown: Arc<Shutdown>,
    recurring: Mutex<Vec<JoinHandle<()>>>,
}

impl LifecycleScheduler {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        limiter: Arc<RateLimiter>,
        config: Arc<ServerConfig>,
        shutdown: Arc<Shutdown>,
    ) -> Self {
        Self {
            registry,
            limiter,
            config,
            shutdown,
            recurring: Mutex::new(Vec::new()),
        }
    }

    /// Arm the one-shot expiry timer for a freshly registered connection.
    ///
    /// The returned handle must be attached to the connection record so
    /// `retire` can cancel the timer.
    pub fn arm_expiry(&self, id: u64) -> AbortHandle {
        let registry = Arc::clone(&self.registry);
        let lifetime = self.config.connection_lifetime();
        let task = tokio::spawn(async move {
            time::sleep(lifetime).await;
            tracing::info!(connection_id = id, "Connection lifetime expired");
            registry.close(id, CLOSE_LIFETIME_EXPIRED, REASON_LIFETIME_EXPIRED);
            registry.retire(id);
        });
        task.abort_handle()
    }

    /// Start the heartbeat, sweep, and (when enabled) auto-shutdown tasks.
    pub fn start_recurring(&self) {
        let mut recurring = self.recurring.lock().expect("scheduler mutex poisoned");

        recurring.push(tokio::spawn(heartbeat_loop(
            Arc::clone(&self.registry),
            self.shutdown.subscribe(),
        )));
        recurring.push(tokio::spawn(sweep_loop(
            Arc::clone(&self.limiter),
            self.shutdown.subscribe(),
        )));

        if self.config.auto_shutdown.enabled {
            let delay = self.config.shutdown_delay();
            tracing::info!(
                hours = self.config.auto_shutdown.after_hours,
                "Auto-shutdown timer armed"
            );
            recurring.push(tokio::spawn(auto_shutdown_timer(
                Arc::clone(&self.shutdown),
                delay,
            )));
        }
    }

    /// Cancel every recurring timer. Runs before the drain path closes
    /// sockets so no callback fires into a torn-down registry.
    pub fn stop_recurring(&self) {
        let mut recurring = self.recurring.lock().expect("scheduler mutex poisoned");
        for handle in recurring.drain(..) {
            handle.abort();
        }
    }
}

async fn heartbeat_loop(
    registry: Arc<ConnectionRegistry>,
    mut shutdown: tokio::sync::broadcast::Receiver<ShutdownReason>,
) {
    let mut ticker = time::interval(HEARTBEAT_INTERVAL);
    // the first tick completes immediately; skip it
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = registry.snapshot();
                let frame = ServerFrame::heartbeat(snapshot.active, snapshot.uptime.as_secs());
                let delivered = registry.broadcast(&frame);
                metrics::record_heartbeat(delivered);
                tracing::debug!(delivered = delivered, "Heartbeat broadcast");
            }
            _ = shutdown.recv() => break,
        }
    }
}

async fn sweep_loop(
    limiter: Arc<RateLimiter>,
    mut shutdown: tokio::sync::broadcast::Receiver<ShutdownReason>,
) {
    let mut ticker = time::interval(SWEEP_INTERVAL);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = limiter.sweep();
                if removed > 0 {
                    tracing::debug!(removed = removed, "Rate-limit windows swept");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

async fn auto_shutdown_timer(shutdown: Arc<Shutdown>, delay: Duration) {
    let mut rx = shutdown.subscribe();
    tokio::select! {
        _ = time::sleep(delay) => {
            tracing::warn!("Auto-shutdown timer fired");
            shutdown.trigger(ShutdownReason::AutoShutdown);
        }
        // another cause won the race; stand down
        _ = rx.recv() => {}
    }
}
