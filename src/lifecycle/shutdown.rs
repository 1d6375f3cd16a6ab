//! Shutdown coordination for the server.

use tokio::sync::broadcast;

/// What initiated the shutdown. Carried on the channel so the drain path
/// can log and report the cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Authenticated request to `/admin/shutdown`.
    AdminRequest,
    /// The one-shot auto-shutdown timer fired.
    AutoShutdown,
    /// SIGINT or SIGTERM.
    Signal,
}

impl ShutdownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::AdminRequest => "admin_request",
            ShutdownReason::AutoShutdown => "auto_shutdown",
            ShutdownReason::Signal => "signal",
        }
    }
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks subscribe to.
pub struct Shutdown {
    tx: broadcast::Sender<ShutdownReason>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownReason> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self, reason: ShutdownReason) {
        tracing::info!(reason = %reason, "Shutdown triggered");
        let _ = self.tx.send(reason);
    }

    /// Number of tasks still subscribed.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
