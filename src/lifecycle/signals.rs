//! OS signal handling.
//!
//! Translates SIGINT/SIGTERM into the internal shutdown signal so external
//! termination drains connections the same way an admin request does.

use std::sync::Arc;

use crate::lifecycle::shutdown::{Shutdown, ShutdownReason};

/// Wait for SIGINT or SIGTERM, then trigger a graceful shutdown.
pub async fn watch_signals(shutdown: Arc<Shutdown>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Termination signal received");
    shutdown.trigger(ShutdownReason::Signal);
}
