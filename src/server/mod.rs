//! WebSocket server setup and run loop.
//!
//! # Responsibilities
//! - Build the Axum router (WebSocket endpoint + health/admin surface)
//! - Own the shared application state
//! - Drive the lifecycle: arm recurring timers, serve, drain, stop
//!
//! # Data Flow
//! ```text
//! handshake → admission → ws.rs session ─┬─ rate_limit
//!                                        ├─ registry
//! scheduler timers ──────────────────────┘
//! shutdown signal → drain: cancel timers, close connections, stop listener
//! ```

pub mod frames;
pub mod ws;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::admission::AdmissionController;
use crate::config::ServerConfig;
use crate::lifecycle::{LifecycleScheduler, ServerState, Shutdown, StateHandle};
use crate::registry::ConnectionRegistry;
use crate::security::RateLimiter;
use crate::server::frames::{CLOSE_SERVER_SHUTDOWN, REASON_SERVER_SHUTDOWN};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub registry: Arc<ConnectionRegistry>,
    pub limiter: Arc<RateLimiter>,
    pub admission: Arc<AdmissionController>,
    pub scheduler: Arc<LifecycleScheduler>,
    pub shutdown: Arc<Shutdown>,
    pub lifecycle: Arc<StateHandle>,
}

/// The WebSocket probe server.
pub struct Server {
    router: Router,
    state: AppState,
}

impl Server {
    /// Wire up all subsystems for the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(ConnectionRegistry::new());
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.max_messages,
            config.rate_window(),
        ));
        let admission = Arc::new(AdmissionController::new(
            Arc::clone(&config),
            Arc::clone(&registry),
        ));
        let shutdown = Arc::new(Shutdown::new());
        let scheduler = Arc::new(LifecycleScheduler::new(
            Arc::clone(&registry),
            Arc::clone(&limiter),
            Arc::clone(&config),
            Arc::clone(&shutdown),
        ));

        let state = AppState {
            config,
            registry,
            limiter,
            admission,
            scheduler,
            shutdown,
            lifecycle: Arc::new(StateHandle::new()),
        };

        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/ws", get(ws::websocket_handler))
            .merge(admin::admin_router())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Shared state handle, mainly for tests and the signal watcher.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until a shutdown signal drains it.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "WebSocket server starting");

        self.state.scheduler.start_recurring();
        self.state.lifecycle.transition(ServerState::Running);

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(drain(self.state.clone()))
            .await?;

        self.state.lifecycle.transition(ServerState::Stopped);
        tracing::info!("WebSocket server stopped");
        Ok(())
    }
}

/// Wait for the shutdown signal, then drain: recurring timers are cancelled
/// before any socket is touched, every connection gets the shutdown close
/// code, and in-flight sends are given a moment to flush.
async fn drain(state: AppState) {
    let mut rx = state.shutdown.subscribe();
    let reason = match rx.recv().await {
        Ok(reason) => reason,
        Err(_) => return,
    };

    tracing::info!(reason = %reason, "Draining connections");
    state.lifecycle.transition(ServerState::Draining);
    state.scheduler.stop_recurring();

    let closed = state
        .registry
        .close_all(CLOSE_SERVER_SHUTDOWN, REASON_SERVER_SHUTDOWN);
    tracing::info!(connections = closed, "Close frames queued");

    tokio::time::sleep(Duration::from_millis(100)).await;
}
