//! Health and admin HTTP surface.
//!
//! The WebSocket core supplies the data; these routes only project it.
//! `/health` is open, `/admin/*` requires the shared token as a query
//! parameter.

pub mod auth;
pub mod handlers;
pub mod stats;

use axum::{routing::get, Router};
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

use crate::server::AppState;

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/admin/stats", get(handlers::get_stats))
        .route("/admin/shutdown", get(handlers::get_shutdown))
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
}
