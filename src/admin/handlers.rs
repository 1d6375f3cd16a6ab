//! Health and admin endpoint handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::admin::auth::{token_matches, AdminQuery};
use crate::admin::stats;
use crate::lifecycle::ShutdownReason;
use crate::server::frames;
use crate::server::AppState;

/// `GET /health`: unauthenticated liveness and counter snapshot.
pub async fn get_health(State(state): State<AppState>) -> Json<stats::HealthReport> {
    let snapshot = state.registry.snapshot();
    Json(stats::health_report(&state.config, &snapshot))
}

/// `GET /admin/stats?token=`: detailed per-connection statistics.
pub async fn get_stats(
    Query(query): Query<AdminQuery>,
    State(state): State<AppState>,
) -> Response {
    if !token_matches(&query, &state.config.auth.token) {
        return unauthorized();
    }

    let snapshot = state.registry.snapshot();
    let report = stats::stats_report(
        &state.config,
        &snapshot,
        state.registry.connection_details(),
        &state.limiter,
    );
    Json(report).into_response()
}

/// `GET /admin/shutdown?token=`: authenticated graceful shutdown.
///
/// An invalid token returns unauthorized without mutating any state.
pub async fn get_shutdown(
    Query(query): Query<AdminQuery>,
    State(state): State<AppState>,
) -> Response {
    if !token_matches(&query, &state.config.auth.token) {
        return unauthorized();
    }

    tracing::warn!("Shutdown requested via admin endpoint");
    state.shutdown.trigger(ShutdownReason::AdminRequest);

    Json(json!({
        "status": "shutting down",
        "timestamp": frames::now_millis(),
    }))
    .into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "unauthorized"})),
    )
        .into_response()
}
