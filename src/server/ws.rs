//! WebSocket upgrade handling and per-connection sessions.
//!
//! # Responsibilities
//! - Run admission before completing the upgrade handshake
//! - Register the connection and arm its expiry timer
//! - Pump inbound frames through the rate limiter and echo them back
//! - Funnel every close cause into one retirement point

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::net::SocketAddr;
use tokio::sync::mpsc;

use crate::admission::{Candidate, RejectReason};
use crate::observability::metrics;
use crate::registry::{SessionCommand, SessionSender};
use crate::server::frames::{Inbound, ServerFrame};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// WebSocket upgrade handler; the admission gate runs before the upgrade.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let source = client_address(&headers, peer);
    let candidate = Candidate {
        source_address: source.clone(),
        presented_token: query.token.unwrap_or_default(),
    };

    match state.admission.evaluate(&candidate) {
        Ok(()) => {
            let user_agent = headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();
            ws.on_upgrade(move |socket| run_session(socket, source, user_agent, state))
        }
        Err(reason) => reject_response(reason),
    }
}

/// Rejected handshakes fail at the HTTP layer; the peer never sees an
/// application frame.
fn reject_response(reason: RejectReason) -> Response {
    let status = match reason {
        RejectReason::Capacity => StatusCode::SERVICE_UNAVAILABLE,
        RejectReason::NotWhitelisted => StatusCode::FORBIDDEN,
        RejectReason::BadToken => StatusCode::UNAUTHORIZED,
    };
    status.into_response()
}

/// First `x-forwarded-for` hop when present, else the socket peer.
///
/// This server exists to be dialled through a CDN, so the forwarded header
/// is the common case.
fn client_address(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}

async fn run_session(socket: WebSocket, source: String, user_agent: String, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<SessionCommand>();

    let id = state.registry.register(&source, &user_agent, tx.clone());
    let expiry = state.scheduler.arm_expiry(id);
    state.registry.attach_expiry(id, expiry);

    let welcome = ServerFrame::welcome(id, &state.config, state.registry.active_count(), &source);
    let _ = tx.send(SessionCommand::Frame(welcome));

    // Writer: drains the session channel onto the socket. Stops on the
    // first failed send or on an explicit close command.
    let mut send_task = tokio::spawn(async move {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                SessionCommand::Frame(frame) => {
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize frame");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                SessionCommand::Close { code, reason } => {
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: reason.into(),
                        })))
                        .await;
                    break;
                }
            }
        }
    });

    let recv_state = state.clone();
    let recv_source = source.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = stream.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    handle_text(&recv_state, id, &recv_source, text.as_str(), &tx);
                }
                Ok(Message::Close(_)) => break,
                // binary is ignored; ping/pong is answered by the protocol layer
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(connection_id = id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // single cleanup point, whatever the close cause
    state.registry.retire(id);
}

/// Process one inbound text frame.
fn handle_text(state: &AppState, id: u64, source: &str, text: &str, tx: &SessionSender) {
    if !state.limiter.admit(source) {
        tracing::warn!(connection_id = id, source = %source, "Rate limit exceeded");
        metrics::record_rate_limited();
        let message = format!(
            "Rate limit exceeded: {} messages per minute",
            state.config.rate_limit.max_messages
        );
        let _ = tx.send(SessionCommand::Frame(ServerFrame::error(message)));
        return;
    }

    match Inbound::parse(text) {
        Inbound::Structured(payload) => {
            let Some(count) = state.registry.touch_message(id) else {
                return;
            };
            metrics::record_message("structured");
            let _ = tx.send(SessionCommand::Frame(ServerFrame::echo(
                id,
                payload,
                state.registry.active_count(),
                Some(count),
            )));
        }
        Inbound::Raw(raw) => {
            if state.registry.touch_message(id).is_none() {
                return;
            }
            metrics::record_message("raw");
            let _ = tx.send(SessionCommand::Frame(ServerFrame::echo(
                id,
                Value::String(raw),
                state.registry.active_count(),
                None,
            )));
        }
    }
}
