//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use ws_probe::lifecycle::ServerState;
use ws_probe::server::AppState;
use ws_probe::{Server, ServerConfig};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const TOKEN: &str = "test-token";

/// Baseline config for tests: known token, no auto-shutdown.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.auth.token = TOKEN.to_string();
    config.auto_shutdown.enabled = false;
    config
}

/// Bind an ephemeral port and run the server on it until the test ends.
pub async fn spawn_server(config: ServerConfig) -> (SocketAddr, AppState, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = Server::new(config);
    let state = server.state().clone();
    let handle = tokio::spawn(async move {
        server.run(listener).await.unwrap();
    });

    let mut rx = state.lifecycle.subscribe();
    while *rx.borrow() != ServerState::Running {
        rx.changed().await.unwrap();
    }

    (addr, state, handle)
}

pub async fn connect(addr: SocketAddr, token: &str) -> WsClient {
    let url = format!("ws://{}/ws?token={}", addr, token);
    let (ws, _) = connect_async(url).await.expect("WebSocket handshake failed");
    ws
}

/// Handshake expected to fail; returns the HTTP status the server sent.
#[allow(dead_code)]
pub async fn connect_expect_error(addr: SocketAddr, token: &str) -> u16 {
    let url = format!("ws://{}/ws?token={}", addr, token);
    match connect_async(url).await {
        Ok(_) => panic!("handshake unexpectedly succeeded"),
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => response.status().as_u16(),
        Err(other) => panic!("unexpected handshake error: {other}"),
    }
}

/// Read frames until the next text frame, parsed as JSON.
pub async fn next_json(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Poll a condition until it holds or the timeout elapses.
#[allow(dead_code)]
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), deadline)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}
