//! End-to-end WebSocket session tests.

use futures_util::SinkExt;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

mod common;
use common::{
    connect, connect_expect_error, next_json, spawn_server, test_config, wait_until, TOKEN,
};

#[tokio::test]
async fn welcome_frame_on_connect() {
    let (addr, _state, _server) = spawn_server(test_config()).await;

    let mut ws = connect(addr, TOKEN).await;
    let welcome = next_json(&mut ws).await;

    assert_eq!(welcome["type"], "welcome");
    assert_eq!(welcome["clientId"], 1);
    assert_eq!(welcome["serverLimits"]["maxConnections"], 10);
    assert_eq!(welcome["serverLimits"]["rateLimit"]["maxMessages"], 10);
    assert!(welcome["serverLimits"]["autoShutdownHours"].is_null());
    assert_eq!(welcome["currentStats"]["activeConnections"], 1);
    assert_eq!(welcome["currentStats"]["yourIP"], "127.0.0.1");
}

#[tokio::test]
async fn structured_messages_are_echoed_and_counted() {
    let (addr, _state, _server) = spawn_server(test_config()).await;

    let mut ws = connect(addr, TOKEN).await;
    next_json(&mut ws).await; // welcome

    ws.send(Message::Text(r#"{"ping": 1}"#.into())).await.unwrap();
    let echo = next_json(&mut ws).await;
    assert_eq!(echo["type"], "echo");
    assert_eq!(echo["clientId"], 1);
    assert_eq!(echo["originalMessage"], json!({"ping": 1}));
    assert_eq!(echo["yourMessageCount"], 1);
    assert_eq!(echo["activeConnections"], 1);

    ws.send(Message::Text(r#"[1, 2, 3]"#.into())).await.unwrap();
    let echo = next_json(&mut ws).await;
    assert_eq!(echo["yourMessageCount"], 2);
    assert_eq!(echo["originalMessage"], json!([1, 2, 3]));
}

#[tokio::test]
async fn raw_text_is_echoed_without_a_count() {
    let (addr, _state, _server) = spawn_server(test_config()).await;

    let mut ws = connect(addr, TOKEN).await;
    next_json(&mut ws).await;

    ws.send(Message::Text("not json at all".into())).await.unwrap();
    let echo = next_json(&mut ws).await;
    assert_eq!(echo["type"], "echo");
    assert_eq!(echo["originalMessage"], "not json at all");
    assert!(echo.get("yourMessageCount").is_none());

    // the raw message still counted toward the connection total
    ws.send(Message::Text(r#"{"after": true}"#.into())).await.unwrap();
    let echo = next_json(&mut ws).await;
    assert_eq!(echo["yourMessageCount"], 2);
}

#[tokio::test]
async fn rate_limit_sends_error_frames_past_the_limit() {
    let mut config = test_config();
    config.rate_limit.max_messages = 2;
    let (addr, _state, _server) = spawn_server(config).await;

    let mut ws = connect(addr, TOKEN).await;
    next_json(&mut ws).await;

    ws.send(Message::Text(r#"{"n": 1}"#.into())).await.unwrap();
    assert_eq!(next_json(&mut ws).await["yourMessageCount"], 1);

    ws.send(Message::Text(r#"{"n": 2}"#.into())).await.unwrap();
    assert_eq!(next_json(&mut ws).await["yourMessageCount"], 2);

    ws.send(Message::Text(r#"{"n": 3}"#.into())).await.unwrap();
    let error = next_json(&mut ws).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["message"], "Rate limit exceeded: 2 messages per minute");
}

#[tokio::test]
async fn capacity_rejects_until_a_slot_frees_up() {
    let mut config = test_config();
    config.limits.max_connections = 1;
    let (addr, state, _server) = spawn_server(config).await;

    let mut first = connect(addr, TOKEN).await;
    let welcome = next_json(&mut first).await;
    assert_eq!(welcome["clientId"], 1);

    // a valid token does not help once capacity is reached
    assert_eq!(connect_expect_error(addr, TOKEN).await, 503);

    let snap = state.registry.snapshot();
    assert_eq!(snap.total_attempts, 2);
    assert_eq!(snap.rejected, 1);

    drop(first);
    let registry = state.registry.clone();
    wait_until("first connection to retire", move || {
        registry.active_count() == 0
    })
    .await;

    // the freed slot is reusable and the id is fresh
    let mut second = connect(addr, TOKEN).await;
    let welcome = next_json(&mut second).await;
    assert_eq!(welcome["clientId"], 2);
}

#[tokio::test]
async fn bad_token_fails_the_handshake() {
    let (addr, state, _server) = spawn_server(test_config()).await;

    assert_eq!(connect_expect_error(addr, "wrong-token").await, 401);
    assert_eq!(connect_expect_error(addr, "").await, 401);

    let snap = state.registry.snapshot();
    assert_eq!(snap.total_attempts, 2);
    assert_eq!(snap.rejected, 2);
    assert_eq!(snap.active, 0);
}

#[tokio::test]
async fn whitelist_rejects_unlisted_sources() {
    let mut config = test_config();
    config.ip_whitelist.enabled = true;
    config.ip_whitelist.addresses.insert("10.9.9.9".to_string());
    let (addr, _state, _server) = spawn_server(config).await;

    // loopback is not on the list; the token being valid does not matter
    assert_eq!(connect_expect_error(addr, TOKEN).await, 403);
}
