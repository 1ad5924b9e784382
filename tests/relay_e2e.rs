//! End-to-end tests over real WebSocket connections.
//!
//! Each test starts the relay on `127.0.0.1:0` and talks to it with
//! `tokio-tungstenite`, the same way an ESP32-CAM or Android client would.

#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use relay_hub::app_state::AppState;
use relay_hub::config::RelayConfig;
use relay_hub::domain::Role;
use relay_hub::server;
use relay_hub::shutdown::ShutdownController;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    state: AppState,
    controller: ShutdownController,
}

async fn start(config: RelayConfig) -> TestServer {
    let controller = ShutdownController::new();
    let state = AppState::new(config, controller.listener());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut serve_shutdown = controller.listener();
    let served = state.clone();
    tokio::spawn(async move {
        server::serve(listener, served, async move { serve_shutdown.recv().await })
            .await
            .unwrap();
    });

    TestServer {
        addr,
        state,
        controller,
    }
}

impl TestServer {
    async fn connect(&self, path: &str) -> Client {
        let (ws, _) = connect_async(format!("ws://{}{}", self.addr, path))
            .await
            .unwrap();
        ws
    }

    async fn connect_as(&self, sentinel: &str) -> Client {
        let mut ws = self.connect("/").await;
        ws.send(Message::text(sentinel)).await.unwrap();
        ws
    }

    async fn wait_for_len(&self, role: Role, expected: usize) {
        let waited = tokio::time::timeout(WAIT, async {
            while self.state.registry.len(role).await != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "{role} count never reached {expected}");
    }
}

/// Next data message, skipping control frames.
async fn next_data(ws: &mut Client) -> Message {
    loop {
        let next = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for message");
        match next {
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(message)) => return message,
            other => panic!("connection ended: {other:?}"),
        }
    }
}

/// Reads until a close frame arrives and returns its code.
async fn close_code(ws: &mut Client) -> u16 {
    loop {
        let next = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for close");
        match next {
            Some(Ok(Message::Close(Some(frame)))) => return u16::from(frame.code),
            Some(Ok(Message::Close(None))) | None => panic!("closed without status"),
            Some(Ok(_)) => {}
            Some(Err(err)) => panic!("connection error before close frame: {err}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn producer_frame_relayed_to_consumer() {
    let server = start(RelayConfig::default()).await;

    let mut producer = server.connect_as("esp32-cam").await;
    server.wait_for_len(Role::Producer, 1).await;

    let mut consumer = server.connect_as("android-client").await;
    server.wait_for_len(Role::Consumer, 1).await;

    let frame = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    producer.send(Message::binary(frame.clone())).await.unwrap();

    let Message::Binary(received) = next_data(&mut consumer).await else {
        panic!("consumer should receive a binary frame");
    };
    assert_eq!(received.as_ref(), frame.as_slice());
}

#[tokio::test(flavor = "multi_thread")]
async fn consumer_command_relayed_to_producer() {
    let server = start(RelayConfig::default()).await;

    let mut producer = server.connect_as("esp32-cam").await;
    let mut consumer = server.connect_as("android-client").await;
    server.wait_for_len(Role::Producer, 1).await;
    server.wait_for_len(Role::Consumer, 1).await;

    consumer.send(Message::text("flash-on")).await.unwrap();

    assert_eq!(next_data(&mut producer).await, Message::text("flash-on"));
}

#[tokio::test(flavor = "multi_thread")]
async fn consumer_alone_gets_no_producer_notice() {
    let server = start(RelayConfig::default()).await;

    let mut consumer = server.connect_as("android-client").await;
    server.wait_for_len(Role::Consumer, 1).await;

    consumer.send(Message::text("start-stream")).await.unwrap();

    let Message::Text(text) = next_data(&mut consumer).await else {
        panic!("notice should be text");
    };
    let notice: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(notice, serde_json::json!({ "error": "no producer connected" }));
}

#[tokio::test(flavor = "multi_thread")]
async fn disconnected_consumer_does_not_affect_others() {
    let server = start(RelayConfig::default()).await;

    let mut producer = server.connect_as("esp32-cam").await;
    let mut first = server.connect_as("android-client").await;
    let mut second = server.connect_as("android-client").await;
    server.wait_for_len(Role::Producer, 1).await;
    server.wait_for_len(Role::Consumer, 2).await;

    first.close(None).await.unwrap();
    server.wait_for_len(Role::Consumer, 1).await;

    producer.send(Message::binary(b"Y".to_vec())).await.unwrap();
    assert_eq!(next_data(&mut second).await, Message::binary(b"Y".to_vec()));

    producer.send(Message::binary(b"Z".to_vec())).await.unwrap();
    assert_eq!(next_data(&mut second).await, Message::binary(b"Z".to_vec()));
    assert_eq!(server.state.registry.len(Role::Producer).await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn silent_connection_times_out_with_policy_violation() {
    let config = RelayConfig {
        handshake_timeout: Duration::from_millis(200),
        ..RelayConfig::default()
    };
    let server = start(config).await;

    let mut silent = server.connect("/").await;

    assert_eq!(close_code(&mut silent).await, 1008);
    assert_eq!(server.state.registry.len(Role::Producer).await, 0);
    assert_eq!(server.state.registry.len(Role::Consumer).await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_sentinel_is_rejected() {
    let server = start(RelayConfig::default()).await;

    let mut stranger = server.connect_as("hello").await;

    assert_eq!(close_code(&mut stranger).await, 1008);
    assert_eq!(server.state.registry.len(Role::Producer).await, 0);
    assert_eq!(server.state.registry.len(Role::Consumer).await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn producer_disconnect_decrements_by_one() {
    let server = start(RelayConfig::default()).await;

    let mut first = server.connect_as("esp32-cam").await;
    let mut second = server.connect_as("esp32-cam").await;
    let mut consumer = server.connect_as("android-client").await;
    server.wait_for_len(Role::Producer, 2).await;
    server.wait_for_len(Role::Consumer, 1).await;

    first.close(None).await.unwrap();
    server.wait_for_len(Role::Producer, 1).await;
    assert_eq!(server.state.registry.len(Role::Consumer).await, 1);

    second.send(Message::binary(b"frame".to_vec())).await.unwrap();
    assert_eq!(
        next_data(&mut consumer).await,
        Message::binary(b"frame".to_vec())
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn any_path_upgrades() {
    let server = start(RelayConfig::default()).await;

    let mut producer = server.connect("/camera/stream").await;
    producer.send(Message::text("esp32-cam")).await.unwrap();

    server.wait_for_len(Role::Producer, 1).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn health_reports_connection_counts() {
    let server = start(RelayConfig::default()).await;

    let _producer = server.connect_as("esp32-cam").await;
    let _consumer = server.connect_as("android-client").await;
    server.wait_for_len(Role::Producer, 1).await;
    server.wait_for_len(Role::Consumer, 1).await;

    let body: serde_json::Value = reqwest::get(format!("http://{}/health", server.addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["producers"], 1);
    assert_eq!(body["consumers"], 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_closes_sessions_and_drains() {
    let server = start(RelayConfig::default()).await;

    let mut producer = server.connect_as("esp32-cam").await;
    server.wait_for_len(Role::Producer, 1).await;

    let TestServer {
        state, controller, ..
    } = server;
    drop(state);
    controller.trigger();

    assert_eq!(close_code(&mut producer).await, 1001);
    assert!(controller.drain(WAIT).await);
}
