//! End-to-end tests: a real server on a random port driven by a WebSocket client.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use shuttle_core::{MemoryStore, PersonalDetails, PresenceStatus, RoleDetails, UserRecord};
use shuttle_server::{build_router, AppState, Config};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(2);

struct TestServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    store: Arc<MemoryStore>,
}

/// Start the server on a random port with users "u1" and "u2".
async fn start_test_server() -> TestServer {
    let store = Arc::new(MemoryStore::with_users(["u1", "u2"].map(|id| {
        UserRecord::new(id, id, RoleDetails::Parent(PersonalDetails::default()))
    })));
    let state = Arc::new(AppState::with_store(Config::default(), Arc::clone(&store)));
    let app = build_router(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer { addr, state, store }
}

async fn connect(addr: SocketAddr, id: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/ws/{id}"))
        .await
        .expect("WebSocket connect failed");
    ws
}

/// Next data frame, or `None` once the server closed the connection.
async fn next_data(ws: &mut Client) -> Option<Message> {
    loop {
        match tokio::time::timeout(WAIT, ws.next()).await {
            Ok(Some(Ok(msg @ (Message::Text(_) | Message::Binary(_))))) => return Some(msg),
            Ok(Some(Ok(Message::Close(_)))) | Ok(Some(Err(_))) | Ok(None) => return None,
            Ok(Some(Ok(_))) => continue,
            Err(_) => panic!("timed out waiting for a frame"),
        }
    }
}

async fn expect_greeting(ws: &mut Client) {
    assert_eq!(
        next_data(ws).await,
        Some(Message::Text("Connected to websocket".into()))
    );
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Minimal HTTP/1.1 GET returning status code and body.
async fn http_get(addr: SocketAddr, path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    let status = raw
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap();
    let body = raw
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

fn ack() -> Value {
    json!({"code": 200, "status": "OK", "message": "Data received successfully"})
}

#[tokio::test]
async fn test_ping_is_acknowledged() {
    let server = start_test_server().await;
    let mut ws = connect(server.addr, "u1").await;
    expect_greeting(&mut ws).await;

    ws.send(Message::Text(
        r#"{"longitude":12.34,"latitude":56.78}"#.into(),
    ))
    .await
    .unwrap();

    match next_data(&mut ws).await {
        Some(Message::Text(text)) => {
            assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), ack());
        }
        other => panic!("expected text ack, got {other:?}"),
    }
}

#[tokio::test]
async fn test_binary_ping_gets_binary_ack() {
    let server = start_test_server().await;
    let mut ws = connect(server.addr, "u1").await;
    expect_greeting(&mut ws).await;

    ws.send(Message::Binary(
        br#"{"longitude":-0.5,"latitude":51.5}"#.to_vec(),
    ))
    .await
    .unwrap();

    match next_data(&mut ws).await {
        Some(Message::Binary(bytes)) => {
            assert_eq!(serde_json::from_slice::<Value>(&bytes).unwrap(), ack());
        }
        other => panic!("expected binary ack, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_user_gets_no_greeting() {
    let server = start_test_server().await;
    let mut ws = connect(server.addr, "ghost").await;

    assert_eq!(next_data(&mut ws).await, None);
    assert!(server.state.registry().is_empty());
}

#[tokio::test]
async fn test_second_connection_evicts_first() {
    let server = start_test_server().await;

    let mut first = connect(server.addr, "u1").await;
    expect_greeting(&mut first).await;
    let mut second = connect(server.addr, "u1").await;
    expect_greeting(&mut second).await;

    assert_eq!(next_data(&mut first).await, None);

    // Let the evicted session finish its teardown.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.state.registry().len(), 1);
    assert!(server.state.registry().contains("u1"));
    assert_eq!(
        server.store.get("u1").unwrap().status,
        PresenceStatus::Online
    );

    second
        .send(Message::Text(r#"{"longitude":1.0,"latitude":2.0}"#.into()))
        .await
        .unwrap();
    assert!(matches!(next_data(&mut second).await, Some(Message::Text(_))));
}

#[tokio::test]
async fn test_malformed_frame_ends_session() {
    let server = start_test_server().await;
    let mut ws = connect(server.addr, "u1").await;
    expect_greeting(&mut ws).await;

    ws.send(Message::Text("not json".into())).await.unwrap();

    assert_eq!(next_data(&mut ws).await, None);
    let state = Arc::clone(&server.state);
    wait_until(|| state.registry().is_empty()).await;
}

#[tokio::test]
async fn test_presence_follows_connection() {
    let server = start_test_server().await;
    let mut ws = connect(server.addr, "u2").await;
    expect_greeting(&mut ws).await;

    assert_eq!(
        server.store.get("u2").unwrap().status,
        PresenceStatus::Online
    );
    let (status, body) = http_get(server.addr, "/presence/u2").await;
    assert_eq!(status, 200);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "online");
    assert_eq!(body["connected"], true);

    ws.close(None).await.unwrap();

    let store = Arc::clone(&server.store);
    wait_until(|| store.get("u2").is_some_and(|u| u.status == PresenceStatus::Offline)).await;
    assert!(server.store.get("u2").unwrap().last_active.is_some());
    assert!(server.state.registry().is_empty());
}

#[tokio::test]
async fn test_presence_of_unknown_user_is_not_found() {
    let server = start_test_server().await;
    let (status, _) = http_get(server.addr, "/presence/ghost").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_plain_get_requires_upgrade() {
    let server = start_test_server().await;
    let (status, _) = http_get(server.addr, "/ws/u1").await;
    assert_eq!(status, 426);
    assert!(server.state.registry().is_empty());
}

#[tokio::test]
async fn test_plain_get_on_ws_prefix_requires_upgrade() {
    let server = start_test_server().await;
    for path in ["/ws", "/ws/"] {
        let (status, _) = http_get(server.addr, path).await;
        assert_eq!(status, 426, "{path}");
    }
    let (status, _) = http_get(server.addr, "/elsewhere").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_health_reports_connections() {
    let server = start_test_server().await;
    let mut ws = connect(server.addr, "u1").await;
    expect_greeting(&mut ws).await;

    let (status, body) = http_get(server.addr, "/health").await;
    assert_eq!(status, 200);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 1);
}
