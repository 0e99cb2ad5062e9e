//! `WebSocket` observer tests against a live listener.
//!
//! Each test binds an ephemeral port, connects a real client, and checks
//! the frames it receives. The tracker uses a long tick interval so only
//! signal-driven frames arrive.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeZone;
use futures_util::StreamExt;
use rainwatch_core::clock::sensor_offset;
use rainwatch_core::{Clock, EpisodeStore, EpisodeTracker, ManualClock, MemoryStore};
use rainwatch_server::{AppState, build_router};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    tracker: Arc<EpisodeTracker>,
    clock: Arc<ManualClock>,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn start_test_server() -> TestServer {
    let start = sensor_offset()
        .unwrap()
        .with_ymd_and_hms(2025, 3, 4, 14, 0, 0)
        .unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let store: Arc<dyn EpisodeStore> = Arc::new(MemoryStore::new());
    let tracker = EpisodeTracker::new(
        Arc::clone(&clock) as Arc<dyn Clock>,
        Arc::clone(&store),
        Duration::from_secs(3600),
    );
    let state = Arc::new(AppState::new(Arc::clone(&tracker), store));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to get addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, build_router(state))
            .await
            .expect("Server failed");
    });

    TestServer {
        addr,
        tracker,
        clock,
        handle,
    }
}

async fn connect(server: &TestServer, path: &str) -> Client {
    let url = format!("ws://{}{path}", server.addr);
    let (ws, _) = connect_async(url).await.expect("Failed to connect");
    ws
}

async fn next_frame(ws: &mut Client) -> Value {
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Socket closed")
            .expect("Socket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn wait_for_observers(tracker: &EpisodeTracker, expected: usize) -> bool {
    for _ in 0..200 {
        if tracker.observer_count().await == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn late_joiner_receives_status_then_end_frame() {
    let server = start_test_server().await;
    server.tracker.on_signal(true).await.unwrap();
    server.clock.advance_secs(12);

    let mut ws = connect(&server, "/ws").await;
    let status = next_frame(&mut ws).await;
    assert_eq!(status["status"], "hujan");
    assert_eq!(status["startedAt"], "04/03/2025 14:00:00");
    assert_eq!(status["duration"], 12);

    server.clock.advance_secs(18);
    server.tracker.on_signal(false).await.unwrap();
    let end = next_frame(&mut ws).await;
    assert_eq!(end["status"], "berhenti");
    assert_eq!(end["endedAt"], "04/03/2025 14:00:30");
    assert_eq!(end["duration"], 30);
}

#[tokio::test]
async fn root_path_serves_observers_and_forwards_start_frame() {
    let server = start_test_server().await;
    let mut ws = connect(&server, "/").await;
    assert!(wait_for_observers(&server.tracker, 1).await);

    server.tracker.on_signal(true).await.unwrap();
    let start = next_frame(&mut ws).await;
    assert_eq!(start["status"], "hujan");
    assert_eq!(start["duration"], 0);
}

#[tokio::test]
async fn close_unregisters_observer() {
    let server = start_test_server().await;
    let mut first = connect(&server, "/ws").await;
    let _second = connect(&server, "/ws").await;
    assert!(wait_for_observers(&server.tracker, 2).await);

    first.close(None).await.unwrap();
    assert!(wait_for_observers(&server.tracker, 1).await);
}

#[tokio::test]
async fn dropped_connection_unregisters_observer() {
    let server = start_test_server().await;
    let ws = connect(&server, "/ws").await;
    assert!(wait_for_observers(&server.tracker, 1).await);

    drop(ws);
    assert!(wait_for_observers(&server.tracker, 0).await);
}
