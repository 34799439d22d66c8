//! Progress push over WebSocket, checked against polling of the same run.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use futures::StreamExt;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

use common::TestFixture;
use phenorun_core::testing::MockGroupProcessor;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: SocketAddr, key: &str) -> Socket {
    let url = format!("ws://{}/api/v1/jobs/{}/ws", addr, key);
    let (socket, _response) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("WebSocket handshake failed");
    socket
}

/// Next frame from the server, or `None` once the stream ends.
async fn next_message(socket: &mut Socket) -> Option<Message> {
    match tokio::time::timeout(Duration::from_secs(10), socket.next()).await {
        Ok(Some(Ok(message))) => Some(message),
        Ok(_) => None,
        Err(_) => panic!("no WebSocket message within 10s"),
    }
}

fn stage_rank(stage: &str) -> usize {
    match stage {
        "group_build" => 0,
        "annotation" => 1,
        "processing" => 2,
        "merge" => 3,
        other => panic!("unknown stage {}", other),
    }
}

/// `(stage rank, current)` of a tick, ordered the way a job advances.
fn position(tick: &Value) -> (usize, u64) {
    (
        stage_rank(tick["stage"].as_str().unwrap()),
        tick["current"].as_u64().unwrap(),
    )
}

fn status_rank(status: &str) -> usize {
    match status {
        "pending" => 0,
        "running" => 1,
        _ => 2,
    }
}

#[tokio::test]
async fn test_push_and_poll_agree_on_one_run() {
    let fixture = TestFixture::with_processor(
        MockGroupProcessor::new().with_delay(Duration::from_millis(100)),
    );
    let addr = fixture.serve().await;

    let ids: Vec<String> = (0..6).map(|i| format!("img-{}", i)).collect();
    let response = fixture
        .post(
            "/api/v1/jobs/alice",
            json!({ "items": ids, "thread_count": 1, "owner": "alice" }),
        )
        .await;
    assert_eq!(response.status, 202);

    let mut socket = connect(addr, "alice").await;

    let mut ticks: Vec<Value> = Vec::new();
    let mut closed: Vec<Value> = Vec::new();
    let mut last_polled_status = 0;
    let mut saw_close_frame = false;

    while let Some(message) = next_message(&mut socket).await {
        let event: Value = match message {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            Message::Close(_) => {
                saw_close_frame = true;
                break;
            }
            _ => continue,
        };

        // The poll view is never behind what was already pushed.
        let polled = fixture.get("/api/v1/jobs/alice").await.body;
        let polled_status = status_rank(polled["status"].as_str().unwrap());
        assert!(polled_status >= last_polled_status, "status went backwards");
        last_polled_status = polled_status;

        if event["closed"] == true {
            assert!(closed.is_empty(), "more than one closed event");
            assert_eq!(event["status"], polled["status"]);
            closed.push(event);
        } else {
            assert!(event.get("stage").is_some() && event.get("total").is_some());
            assert!(position(&polled["progress"]) >= position(&event));
            ticks.push(event);
        }
    }

    assert!(saw_close_frame, "socket ended without a Close frame");
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0]["status"], "completed");
    assert_eq!(closed[0]["result"], "Task completed!");

    assert!(!ticks.is_empty());
    assert!(
        ticks.windows(2).all(|w| position(&w[0]) <= position(&w[1])),
        "pushed ticks went backwards: {:?}",
        ticks
    );
    let processing = ticks
        .iter()
        .filter(|t| t["stage"] == "processing")
        .last()
        .expect("processing ticks pushed");
    assert_eq!(processing["current"], processing["total"]);
    let last = ticks.last().unwrap();
    assert_eq!(last["stage"], "merge");
    assert_eq!(last["current"], last["total"]);

    let final_state = fixture.get("/api/v1/jobs/alice").await.body;
    assert_eq!(final_state["status"], "completed");
    assert_eq!(&final_state["progress"], last);
}

#[tokio::test]
async fn test_push_after_terminal_sends_only_closed_event() {
    let fixture = TestFixture::new();
    let addr = fixture.serve().await;

    fixture
        .post("/api/v1/jobs/bob", json!({ "items": ["a", "b"] }))
        .await;
    fixture.wait_for_terminal("bob").await;

    let mut socket = connect(addr, "bob").await;

    let first = next_message(&mut socket).await.expect("closed event");
    let event: Value = match first {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected text, got {:?}", other),
    };
    assert_eq!(event["closed"], true);
    assert_eq!(event["status"], "completed");

    match next_message(&mut socket).await {
        Some(Message::Close(_)) | None => {}
        Some(other) => panic!("expected close after closed event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_push_for_unknown_job_is_refused() {
    let fixture = TestFixture::new();
    let addr = fixture.serve().await;

    let url = format!("ws://{}/api/v1/jobs/nobody/ws", addr);
    assert!(tokio_tungstenite::connect_async(&url).await.is_err());
}
