//! WebSocket progress stream for a single job.
//!
//! Each connection receives one JSON text message per progress tick
//! (`{stage, current, total, message?}`), then a final
//! `{closed: true, status, result}` message, after which the socket is closed.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::{IntoResponse, Response},
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use phenorun_core::{JobEvent, JobState};

use super::jobs::job_error_response;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

/// WebSocket upgrade handler.
///
/// Subscribes before upgrading so an unknown job is answered with a plain 404.
pub async fn job_ws_handler(
    ws: WebSocketUpgrade,
    Path(key): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.runner().subscribe(&key) {
        Ok((snapshot, rx)) => ws
            .on_upgrade(move |socket| handle_socket(socket, key, snapshot, rx))
            .into_response(),
        Err(e) => job_error_response(&e).into_response(),
    }
}

/// Handle a single WebSocket connection.
async fn handle_socket(
    socket: WebSocket,
    key: String,
    snapshot: JobState,
    mut rx: broadcast::Receiver<JobEvent>,
) {
    let (mut sender, mut receiver) = socket.split();

    // Track connection metrics
    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!(job_key = %key, "WebSocket client connected");

    if snapshot.status.is_terminal() {
        send_event(&mut sender, &JobEvent::closed(&snapshot)).await;
    } else {
        if let Some(tick) = snapshot.progress.clone() {
            if !send_event(&mut sender, &JobEvent::Tick(tick)).await {
                WS_CONNECTIONS_ACTIVE.dec();
                return;
            }
        }

        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(event) => {
                            let closed = event.is_closed();
                            if !send_event(&mut sender, &event).await || closed {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(job_key = %key, "WebSocket client lagged, skipped {} events", n);
                            WS_LAG_EVENTS.inc();
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!(job_key = %key, "Job event channel closed");
                            break;
                        }
                    }
                }
                incoming = receiver.next() => {
                    match incoming {
                        Some(Ok(Message::Close(_))) | None => {
                            debug!(job_key = %key, "WebSocket client went away");
                            break;
                        }
                        Some(Err(e)) => {
                            warn!(job_key = %key, "WebSocket receive error: {}", e);
                            break;
                        }
                        // Pings are answered by axum; client text is ignored.
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
    }

    let _ = sender.send(Message::Close(None)).await;
    WS_CONNECTIONS_ACTIVE.dec();
    info!(job_key = %key, "WebSocket client disconnected");
}

/// Serialize and send one event. Returns false once the client is gone.
async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &JobEvent) -> bool {
    let kind = if event.is_closed() { "closed" } else { "tick" };
    match serde_json::to_string(event) {
        Ok(json) => {
            if sender.send(Message::Text(json.into())).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                return false;
            }
            WS_MESSAGES_SENT.with_label_values(&[kind]).inc();
            true
        }
        Err(e) => {
            error!("Failed to serialize job event: {}", e);
            true
        }
    }
}
