//! `WebSocket` handler for live rain state.
//!
//! Each connection registers a [`ChannelObserver`] with the tracker and
//! forwards queued frames as text messages. A late joiner receives the
//! current episode status as its first frame. The observer is removed
//! when the socket closes; if the socket dies mid-broadcast the registry
//! prunes it on the next fan-out anyway.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use rainwatch_core::ChannelObserver;
use tracing::debug;

use crate::state::{AppState, OBSERVER_QUEUE_CAPACITY};

/// Upgrade an HTTP request to a `WebSocket` observer connection.
///
/// # Route
///
/// `GET /ws` (also served on `GET /`)
pub async fn ws_observer(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Register as an observer and pump frames until either side closes.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let (observer, mut frames) = ChannelObserver::channel(OBSERVER_QUEUE_CAPACITY);
    let id = state.tracker.register(Box::new(observer)).await;
    debug!(observer = %id, "WebSocket observer connected");

    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else {
                    debug!(observer = %id, "Observer queue closed");
                    break;
                };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    debug!(observer = %id, "WebSocket observer disconnected (send failed)");
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(observer = %id, "WebSocket observer disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(observer = %id, "WebSocket observer disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(observer = %id, "WebSocket error: {e}");
                        break;
                    }
                    _ => {
                        // Observers only listen; ignore anything they send.
                    }
                }
            }
        }
    }

    state.tracker.unregister(id).await;
}
