//! WebSocket feed of worker state changes
//!
//! Each connection gets its own subscription to the tracker's broadcaster and
//! receives events published after it connected, serialized as
//! `{"type": "...", "payload": ...}`. Inbound frames are control messages.

use super::AppState;
use crate::liveness::Broadcaster;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, Mutex};

/// Control frames a subscriber may send
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Ping,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Pong,
}

pub fn create_event_routes() -> Router<AppState> {
    Router::new().route("/ws/nodes", get(ws_handler))
}

/// GET /ws/nodes
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let events = state.tracker.events().clone();
    ws.on_upgrade(move |socket| handle_connection(socket, events))
}

async fn handle_connection(socket: WebSocket, events: Broadcaster) {
    tracing::info!("🔌 Worker event subscriber connected");
    let (ws_tx, mut ws_rx) = socket.split();
    let ws_tx = Arc::new(Mutex::new(ws_tx));

    let mut event_rx = events.subscribe();
    let event_ws_tx = ws_tx.clone();
    let mut event_task = tokio::spawn(async move {
        loop {
            let event = match event_rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Subscriber lagged, skipped {} events", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let Ok(json) = serde_json::to_string(&event) else {
                continue;
            };
            if event_ws_tx.lock().await.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let reader_ws_tx = ws_tx.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(msg) = ws_rx.next().await {
            let text = match msg {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!("WebSocket read error: {}", e);
                    break;
                }
            };

            match serde_json::from_str::<ClientFrame>(text.as_str()) {
                Ok(ClientFrame::Ping) => {
                    let Ok(pong) = serde_json::to_string(&ServerFrame::Pong) else {
                        continue;
                    };
                    if reader_ws_tx.lock().await.send(Message::Text(pong.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Dropped malformed subscriber message: {}", e);
                }
            }
        }
    });

    // Whichever side finishes first tears down the other
    tokio::select! {
        _ = &mut event_task => read_task.abort(),
        _ = &mut read_task => event_task.abort(),
    }

    tracing::info!("Worker event subscriber disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_frames() {
        let ping: ClientFrame = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(ping, ClientFrame::Ping);
        assert!(serde_json::from_str::<ClientFrame>("not json").is_err());
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"subscribe"}"#).is_err());
        assert_eq!(serde_json::to_value(ServerFrame::Pong).unwrap(), json!({"type": "pong"}));
    }
}
