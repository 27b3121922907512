// ============================
// taskboard-backend-lib/src/ws_router.rs
// ============================
//! WebSocket endpoint and connection handling.
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use metrics::counter;
use serde::{Deserialize, Serialize};
use taskboard_common::UserId;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::metrics::WS_CONNECTION;
use crate::storage::Storage;
use crate::websocket::WebSocketHandler;
use crate::AppState;

/// Frames queued for the socket writer, replies and events together
const OUTBOUND_BUFFER: usize = 32;

#[derive(Deserialize, Debug)]
pub struct WsParams {
    pub token: Option<String>,
}

/// `GET /ws?token=...`
///
/// The session token is checked before the upgrade; browsers cannot set an
/// `Authorization` header on a websocket handshake.
pub async fn ws_handler<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = params.token.filter(|t| !t.is_empty()) else {
        return AppError::Auth("missing token".to_string()).into_response();
    };
    let Some(user_id) = state.auth.verify_token(&token).await else {
        return AppError::Auth("invalid or expired token".to_string()).into_response();
    };

    counter!(WS_CONNECTION).increment(1);
    ws.on_upgrade(move |socket| handle_connection(socket, state, user_id))
}

fn to_frame<T: Serialize>(value: &T) -> Option<Message> {
    match serde_json::to_string(value) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!("failed to serialize outbound frame: {e}");
            None
        },
    }
}

async fn handle_connection<S: Storage + Clone + 'static>(
    socket: WebSocket,
    state: Arc<AppState<S>>,
    user_id: UserId,
) {
    let (mut tx, mut rx) = socket.split();
    let (client_tx, mut client_rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);

    // Dropping the handler ends the session and leaves its room
    let (handler, mut events) = WebSocketHandler::new(state, user_id);
    let connection = handler.session().id();

    // Task 1: Forward frames from the client channel to the WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(message) = client_rx.recv().await {
            if tx.send(message).await.is_err() {
                break;
            }
        }
    });

    // Task 2: Convert room events to WebSocket frames
    let event_tx = client_tx.clone();
    let forward_task = tokio::spawn(async move {
        while let Some(envelope) = events.recv().await {
            let Some(frame) = to_frame(envelope.as_ref()) else {
                continue;
            };
            if event_tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    // Main task: Process incoming WebSocket messages
    while let Some(Ok(message)) = rx.next().await {
        match message {
            Message::Text(text) => {
                let reply = handler.handle_text(text.as_str()).await;
                let Some(frame) = to_frame(&reply) else {
                    continue;
                };
                if client_tx.send(frame).await.is_err() {
                    tracing::debug!(%connection, "socket writer gone");
                    break;
                }
            },
            Message::Close(_) => break,
            _ => {}, // pings are answered by axum
        }
    }

    drop(handler);
    forward_task.abort();
    send_task.abort();
    tracing::debug!(%connection, "websocket closed");
}
