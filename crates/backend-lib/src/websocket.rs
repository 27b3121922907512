// ==================
// crates/backend-lib/src/websocket.rs
// ==================
//! WebSocket Handler Module
//!
//! The `WebSocketHandler` is instantiated per connection. It owns the
//! connection's [`ConnectionSession`] and answers the client's join and leave
//! requests. Join is only granted to members of an existing project.
//!
//! Events broadcast to the joined room arrive on the receiver returned by
//! [`WebSocketHandler::new`]; the transport forwards them to the socket.

use std::sync::Arc;

use metrics::counter;
use taskboard_common::{ClientMessage, Envelope, ServerMessage, UserId};
use tokio::sync::mpsc;

use crate::access::is_member;
use crate::connection::ConnectionSession;
use crate::error::AppError;
use crate::metrics::{ROOM_JOINED, ROOM_LEFT};
use crate::storage::Storage;
use crate::AppState;

/// Error code sent for frames that are not valid client messages
pub const MALFORMED_MESSAGE: &str = "MALFORMED_MESSAGE";

/// WebSocket handler for processing messages
pub struct WebSocketHandler<S: Storage + Clone + 'static> {
    state: Arc<AppState<S>>,
    session: ConnectionSession,
}

impl<S: Storage + Clone + 'static> WebSocketHandler<S> {
    pub fn new(
        state: Arc<AppState<S>>,
        user_id: UserId,
    ) -> (Self, mpsc::Receiver<Arc<Envelope>>) {
        let (session, events) = ConnectionSession::open(
            Arc::clone(&state.rooms),
            user_id,
            state.settings.realtime.connection_buffer,
        );
        (Self { state, session }, events)
    }

    pub fn session(&self) -> &ConnectionSession {
        &self.session
    }

    /// Parse and handle one text frame
    pub async fn handle_text(&self, text: &str) -> ServerMessage {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => ServerMessage::Error {
                code: MALFORMED_MESSAGE.to_string(),
                message: e.to_string(),
            },
        }
    }

    /// Handle a client message, returning the reply to send
    pub async fn handle_message(&self, message: ClientMessage) -> ServerMessage {
        let result = match message {
            ClientMessage::JoinProject { project_id } => self.join(project_id).await,
            ClientMessage::LeaveProject { project_id } => Ok(self.leave(project_id)),
        };

        result.unwrap_or_else(|e| ServerMessage::Error {
            code: e.error_code().to_string(),
            message: e.client_message(),
        })
    }

    async fn join(&self, project_id: String) -> Result<ServerMessage, AppError> {
        let project = self
            .state
            .storage
            .find_project(&project_id)
            .await?
            .ok_or(AppError::ProjectNotFound)?;

        if !is_member(&project, self.session.user_id()) {
            tracing::debug!(
                connection = %self.session.id(),
                project_id = %project_id,
                "join refused"
            );
            return Err(AppError::Forbidden(format!(
                "not a member of project {project_id}"
            )));
        }

        let previous = self.session.join(&project_id);
        counter!(ROOM_JOINED).increment(1);
        tracing::debug!(
            connection = %self.session.id(),
            project_id = %project_id,
            previous = ?previous,
            "joined project room"
        );
        Ok(ServerMessage::Joined { project_id })
    }

    fn leave(&self, project_id: String) -> ServerMessage {
        if self.session.leave(&project_id) {
            counter!(ROOM_LEFT).increment(1);
        }
        ServerMessage::Left { project_id }
    }
}
