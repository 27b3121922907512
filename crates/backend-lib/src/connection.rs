// ============================
// crates/backend-lib/src/connection.rs
// ============================
//! Connection lifecycle.
//!
//! A `ConnectionSession` lives exactly as long as its client connection.
//! Dropping it leaves whatever room the connection was in, so every exit path
//! of the socket task cleans up membership.
use std::sync::Arc;

use metrics::gauge;
use taskboard_common::{Envelope, ProjectId, UserId};
use tokio::sync::mpsc;

use crate::metrics::WS_ACTIVE;
use crate::rooms::{ConnectionHandle, ConnectionId, RoomRegistry};

pub struct ConnectionSession {
    rooms: Arc<RoomRegistry>,
    handle: ConnectionHandle,
    user_id: UserId,
}

impl ConnectionSession {
    /// Open a session for an authenticated user. The receiver yields the
    /// events broadcast to the room this session joins.
    pub fn open(
        rooms: Arc<RoomRegistry>,
        user_id: UserId,
        buffer: usize,
    ) -> (Self, mpsc::Receiver<Arc<Envelope>>) {
        let (handle, rx) = ConnectionHandle::channel(buffer);
        gauge!(WS_ACTIVE).increment(1.0);
        tracing::debug!(connection = %handle.id(), user_id = %user_id, "connection opened");
        (
            Self {
                rooms,
                handle,
                user_id,
            },
            rx,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Watch a project, dropping any previous one. Returns the project left.
    pub fn join(&self, project_id: &str) -> Option<ProjectId> {
        self.rooms.join(&self.handle, project_id)
    }

    pub fn leave(&self, project_id: &str) -> bool {
        self.rooms.leave(self.handle.id(), project_id)
    }

    pub fn current_room(&self) -> Option<ProjectId> {
        self.rooms.room_of(self.handle.id())
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        let left = self.rooms.on_disconnect(self.handle.id());
        gauge!(WS_ACTIVE).decrement(1.0);
        tracing::debug!(connection = %self.handle.id(), user_id = %self.user_id, room = ?left, "connection closed");
    }
}
