// ==================
// crates/backend-lib/src/rooms.rs
// ==================
//! Room Registry Module
//!
//! Maps a project id to the connections currently watching that project and
//! fans events out to them.
//!
//! - A connection belongs to at most one room. Joining another room moves it.
//! - Rooms exist only while they have members; an absent room is an empty one.
//! - Broadcast reaches exactly the members present when it is called. There is
//!   no event log, so a connection that joins later never sees earlier events.
//! - Delivery is best-effort: each connection has a bounded channel and a full
//!   or closed channel only loses that connection's copy.
//!
//! Every operation runs to completion under a single lock and never awaits,
//! so the room map and the connection-to-room map always agree.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{counter, gauge};
use parking_lot::Mutex;
use taskboard_common::{Envelope, ProjectId};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::metrics::{EVENT_BROADCAST, EVENT_DELIVERED, EVENT_DROPPED, ROOMS_ACTIVE};

pub type ConnectionId = Uuid;

/// Handle to one live client connection: its id and outbound event channel
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Arc<Envelope>>,
}

impl ConnectionHandle {
    pub fn new(tx: mpsc::Sender<Arc<Envelope>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx,
        }
    }

    /// Create a handle together with the receiving end of its event channel
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Arc<Envelope>>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Outcome of a single broadcast
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the event was queued for
    pub delivered: usize,
    /// Connections whose channel was full or closed
    pub failed: usize,
}

#[derive(Default)]
struct Rooms {
    members: HashMap<ProjectId, HashMap<ConnectionId, ConnectionHandle>>,
    joined: HashMap<ConnectionId, ProjectId>,
}

impl Rooms {
    /// Drop `conn` from the member set of `project_id`, removing the room once empty
    fn remove_member(&mut self, conn: ConnectionId, project_id: &str) -> bool {
        let Some(room) = self.members.get_mut(project_id) else {
            return false;
        };
        let removed = room.remove(&conn).is_some();
        if room.is_empty() {
            self.members.remove(project_id);
        }
        removed
    }
}

/// Registry of project rooms. One instance is shared through `AppState`.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: Mutex<Rooms>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the connection to a project's room.
    ///
    /// If the connection was watching a different project it is removed from
    /// that room first and the old project id is returned. Joining the room it
    /// is already in changes nothing.
    pub fn join(&self, conn: &ConnectionHandle, project_id: &str) -> Option<ProjectId> {
        let mut guard = self.rooms.lock();
        let rooms = &mut *guard;

        let previous = rooms.joined.get(&conn.id).cloned();
        if previous.as_deref() == Some(project_id) {
            return None;
        }
        if let Some(previous) = &previous {
            rooms.remove_member(conn.id, previous);
        }

        rooms
            .members
            .entry(project_id.to_string())
            .or_default()
            .insert(conn.id, conn.clone());
        rooms.joined.insert(conn.id, project_id.to_string());

        gauge!(ROOMS_ACTIVE).set(rooms.members.len() as f64);
        tracing::debug!(connection = %conn.id, project_id, ?previous, "joined room");
        previous
    }

    /// Remove the connection from a project's room.
    ///
    /// Returns false, and changes nothing, if it was not a member.
    pub fn leave(&self, conn: ConnectionId, project_id: &str) -> bool {
        let mut guard = self.rooms.lock();
        let rooms = &mut *guard;

        if rooms.joined.get(&conn).map(String::as_str) != Some(project_id) {
            return false;
        }
        rooms.joined.remove(&conn);
        let removed = rooms.remove_member(conn, project_id);

        gauge!(ROOMS_ACTIVE).set(rooms.members.len() as f64);
        tracing::debug!(connection = %conn, project_id, "left room");
        removed
    }

    /// Forget a terminated connection, leaving whatever room it was in
    pub fn on_disconnect(&self, conn: ConnectionId) -> Option<ProjectId> {
        let mut guard = self.rooms.lock();
        let rooms = &mut *guard;

        let project_id = rooms.joined.remove(&conn)?;
        rooms.remove_member(conn, &project_id);

        gauge!(ROOMS_ACTIVE).set(rooms.members.len() as f64);
        Some(project_id)
    }

    /// Queue the event for every connection currently in the project's room
    pub fn broadcast(&self, project_id: &str, envelope: Envelope) -> BroadcastReport {
        let kind = envelope.kind().as_str();
        let envelope = Arc::new(envelope);
        let mut report = BroadcastReport::default();

        {
            let rooms = self.rooms.lock();
            let Some(room) = rooms.members.get(project_id) else {
                tracing::trace!(project_id, event = kind, "no connections in room");
                return report;
            };

            for (id, conn) in room {
                match conn.tx.try_send(Arc::clone(&envelope)) {
                    Ok(()) => report.delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(connection = %id, project_id, event = kind, "connection buffer full, event dropped");
                        report.failed += 1;
                    },
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!(connection = %id, project_id, event = kind, "connection closed, event dropped");
                        report.failed += 1;
                    },
                }
            }
        }

        counter!(EVENT_BROADCAST, "event" => kind).increment(1);
        counter!(EVENT_DELIVERED).increment(report.delivered as u64);
        if report.failed > 0 {
            counter!(EVENT_DROPPED).increment(report.failed as u64);
        }
        tracing::debug!(project_id, event = kind, delivered = report.delivered, failed = report.failed, "broadcast");
        report
    }

    /// Room the connection is currently in
    pub fn room_of(&self, conn: ConnectionId) -> Option<ProjectId> {
        self.rooms.lock().joined.get(&conn).cloned()
    }

    /// Number of connections in a project's room
    pub fn room_size(&self, project_id: &str) -> usize {
        self.rooms
            .lock()
            .members
            .get(project_id)
            .map_or(0, HashMap::len)
    }

    /// Number of non-empty rooms
    pub fn room_count(&self) -> usize {
        self.rooms.lock().members.len()
    }
}
