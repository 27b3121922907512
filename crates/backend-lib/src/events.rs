// ============================
// crates/backend-lib/src/events.rs
// ============================
//! Turns committed task mutations into room broadcasts.
//!
//! Handlers call these only after the store write has succeeded. Nothing here
//! returns an error: real-time delivery is a side channel and must not change
//! the outcome of a write that already happened.
use std::sync::Arc;

use taskboard_common::{Envelope, Task};

use crate::rooms::{BroadcastReport, RoomRegistry};

#[derive(Clone)]
pub struct EventPublisher {
    rooms: Arc<RoomRegistry>,
}

impl EventPublisher {
    pub fn new(rooms: Arc<RoomRegistry>) -> Self {
        Self { rooms }
    }

    pub fn task_created(&self, task: &Task) -> BroadcastReport {
        self.publish(Envelope::task_created(task))
    }

    pub fn task_updated(&self, task: &Task) -> BroadcastReport {
        self.publish(Envelope::task_updated(task))
    }

    pub fn task_deleted(&self, project_id: &str, task_id: &str) -> BroadcastReport {
        self.publish(Envelope::task_deleted(project_id, task_id))
    }

    /// `task` must already include the new comment
    pub fn comment_added(&self, task: &Task) -> BroadcastReport {
        self.publish(Envelope::comment_added(task))
    }

    fn publish(&self, envelope: Envelope) -> BroadcastReport {
        let project_id = envelope.project_id().to_string();
        self.rooms.broadcast(&project_id, envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::ConnectionHandle;
    use chrono::Utc;
    use serde_json::json;
    use taskboard_common::{Comment, EventKind, EventPayload, TaskPriority, TaskStatus};
    use tokio::sync::mpsc::error::TryRecvError;

    fn task(id: &str, project: &str, title: &str) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            project: project.to_string(),
            title: title.to_string(),
            description: None,
            assignee: None,
            status: TaskStatus::ToDo,
            priority: TaskPriority::Medium,
            due_date: None,
            comments: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn setup() -> (EventPublisher, Arc<RoomRegistry>) {
        let rooms = Arc::new(RoomRegistry::new());
        (EventPublisher::new(Arc::clone(&rooms)), rooms)
    }

    #[test]
    fn test_task_created_reaches_joined_connection_only() {
        let (events, rooms) = setup();
        let (a, mut a_rx) = ConnectionHandle::channel(8);
        let (_b, mut b_rx) = ConnectionHandle::channel(8);
        rooms.join(&a, "proj1");

        let report = events.task_created(&task("t9", "proj1", "Ship it"));
        assert_eq!(report.delivered, 1);

        let envelope = a_rx.try_recv().unwrap();
        assert_eq!(envelope.kind(), EventKind::TaskCreated);
        match envelope.payload() {
            EventPayload::Task(t) => {
                assert_eq!(t.id, "t9");
                assert_eq!(t.title, "Ship it");
            },
            other => panic!("Expected task payload, got {other:?}"),
        }
        assert!(matches!(b_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_task_deleted_payload_is_exactly_task_id() {
        let (events, rooms) = setup();
        let (a, mut a_rx) = ConnectionHandle::channel(8);
        let (b, mut b_rx) = ConnectionHandle::channel(8);
        rooms.join(&a, "proj1");
        rooms.join(&b, "proj1");

        assert_eq!(events.task_deleted("proj1", "t1").delivered, 2);

        for rx in [&mut a_rx, &mut b_rx] {
            let envelope = rx.try_recv().unwrap();
            let value = serde_json::to_value(envelope.as_ref()).unwrap();
            assert_eq!(value["event"], "taskDeleted");
            assert_eq!(value["payload"], json!({"taskId": "t1"}));
        }
    }

    #[test]
    fn test_update_and_comment_events_use_owning_project() {
        let (events, rooms) = setup();
        let (a, mut a_rx) = ConnectionHandle::channel(8);
        rooms.join(&a, "proj2");

        let mut t = task("t1", "proj2", "Review");
        events.task_updated(&t);
        t.comments.push(Comment {
            user: "u1".to_string(),
            text: "done?".to_string(),
            created_at: Utc::now(),
        });
        events.comment_added(&t);

        let updated = a_rx.try_recv().unwrap();
        assert_eq!(updated.kind(), EventKind::TaskUpdated);
        assert_eq!(updated.project_id(), "proj2");

        let commented = a_rx.try_recv().unwrap();
        assert_eq!(commented.kind(), EventKind::CommentAdded);
        match commented.payload() {
            EventPayload::Task(t) => assert_eq!(t.comments.len(), 1),
            other => panic!("Expected task payload, got {other:?}"),
        }
    }

    #[test]
    fn test_publish_without_listeners_is_harmless() {
        let (events, _rooms) = setup();
        let report = events.task_created(&task("t1", "empty", "Nobody watching"));
        assert_eq!(report, BroadcastReport::default());
    }
}
