// ================
// common/src/lib.rs
// ================
//! Common types shared between the taskboard server and its clients.
//!
//! This module defines the domain entities served over the REST API and the
//! WebSocket protocol used for project-scoped real-time updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a user
pub type UserId = String;
/// Identifier of a project; also names the real-time room for that project
pub type ProjectId = String;
/// Identifier of a task
pub type TaskId = String;

/// Public view of a registered user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// A project and its membership
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    /// User that created the project
    pub owner: UserId,
    /// Invited users. The owner is added on creation.
    #[serde(default)]
    pub members: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Workflow state of a task
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskStatus {
    #[default]
    ToDo,
    InProgress,
    Done,
}

/// Priority of a task
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// A comment left on a task
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Author of the comment
    pub user: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A task belonging to exactly one project
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    /// Owning project
    pub project: ProjectId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserId>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Number of tasks in each status
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    #[serde(rename = "ToDo")]
    pub to_do: usize,
    #[serde(rename = "InProgress")]
    pub in_progress: usize,
    #[serde(rename = "Done")]
    pub done: usize,
}

impl StatusCounts {
    /// Count the given tasks by status
    pub fn tally<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        tasks
            .into_iter()
            .fold(Self::default(), |mut counts, task| {
                match task.status {
                    TaskStatus::ToDo => counts.to_do += 1,
                    TaskStatus::InProgress => counts.in_progress += 1,
                    TaskStatus::Done => counts.done += 1,
                }
                counts
            })
    }

    pub fn total(&self) -> usize {
        self.to_do + self.in_progress + self.done
    }
}

/// Kind of a real-time event. Serialized names are the wire event names.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
    CommentAdded,
}

impl EventKind {
    /// Wire name of the event
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::TaskCreated => "taskCreated",
            EventKind::TaskUpdated => "taskUpdated",
            EventKind::TaskDeleted => "taskDeleted",
            EventKind::CommentAdded => "commentAdded",
        }
    }
}

/// Body of an event: the full task, or only its id once deleted
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum EventPayload {
    Task(Task),
    Deleted {
        #[serde(rename = "taskId")]
        task_id: TaskId,
    },
}

/// Event pushed to every connection watching a project.
///
/// Envelopes are immutable once built; use the constructors for each mutation
/// kind so the kind and payload shape always agree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "event")]
    kind: EventKind,
    project_id: ProjectId,
    payload: EventPayload,
}

impl Envelope {
    pub fn task_created(task: &Task) -> Self {
        Self::with_task(EventKind::TaskCreated, task)
    }

    pub fn task_updated(task: &Task) -> Self {
        Self::with_task(EventKind::TaskUpdated, task)
    }

    pub fn comment_added(task: &Task) -> Self {
        Self::with_task(EventKind::CommentAdded, task)
    }

    pub fn task_deleted(project_id: impl Into<ProjectId>, task_id: impl Into<TaskId>) -> Self {
        Self {
            kind: EventKind::TaskDeleted,
            project_id: project_id.into(),
            payload: EventPayload::Deleted {
                task_id: task_id.into(),
            },
        }
    }

    fn with_task(kind: EventKind, task: &Task) -> Self {
        Self {
            kind,
            project_id: task.project.clone(),
            payload: EventPayload::Task(task.clone()),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }
}

/// Messages sent from client to server over the WebSocket
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Start watching a project. Any previously watched project is dropped.
    JoinProject { project_id: ProjectId },
    /// Stop watching a project
    LeaveProject { project_id: ProjectId },
}

/// Replies sent from server to client over the WebSocket.
///
/// Events are pushed as bare [`Envelope`]s, not wrapped in this enum.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// The connection now receives events for this project
    Joined { project_id: ProjectId },
    /// The connection no longer receives events for this project
    Left { project_id: ProjectId },
    /// The request was rejected
    Error { code: String, message: String },
}
