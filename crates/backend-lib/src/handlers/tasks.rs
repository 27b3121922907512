// ============================
// crates/backend-lib/src/handlers/tasks.rs
// ============================
//! Task endpoints. Each successful mutation is announced to the task's
//! project room.
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use taskboard_common::{Comment, Project, Task, TaskPriority, TaskStatus, UserId};
use uuid::Uuid;

use super::{nullable, project_or_404, task_or_404, MessageResponse};
use crate::access::{is_member, require_member};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::storage::Storage;
use crate::validation;
use crate::AppState;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<UserId>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Fields left out are unchanged. `description`, `assignee` and `dueDate` are
/// cleared by an explicit `null`.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub assignee: Option<Option<UserId>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

#[derive(Deserialize, Debug)]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

impl SearchQuery {
    /// Case-insensitive substring match on title or description, plus exact
    /// status and priority filters when given.
    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        match self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            None => true,
            Some(q) => {
                let q = q.to_lowercase();
                task.title.to_lowercase().contains(&q)
                    || task
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&q))
            },
        }
    }
}

fn check_assignee(project: &Project, assignee: Option<&str>) -> Result<(), AppError> {
    match assignee {
        Some(user) if !is_member(project, user) => Err(AppError::InvalidInput(format!(
            "assignee {user} is not a member of project {}",
            project.id
        ))),
        _ => Ok(()),
    }
}

/// Load a task and its project, requiring the caller to be a project member
async fn task_for_member<S: Storage>(
    storage: &S,
    task_id: &str,
    user_id: &str,
) -> Result<(Task, Project), AppError> {
    let task = task_or_404(storage, task_id).await?;
    let project = project_or_404(storage, &task.project).await?;
    require_member(&project, user_id)?;
    Ok((task, project))
}

/// `POST /api/tasks`
pub async fn create_task<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthUser>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let project = project_or_404(&state.storage, &req.project_id).await?;
    require_member(&project, &caller.id)?;

    let title = validation::validate_title(&req.title)?.to_string();
    validation::validate_description(req.description.as_deref())?;
    check_assignee(&project, req.assignee.as_deref())?;

    let now = Utc::now();
    let task = Task {
        id: Uuid::new_v4().to_string(),
        project: project.id,
        title,
        description: req.description,
        assignee: req.assignee,
        status: req.status.unwrap_or_default(),
        priority: req.priority.unwrap_or_default(),
        due_date: req.due_date,
        comments: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    state.storage.create_task(&task).await?;

    let report = state.events.task_created(&task);
    tracing::debug!(task_id = %task.id, delivered = report.delivered, "task created");
    Ok(Json(task))
}

/// `GET /api/tasks/search`
pub async fn search_tasks<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Task>>, AppError> {
    let project_ids: Vec<_> = state
        .storage
        .find_projects_for_member(&caller.id)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    let mut tasks = state.storage.find_tasks_for_projects(&project_ids).await?;
    tasks.retain(|task| query.matches(task));
    Ok(Json(tasks))
}

/// `GET /api/tasks/{project_id}`
pub async fn list_project_tasks<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<Task>>, AppError> {
    let project = project_or_404(&state.storage, &project_id).await?;
    require_member(&project, &caller.id)?;

    let tasks = state.storage.find_tasks_for_projects(&[project.id]).await?;
    Ok(Json(tasks))
}

/// `PUT /api/tasks/{id}`
pub async fn update_task<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let (task, project) = task_for_member(&state.storage, &id, &caller.id).await?;

    let title = match req.title.as_deref() {
        Some(title) => Some(validation::validate_title(title)?.to_string()),
        None => None,
    };
    if let Some(description) = &req.description {
        validation::validate_description(description.as_deref())?;
    }
    if let Some(assignee) = &req.assignee {
        check_assignee(&project, assignee.as_deref())?;
    }

    let task = state
        .storage
        .update_task(&task.id, move |task| {
            if let Some(title) = title {
                task.title = title;
            }
            if let Some(description) = req.description {
                task.description = description;
            }
            if let Some(assignee) = req.assignee {
                task.assignee = assignee;
            }
            if let Some(status) = req.status {
                task.status = status;
            }
            if let Some(priority) = req.priority {
                task.priority = priority;
            }
            if let Some(due_date) = req.due_date {
                task.due_date = due_date;
            }
            task.updated_at = Utc::now();
            Ok(())
        })
        .await?;
    state.events.task_updated(&task);
    Ok(Json(task))
}

/// `DELETE /api/tasks/{id}`
pub async fn delete_task<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let (task, project) = task_for_member(&state.storage, &id, &caller.id).await?;

    if !state.storage.delete_task(&task.id).await? {
        // removed concurrently
        return Err(AppError::TaskNotFound);
    }
    state.events.task_deleted(&project.id, &task.id);
    Ok(Json(MessageResponse::new("Deleted")))
}

/// `POST /api/tasks/{id}/comment`
pub async fn add_comment<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<Task>, AppError> {
    let text = validation::validate_comment(&req.text)?.to_string();
    let (task, _project) = task_for_member(&state.storage, &id, &caller.id).await?;

    let user = caller.id;
    let task = state
        .storage
        .update_task(&task.id, move |task| {
            let now = Utc::now();
            task.comments.push(Comment {
                user,
                text,
                created_at: now,
            });
            task.updated_at = now;
            Ok(())
        })
        .await?;
    state.events.comment_added(&task);
    Ok(Json(task))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str, description: Option<&str>, status: TaskStatus) -> Task {
        let now = Utc::now();
        Task {
            id: "t1".to_string(),
            project: "p1".to_string(),
            title: title.to_string(),
            description: description.map(str::to_string),
            assignee: None,
            status,
            priority: TaskPriority::Medium,
            due_date: None,
            comments: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_search_text_is_case_insensitive() {
        let t = task("Write Release Notes", Some("covers the API"), TaskStatus::ToDo);
        let by = |q: &str| SearchQuery {
            q: Some(q.to_string()),
            ..Default::default()
        };

        assert!(by("release").matches(&t));
        assert!(by("api").matches(&t));
        assert!(!by("deploy").matches(&t));
        // blank query matches everything
        assert!(by("  ").matches(&t));
        assert!(SearchQuery::default().matches(&t));
    }

    #[test]
    fn test_search_filters() {
        let t = task("Fix bug", None, TaskStatus::InProgress);

        let q = SearchQuery {
            status: Some(TaskStatus::InProgress),
            priority: Some(TaskPriority::Medium),
            ..Default::default()
        };
        assert!(q.matches(&t));

        let q = SearchQuery {
            status: Some(TaskStatus::Done),
            ..Default::default()
        };
        assert!(!q.matches(&t));

        let q = SearchQuery {
            q: Some("bug".to_string()),
            priority: Some(TaskPriority::High),
            ..Default::default()
        };
        assert!(!q.matches(&t));
    }

    #[test]
    fn test_search_query_from_url() {
        let q: SearchQuery =
            parse_query("q=notes&status=InProgress&priority=High");
        assert_eq!(q.q.as_deref(), Some("notes"));
        assert_eq!(q.status, Some(TaskStatus::InProgress));
        assert_eq!(q.priority, Some(TaskPriority::High));
    }

    fn parse_query(query: &str) -> SearchQuery {
        let uri: axum::http::Uri = format!("/api/tasks/search?{query}").parse().unwrap();
        Query::<SearchQuery>::try_from_uri(&uri).unwrap().0
    }
}
