// ============================
// crates/backend-lib/src/handlers/projects.rs
// ============================
//! Project endpoints.
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskboard_common::Project;
use uuid::Uuid;

use super::{nullable, project_or_404, MessageResponse};
use crate::access::{require_member, require_owner};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::storage::Storage;
use crate::validation;
use crate::AppState;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Fields left out are unchanged; `description` and `deadline` are cleared by
/// an explicit `null`
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub deadline: Option<Option<DateTime<Utc>>>,
}

#[derive(Deserialize, Debug)]
pub struct InviteRequest {
    pub email: String,
}

#[derive(Serialize, Debug)]
pub struct InviteResponse {
    pub message: &'static str,
    pub project: Project,
}

/// `POST /api/projects`
pub async fn create_project<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthUser>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    let title = validation::validate_title(&req.title)?.to_string();
    validation::validate_description(req.description.as_deref())?;

    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4().to_string(),
        title,
        description: req.description,
        deadline: req.deadline,
        owner: caller.id.clone(),
        members: vec![caller.id],
        created_at: now,
        updated_at: now,
    };
    state.storage.create_project(&project).await?;
    tracing::info!(project_id = %project.id, owner = %project.owner, "project created");
    Ok(Json(project))
}

/// `GET /api/projects`
pub async fn list_projects<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<Vec<Project>>, AppError> {
    let projects = state.storage.find_projects_for_member(&caller.id).await?;
    Ok(Json(projects))
}

/// `GET /api/projects/{id}`
pub async fn get_project<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Project>, AppError> {
    let project = project_or_404(&state.storage, &id).await?;
    require_member(&project, &caller.id)?;
    Ok(Json(project))
}

/// `PUT /api/projects/{id}`
pub async fn update_project<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    let title = match req.title.as_deref() {
        Some(title) => Some(validation::validate_title(title)?.to_string()),
        None => None,
    };
    if let Some(description) = &req.description {
        validation::validate_description(description.as_deref())?;
    }

    let user_id = caller.id;
    let project = state
        .storage
        .update_project(&id, move |project| {
            require_owner(project, &user_id)?;
            if let Some(title) = title {
                project.title = title;
            }
            if let Some(description) = req.description {
                project.description = description;
            }
            if let Some(deadline) = req.deadline {
                project.deadline = deadline;
            }
            project.updated_at = Utc::now();
            Ok(())
        })
        .await?;
    Ok(Json(project))
}

/// `DELETE /api/projects/{id}`
///
/// Removes the project first, then its tasks one at a time. Each task is
/// announced as deleted to anyone still watching the project as soon as its
/// removal commits.
pub async fn delete_project<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let project = project_or_404(&state.storage, &id).await?;
    require_owner(&project, &caller.id)?;

    if !state.storage.delete_project(&project.id).await? {
        // removed concurrently
        return Err(AppError::ProjectNotFound);
    }

    let tasks = state
        .storage
        .find_tasks_for_projects(std::slice::from_ref(&project.id))
        .await?;
    let mut deleted = 0;
    for task in &tasks {
        match state.storage.delete_task(&task.id).await {
            Ok(true) => {
                state.events.task_deleted(&project.id, &task.id);
                deleted += 1;
            },
            // already removed by its own delete, which announced it
            Ok(false) => {},
            Err(e) => {
                tracing::warn!(
                    project_id = %project.id,
                    task_id = %task.id,
                    deleted,
                    "project task cleanup failed"
                );
                return Err(e);
            },
        }
    }
    tracing::info!(project_id = %project.id, tasks = deleted, "project deleted");
    Ok(Json(MessageResponse::new("Deleted")))
}

/// `POST /api/projects/{id}/invite`
pub async fn invite_member<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<InviteRequest>,
) -> Result<Json<InviteResponse>, AppError> {
    let project = project_or_404(&state.storage, &id).await?;
    require_owner(&project, &caller.id)?;

    let invitee = state
        .storage
        .find_user_by_email(&req.email)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let project = if project.members.contains(&invitee.id) {
        project
    } else {
        state
            .storage
            .update_project(&id, move |project| {
                if !project.members.contains(&invitee.id) {
                    project.members.push(invitee.id);
                    project.updated_at = Utc::now();
                }
                Ok(())
            })
            .await?
    };

    Ok(Json(InviteResponse {
        message: "User invited",
        project,
    }))
}
