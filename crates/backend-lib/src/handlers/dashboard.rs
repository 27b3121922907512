// ============================
// crates/backend-lib/src/handlers/dashboard.rs
// ============================
use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Serialize;
use taskboard_common::{Project, StatusCounts, Task};

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::storage::Storage;
use crate::AppState;

/// Everything the caller can see, with tasks tallied by status
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub status_counts: StatusCounts,
}

/// `GET /api/projects/dashboard`
pub async fn dashboard<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<DashboardResponse>, AppError> {
    let projects = state.storage.find_projects_for_member(&caller.id).await?;
    let project_ids: Vec<_> = projects.iter().map(|p| p.id.clone()).collect();
    let tasks = state.storage.find_tasks_for_projects(&project_ids).await?;
    let status_counts = StatusCounts::tally(&tasks);

    Ok(Json(DashboardResponse {
        projects,
        tasks,
        status_counts,
    }))
}
