// ============================
// crates/backend-lib/src/access.rs
// ============================
//! Project membership and ownership checks.
use taskboard_common::Project;

use crate::error::AppError;

/// True if the user owns the project or was invited to it
pub fn is_member(project: &Project, user_id: &str) -> bool {
    is_owner(project, user_id) || project.members.iter().any(|m| m == user_id)
}

/// True if the user owns the project
pub fn is_owner(project: &Project, user_id: &str) -> bool {
    project.owner == user_id
}

pub fn require_member(project: &Project, user_id: &str) -> Result<(), AppError> {
    if is_member(project, user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "user {user_id} is not a member of project {}",
            project.id
        )))
    }
}

pub fn require_owner(project: &Project, user_id: &str) -> Result<(), AppError> {
    if is_owner(project, user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "user {user_id} does not own project {}",
            project.id
        )))
    }
}
