// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! REST handlers.
//!
//! Every handler behind `require_auth` takes the caller from the
//! [`AuthUser`](crate::middleware::AuthUser) extension. Mutations check access
//! before writing and publish their event only after the write succeeded.

pub mod auth;
pub mod dashboard;
pub mod projects;
pub mod tasks;

use serde::{Deserialize, Deserializer, Serialize};
use taskboard_common::{Project, Task};

use crate::error::AppError;
use crate::storage::Storage;

/// Body returned by deletions and other acknowledgements
#[derive(Serialize, Debug)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

pub(crate) async fn project_or_404<S: Storage>(storage: &S, id: &str) -> Result<Project, AppError> {
    storage
        .find_project(id)
        .await?
        .ok_or(AppError::ProjectNotFound)
}

pub(crate) async fn task_or_404<S: Storage>(storage: &S, id: &str) -> Result<Task, AppError> {
    storage.find_task(id).await?.ok_or(AppError::TaskNotFound)
}

/// For update fields that can be cleared: combined with `#[serde(default)]`, a
/// missing field stays `None` while an explicit `null` becomes `Some(None)`
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize, Debug)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        note: Option<Option<String>>,
    }

    #[test]
    fn test_nullable_tells_missing_from_null() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.note, None);

        let cleared: Patch = serde_json::from_str(r#"{"note": null}"#).unwrap();
        assert_eq!(cleared.note, Some(None));

        let set: Patch = serde_json::from_str(r#"{"note": "hi"}"#).unwrap();
        assert_eq!(set.note, Some(Some("hi".to_string())));
    }
}
