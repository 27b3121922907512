// ============================
// taskboard-backend-lib/src/storage.rs
// ============================
//! Storage abstraction with flat-file implementation.
//!
//! Each entity is one JSON document under `<root>/<collection>/<id>.json`.
//! Writes go to a uniquely named temporary file that is renamed into place.
//! Read-modify-write cycles on one document hold that document's lock, so
//! concurrent updates are applied one after another instead of overwriting
//! each other.
use std::{
    collections::hash_map::DefaultHasher,
    fs,
    hash::{Hash, Hasher},
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use taskboard_common::{Project, ProjectId, Task, UserId, UserProfile};
use tokio::{
    fs as tokio_fs,
    sync::{Mutex, MutexGuard},
};
use uuid::Uuid;

use crate::error::AppError;
use crate::validation;

/// A stored user, including the password hash
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    /// Lowercased email address
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Trait for storage backends
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert a new user. Fails with `EmailTaken` if another user already
    /// holds the email, even when both registrations race.
    async fn create_user(&self, user: &UserRecord) -> Result<(), AppError>;

    /// Find a user by id
    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, AppError>;

    /// Find a user by email (case-insensitive)
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError>;

    /// Insert a new project
    async fn create_project(&self, project: &Project) -> Result<(), AppError>;

    /// Find a project by id
    async fn find_project(&self, id: &str) -> Result<Option<Project>, AppError>;

    /// All projects the user owns or was invited to
    async fn find_projects_for_member(&self, user_id: &str) -> Result<Vec<Project>, AppError>;

    /// Apply `change` to the stored project and write it back, returning the
    /// committed project. Nothing is written if `change` fails.
    async fn update_project<F>(&self, id: &str, change: F) -> Result<Project, AppError>
    where
        F: FnOnce(&mut Project) -> Result<(), AppError> + Send;

    /// Delete a project. Returns false if it did not exist.
    async fn delete_project(&self, id: &str) -> Result<bool, AppError>;

    /// Insert a new task
    async fn create_task(&self, task: &Task) -> Result<(), AppError>;

    /// Find a task by id
    async fn find_task(&self, id: &str) -> Result<Option<Task>, AppError>;

    /// All tasks belonging to any of the given projects
    async fn find_tasks_for_projects(&self, project_ids: &[ProjectId]) -> Result<Vec<Task>, AppError>;

    /// Apply `change` to the stored task and write it back, returning the
    /// committed task. Nothing is written if `change` fails.
    async fn update_task<F>(&self, id: &str, change: F) -> Result<Task, AppError>
    where
        F: FnOnce(&mut Task) -> Result<(), AppError> + Send;

    /// Delete a task. Returns false if it did not exist.
    async fn delete_task(&self, id: &str) -> Result<bool, AppError>;
}

const USERS: &str = "users";
const PROJECTS: &str = "projects";
const TASKS: &str = "tasks";

const LOCK_STRIPES: usize = 64;

/// Flat-file implementation of the Storage trait
///
/// Clones share the same locks, so every handle onto one directory must come
/// from the same `FlatFileStorage`.
#[derive(Clone, Debug)]
pub struct FlatFileStorage {
    root: PathBuf,
    /// Document locks, picked by hashing `(collection, id)`
    locks: Arc<[Mutex<()>]>,
    /// Serializes the email check with the insert in `create_user`
    users_lock: Arc<Mutex<()>>,
}

impl FlatFileStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        for collection in [USERS, PROJECTS, TASKS] {
            fs::create_dir_all(root.join(collection))?;
        }
        let locks: Vec<Mutex<()>> = (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect();
        Ok(Self {
            root,
            locks: locks.into(),
            users_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn doc_path(&self, collection: &str, id: &str) -> Result<PathBuf, AppError> {
        // ids become file names
        validation::validate_id(id)?;
        Ok(self.root.join(collection).join(format!("{id}.json")))
    }

    async fn lock_doc(&self, collection: &str, id: &str) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        (collection, id).hash(&mut hasher);
        let stripe = (hasher.finish() % self.locks.len() as u64) as usize;
        self.locks[stripe].lock().await
    }

    async fn read_doc<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, AppError> {
        // an id that could never have been stored is simply absent
        let Ok(path) = self.doc_path(collection, id) else {
            return Ok(None);
        };
        match tokio_fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_doc<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        doc: &T,
    ) -> Result<(), AppError> {
        let path = self.doc_path(collection, id)?;
        let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        let json = serde_json::to_vec_pretty(doc)?;
        tokio_fs::write(&tmp, json).await?;
        if let Err(e) = tokio_fs::rename(&tmp, &path).await {
            let _ = tokio_fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Locked read, change, write of one document
    async fn modify_doc<T, F>(
        &self,
        collection: &str,
        id: &str,
        missing: AppError,
        change: F,
    ) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Result<(), AppError>,
    {
        let _guard = self.lock_doc(collection, id).await;
        let mut doc: T = match self.read_doc(collection, id).await? {
            Some(doc) => doc,
            None => return Err(missing),
        };
        change(&mut doc)?;
        self.write_doc(collection, id, &doc).await?;
        Ok(doc)
    }

    async fn remove_doc(&self, collection: &str, id: &str) -> Result<bool, AppError> {
        let Ok(path) = self.doc_path(collection, id) else {
            return Ok(false);
        };
        let _guard = self.lock_doc(collection, id).await;
        match tokio_fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_docs<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, AppError> {
        let mut entries = tokio_fs::read_dir(self.root.join(collection)).await?;
        let mut docs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let bytes = match tokio_fs::read(&path).await {
                    Ok(bytes) => bytes,
                    // deleted since the directory was listed
                    Err(e) if e.kind() == ErrorKind::NotFound => continue,
                    Err(e) => return Err(e.into()),
                };
                docs.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(docs)
    }
}

#[async_trait]
impl Storage for FlatFileStorage {
    async fn create_user(&self, user: &UserRecord) -> Result<(), AppError> {
        let _guard = self.users_lock.lock().await;
        if self.find_user_by_email(&user.email).await?.is_some() {
            return Err(AppError::EmailTaken);
        }
        self.write_doc(USERS, &user.id, user).await
    }

    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, AppError> {
        self.read_doc(USERS, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let email = email.trim().to_lowercase();
        let users: Vec<UserRecord> = self.list_docs(USERS).await?;
        Ok(users.into_iter().find(|u| u.email == email))
    }

    async fn create_project(&self, project: &Project) -> Result<(), AppError> {
        self.write_doc(PROJECTS, &project.id, project).await
    }

    async fn find_project(&self, id: &str) -> Result<Option<Project>, AppError> {
        self.read_doc(PROJECTS, id).await
    }

    async fn find_projects_for_member(&self, user_id: &str) -> Result<Vec<Project>, AppError> {
        let mut projects: Vec<Project> = self.list_docs(PROJECTS).await?;
        projects.retain(|p| crate::access::is_member(p, user_id));
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(projects)
    }

    async fn update_project<F>(&self, id: &str, change: F) -> Result<Project, AppError>
    where
        F: FnOnce(&mut Project) -> Result<(), AppError> + Send,
    {
        self.modify_doc(PROJECTS, id, AppError::ProjectNotFound, change)
            .await
    }

    async fn delete_project(&self, id: &str) -> Result<bool, AppError> {
        self.remove_doc(PROJECTS, id).await
    }

    async fn create_task(&self, task: &Task) -> Result<(), AppError> {
        self.write_doc(TASKS, &task.id, task).await
    }

    async fn find_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        self.read_doc(TASKS, id).await
    }

    async fn find_tasks_for_projects(&self, project_ids: &[ProjectId]) -> Result<Vec<Task>, AppError> {
        let mut tasks: Vec<Task> = self.list_docs(TASKS).await?;
        tasks.retain(|t| project_ids.contains(&t.project));
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tasks)
    }

    async fn update_task<F>(&self, id: &str, change: F) -> Result<Task, AppError>
    where
        F: FnOnce(&mut Task) -> Result<(), AppError> + Send,
    {
        self.modify_doc(TASKS, id, AppError::TaskNotFound, change).await
    }

    async fn delete_task(&self, id: &str) -> Result<bool, AppError> {
        self.remove_doc(TASKS, id).await
    }

}
