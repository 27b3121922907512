// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! Registration, login and session endpoints.
use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taskboard_common::UserProfile;
use uuid::Uuid;

use super::MessageResponse;
use crate::auth::{hash_password_secure, verify_password};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::storage::{Storage, UserRecord};
use crate::validation;
use crate::AppState;

#[derive(Deserialize, Debug)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Debug)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

/// `POST /api/auth/register`
pub async fn register<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let name = validation::validate_name(&req.name)?.to_string();
    let email = validation::validate_email(&req.email)?.to_lowercase();
    validation::validate_password(&req.password, &state.settings.password_requirements)?;

    if state.storage.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::EmailTaken);
    }

    // scrypt blocks for tens of milliseconds
    let cost = state.settings.password_requirements.hash_cost;
    let mut password = req.password;
    let password_hash =
        tokio::task::spawn_blocking(move || hash_password_secure(&mut password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
            .map_err(|e| AppError::Internal(e.to_string()))?;

    let user = UserRecord {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        password_hash,
        created_at: Utc::now(),
    };
    state.storage.create_user(&user).await?;
    tracing::info!(user_id = %user.id, "user registered");

    let token = state.auth.issue_token(&user.id).await;
    Ok(Json(AuthResponse {
        token,
        user: user.profile(),
    }))
}

/// `POST /api/auth/login`
pub async fn login<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state
        .storage
        .find_user_by_email(&req.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let hash = user.password_hash.clone();
    let password = req.password;
    let valid = tokio::task::spawn_blocking(move || verify_password(&hash, &password))
        .await
        .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))?;
    if !valid {
        tracing::debug!(user_id = %user.id, "login rejected");
        return Err(AppError::InvalidCredentials);
    }

    let token = state.auth.issue_token(&user.id).await;
    Ok(Json(AuthResponse {
        token,
        user: user.profile(),
    }))
}

/// `GET /api/auth/me`
pub async fn me<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<UserProfile>, AppError> {
    let user = state
        .storage
        .find_user(&caller.id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    Ok(Json(user.profile()))
}

/// `POST /api/auth/logout`
pub async fn logout<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthUser>,
) -> Json<MessageResponse> {
    state.auth.revoke_token(&caller.token).await;
    Json(MessageResponse::new("Logged out"))
}
