// ============================
// crates/backend-lib/src/middleware/auth.rs
// ============================
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use taskboard_common::UserId;

use crate::storage::Storage;
use crate::{error::AppError, AppState};

/// The authenticated caller, placed in request extensions by [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    /// The bearer token the request was authenticated with
    pub token: String,
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Reject requests without a live session token
pub async fn require_auth<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)
        .ok_or_else(|| AppError::Auth("missing bearer token".to_string()))?
        .to_string();

    let id = state
        .auth
        .verify_token(&token)
        .await
        .ok_or_else(|| AppError::Auth("invalid or expired token".to_string()))?;

    request.extensions_mut().insert(AuthUser { id, token });
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::storage::FlatFileStorage;
    use axum::{
        body::Body,
        http::StatusCode,
        routing::get,
        Extension, Router,
    };
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn whoami(Extension(user): Extension<AuthUser>) -> String {
        user.id
    }

    fn app(state: Arc<AppState<FlatFileStorage>>) -> Router {
        Router::new()
            .route("/", get(whoami))
            .layer(axum::middleware::from_fn_with_state(
                Arc::clone(&state),
                require_auth::<FlatFileStorage>,
            ))
            .with_state(state)
    }

    fn get_with(auth: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_require_auth() {
        let temp_dir = TempDir::new().unwrap();
        let state = Arc::new(AppState::new(
            FlatFileStorage::new(temp_dir.path()).unwrap(),
            &Settings::default(),
        ));
        let token = state.auth.issue_token("u1").await;

        let response = app(Arc::clone(&state))
            .oneshot(get_with(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"u1");

        for auth in [None, Some("Bearer nope"), Some(token.as_str()), Some("Bearer ")] {
            let response = app(Arc::clone(&state)).oneshot(get_with(auth)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{auth:?}");
        }
    }
}
