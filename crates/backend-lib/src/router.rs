// ============================
// taskboard-backend-lib/src/router.rs
// ============================
//! HTTP routes.
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{auth, dashboard, projects, tasks};
use crate::middleware::{rate_limit, require_auth};
use crate::storage::Storage;
use crate::ws_router::ws_handler;
use crate::AppState;

/// Build the full application router
pub fn create_router<S: Storage + Clone + 'static>(state: Arc<AppState<S>>) -> Router {
    let protected = Router::new()
        .route("/api/auth/me", get(auth::me::<S>))
        .route("/api/auth/logout", post(auth::logout::<S>))
        .route(
            "/api/projects",
            post(projects::create_project::<S>).get(projects::list_projects::<S>),
        )
        .route("/api/projects/dashboard", get(dashboard::dashboard::<S>))
        .route(
            "/api/projects/{id}",
            get(projects::get_project::<S>)
                .put(projects::update_project::<S>)
                .delete(projects::delete_project::<S>),
        )
        .route("/api/projects/{id}/invite", post(projects::invite_member::<S>))
        .route("/api/tasks", post(tasks::create_task::<S>))
        .route("/api/tasks/search", get(tasks::search_tasks::<S>))
        .route(
            "/api/tasks/{id}",
            get(tasks::list_project_tasks::<S>)
                .put(tasks::update_task::<S>)
                .delete(tasks::delete_task::<S>),
        )
        .route("/api/tasks/{id}/comment", post(tasks::add_comment::<S>))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_auth::<S>,
        ));

    let mut router = Router::new()
        .route("/health", get(|| async { "Healthy" }))
        .route("/ws", get(ws_handler::<S>))
        .route("/api/auth/register", post(auth::register::<S>))
        .route("/api/auth/login", post(auth::login::<S>))
        .merge(protected)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            rate_limit::<S>,
        ))
        .layer(TraceLayer::new_for_http());

    if state.settings.cors_permissive {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}
