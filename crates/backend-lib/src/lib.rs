// ============================
// taskboard-backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the Taskboard server.

pub mod access;
pub mod auth;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod rooms;
pub mod router;
pub mod storage;
pub mod validation;
pub mod websocket;
pub mod ws_router;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthService, DefaultAuth, SessionManager};
use crate::config::Settings;
use crate::events::EventPublisher;
use crate::middleware::rate_limit::RateLimiter;
use crate::rooms::RoomRegistry;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState<S> {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Session manager
    pub sessions: Arc<SessionManager>,
    /// Settings
    pub settings: Arc<Settings>,
    /// Storage backend
    pub storage: S,
    /// Rate limiter
    pub rate_limiter: Arc<RateLimiter>,
    /// Project rooms for real-time delivery
    pub rooms: Arc<RoomRegistry>,
    /// Publishes task events into `rooms`
    pub events: EventPublisher,
}

impl<S> AppState<S> {
    /// Create a new application state
    pub fn new(storage: S, config: &Settings) -> Self {
        let sessions = Arc::new(SessionManager::new(Duration::from_secs(
            config.session_ttl_secs,
        )));
        let auth = Arc::new(DefaultAuth::new((*sessions).clone()));
        let rate_limiter = RateLimiter::shared(
            Duration::from_secs(config.rate_limit.window_secs),
            config.rate_limit.max_requests,
        );
        let rooms = Arc::new(RoomRegistry::new());
        let events = EventPublisher::new(Arc::clone(&rooms));

        Self {
            auth,
            sessions,
            settings: Arc::new(config.clone()),
            storage,
            rate_limiter,
            rooms,
            events,
        }
    }
}
