// ============================
// taskboard-backend-lib/src/auth/session.rs
// ============================
//! Session token handling and management.
use std::{
    collections::HashMap,
    sync::{Arc, Weak},
    time::{Duration, SystemTime},
};

use metrics::{counter, gauge};
use taskboard_common::UserId;
use tokio::sync::RwLock;

use super::token_generator::generate_secure_token;
use crate::metrics::{SESSION_ACTIVE, SESSION_CREATED, SESSION_EXPIRED};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Longest session lifetime a manager will grant (10 years)
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

type Sessions = Arc<RwLock<HashMap<String, Session>>>;

/// Session information
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

impl Session {
    fn is_live(&self, now: SystemTime) -> bool {
        now < self.expires_at
    }
}

/// Session manager for handling authentication tokens
#[derive(Clone)]
pub struct SessionManager {
    sessions: Sessions,
    ttl: Duration,
}

impl SessionManager {
    /// Create a new session manager.
    ///
    /// `ttl` is capped at [`MAX_SESSION_TTL`]. When called inside a tokio
    /// runtime this also starts an hourly sweep of expired sessions. The sweep
    /// stops once every manager clone is dropped.
    pub fn new(ttl: Duration) -> Self {
        let manager = SessionManager {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: ttl.min(MAX_SESSION_TTL),
        };

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let weak = Arc::downgrade(&manager.sessions);
            handle.spawn(cleanup_task(weak));
        }

        manager
    }

    /// Create a new session for `user_id` and return its token
    pub async fn create_session(&self, user_id: UserId) -> String {
        let token = generate_secure_token();
        let now = SystemTime::now();
        let session = Session {
            user_id,
            created_at: now,
            // an unrepresentable expiry means the session is born expired
            expires_at: now.checked_add(self.ttl).unwrap_or(now),
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(token.clone(), session);

        counter!(SESSION_CREATED).increment(1);
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);

        token
    }

    /// Get a live session by token. Expired sessions are never returned.
    pub async fn get(&self, token: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .get(token)
            .filter(|session| session.is_live(SystemTime::now()))
            .cloned()
    }

    /// Validate a session token
    pub async fn validate_session(&self, token: &str) -> bool {
        self.get(token).await.is_some()
    }

    /// Remove a session. Returns false if the token was unknown.
    pub async fn revoke(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(token).is_some();
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        removed
    }

    /// Drop every expired session, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        purge(&self.sessions).await
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

async fn purge(sessions: &RwLock<HashMap<String, Session>>) -> usize {
    let mut sessions = sessions.write().await;
    let now = SystemTime::now();
    let before_count = sessions.len();

    sessions.retain(|_, session| session.is_live(now));

    let after_count = sessions.len();
    let removed = before_count - after_count;

    if removed > 0 {
        counter!(SESSION_EXPIRED).increment(removed as u64);
        gauge!(SESSION_ACTIVE).set(after_count as f64);
        tracing::debug!(removed, "purged expired sessions");
    }
    removed
}

/// Runs periodically to remove expired sessions
async fn cleanup_task(sessions: Weak<RwLock<HashMap<String, Session>>>) {
    loop {
        tokio::time::sleep(CLEANUP_INTERVAL).await;
        let Some(sessions) = sessions.upgrade() else {
            break;
        };
        purge(&sessions).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_session() {
        let sm = SessionManager::new(Duration::from_secs(60));
        let token = sm.create_session("u1".to_string()).await;

        let session = sm.get(&token).await.unwrap();
        assert_eq!(session.user_id, "u1");
        assert!(session.expires_at > session.created_at);
        assert!(sm.validate_session(&token).await);
        assert!(!sm.validate_session("bogus").await);
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let sm = SessionManager::new(Duration::from_secs(60));
        let a = sm.create_session("u1".to_string()).await;
        let b = sm.create_session("u1".to_string()).await;
        assert_ne!(a, b);
        assert_eq!(sm.active_count().await, 2);
    }

    #[tokio::test]
    async fn test_revoke() {
        let sm = SessionManager::new(Duration::from_secs(60));
        let token = sm.create_session("u1".to_string()).await;

        assert!(sm.revoke(&token).await);
        assert!(sm.get(&token).await.is_none());
        assert!(!sm.revoke(&token).await);
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_purged() {
        let sm = SessionManager::new(Duration::ZERO);
        let token = sm.create_session("u1".to_string()).await;

        assert!(sm.get(&token).await.is_none());
        assert_eq!(sm.purge_expired().await, 1);
        assert_eq!(sm.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_huge_ttl_is_capped() {
        let sm = SessionManager::new(Duration::from_secs(u64::MAX));
        let token = sm.create_session("u1".to_string()).await;

        let session = sm.get(&token).await.unwrap();
        assert_eq!(
            session.expires_at.duration_since(session.created_at).unwrap(),
            MAX_SESSION_TTL
        );
    }

    #[test]
    fn test_new_outside_runtime() {
        // no runtime, so no cleanup task; construction must still work
        let sm = SessionManager::new(Duration::from_secs(1));
        drop(sm);
    }
}
