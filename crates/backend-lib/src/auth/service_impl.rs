use crate::auth::{AuthService, SessionManager};
use async_trait::async_trait;
use taskboard_common::UserId;

pub struct DefaultAuth {
    sm: SessionManager,
}

impl DefaultAuth {
    pub fn new(sm: SessionManager) -> Self {
        Self { sm }
    }
}

#[async_trait]
impl AuthService for DefaultAuth {
    async fn issue_token(&self, user_id: &str) -> String {
        self.sm.create_session(user_id.to_string()).await
    }

    async fn verify_token(&self, token: &str) -> Option<UserId> {
        self.sm.get(token).await.map(|session| session.user_id)
    }

    async fn revoke_token(&self, token: &str) -> bool {
        self.sm.revoke(token).await
    }
}
