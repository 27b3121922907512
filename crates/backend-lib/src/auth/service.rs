use async_trait::async_trait;
use taskboard_common::UserId;

/// Issues and verifies the bearer tokens presented by clients.
///
/// Handlers only ever see the user id resolved here.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Start a session for the user and return its token
    async fn issue_token(&self, user_id: &str) -> String;
    /// Resolve a token to its user, if the session is live
    async fn verify_token(&self, token: &str) -> Option<UserId>;
    /// End a session. Returns false if the token was unknown.
    async fn revoke_token(&self, token: &str) -> bool;
}
