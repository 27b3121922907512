// ============================
// crates/backend-lib/src/middleware/mod.rs
// ============================
//! Middleware for the Taskboard HTTP API.

pub mod auth;
pub mod rate_limit;

pub use auth::{require_auth, AuthUser};
pub use rate_limit::{rate_limit, RateLimiter};
