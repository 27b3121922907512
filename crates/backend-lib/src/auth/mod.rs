// ============================
// taskboard-backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod password;
pub mod session;
pub mod token_generator;
mod service;
mod service_impl;

pub use password::{hash_password, hash_password_secure, verify_password};
pub use service::AuthService;
pub use service_impl::DefaultAuth;
pub use session::{Session, SessionManager, MAX_SESSION_TTL};
