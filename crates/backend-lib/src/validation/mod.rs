// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Request validation module.

use crate::config::PasswordRequirements;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const MAX_NAME_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit
const MAX_TITLE_LENGTH: usize = 200;
const MAX_DESCRIPTION_LENGTH: usize = 5000;
const MAX_COMMENT_LENGTH: usize = 2000;
const MAX_ID_LENGTH: usize = 64;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});
static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid id regex"));

/// Possible validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid title: {0}")]
    InvalidTitle(String),

    #[error("Invalid description: {0}")]
    InvalidDescription(String),

    #[error("Invalid comment: {0}")]
    InvalidComment(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a display name
pub fn validate_name(name: &str) -> ValidationResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::InvalidName(
            "Name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::InvalidName(format!(
            "Name must be between 1 and {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name)
}

/// Validate an email address
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    let email = email.trim();
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail(format!(
            "Email cannot exceed {MAX_EMAIL_LENGTH} characters"
        )));
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(
            "Email format is invalid".to_string(),
        ));
    }
    Ok(email)
}

/// Validate a password against the configured requirements
pub fn validate_password<'a>(
    password: &'a str,
    requirements: &PasswordRequirements,
) -> ValidationResult<&'a str> {
    let len = password.chars().count();
    if len < requirements.min_length {
        return Err(ValidationError::InvalidPassword(format!(
            "Password must be at least {} characters",
            requirements.min_length
        )));
    }
    if len > requirements.max_length {
        return Err(ValidationError::InvalidPassword(format!(
            "Password cannot exceed {} characters",
            requirements.max_length
        )));
    }
    Ok(password)
}

/// Validate a project or task title
pub fn validate_title(title: &str) -> ValidationResult<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::InvalidTitle(
            "Title must not be empty".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::InvalidTitle(format!(
            "Title must be between 1 and {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(title)
}

/// Validate an optional free-text description
pub fn validate_description(description: Option<&str>) -> ValidationResult<()> {
    match description {
        Some(text) if text.chars().count() > MAX_DESCRIPTION_LENGTH => {
            Err(ValidationError::InvalidDescription(format!(
                "Description cannot exceed {MAX_DESCRIPTION_LENGTH} characters"
            )))
        },
        _ => Ok(()),
    }
}

/// Validate comment text
pub fn validate_comment(text: &str) -> ValidationResult<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::InvalidComment(
            "Comment must not be empty".to_string(),
        ));
    }
    if text.chars().count() > MAX_COMMENT_LENGTH {
        return Err(ValidationError::InvalidComment(format!(
            "Comment cannot exceed {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(text)
}

/// Validate an entity identifier supplied by a client
pub fn validate_id(id: &str) -> ValidationResult<&str> {
    if id.is_empty() || id.len() > MAX_ID_LENGTH {
        return Err(ValidationError::InvalidId(format!(
            "Identifier must be between 1 and {MAX_ID_LENGTH} characters"
        )));
    }
    if !ID_REGEX.is_match(id) {
        return Err(ValidationError::InvalidId(
            "Identifier must contain only alphanumeric characters, hyphens and underscores"
                .to_string(),
        ));
    }
    Ok(id)
}
