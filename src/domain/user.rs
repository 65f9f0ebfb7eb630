//! Registered user accounts.

use chrono::{DateTime, Utc};

use super::UserId;

/// Maximum username length in characters.
pub const USERNAME_MAX_CHARS: usize = 150;

/// A registered account that can own snippets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Optional contact address.
    pub email: Option<String>,
    /// Argon2 PHC-format password hash.
    pub password_hash: String,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

/// Returns `true` if `username` only uses letters, digits and `@.+-_`.
#[must_use]
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= USERNAME_MAX_CHARS
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}
