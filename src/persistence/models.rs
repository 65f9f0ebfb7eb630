//! Database row shapes and their conversion into domain records.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Snippet, SnippetId, SnippetRecord, User, UserId};
use crate::error::ServiceError;

/// Row of the `users` table:
/// `(id, username, email, password_hash, created_at)`.
pub type UserRow = (Uuid, String, Option<String>, String, DateTime<Utc>);

/// Row of the snippet listing query: the `snippets` columns followed by
/// the owner's username and the access-log count.
pub type SnippetRow = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    String,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
    DateTime<Utc>,
    String,
    i64,
);

/// Converts a [`UserRow`] into a [`User`].
#[must_use]
pub fn user_from_row(row: UserRow) -> User {
    let (id, username, email, password_hash, created_at) = row;
    User {
        id: UserId::from_uuid(id),
        username,
        email,
        password_hash,
        created_at,
    }
}

/// Converts a [`SnippetRow`] into a [`SnippetRecord`].
///
/// # Errors
///
/// Returns [`ServiceError::PersistenceError`] if a stored language or
/// visibility tag is not recognised.
pub fn record_from_row(row: SnippetRow) -> Result<SnippetRecord, ServiceError> {
    let (
        id,
        owner_id,
        title,
        content,
        language,
        visibility,
        expires_at,
        created_at,
        updated_at,
        owner_username,
        access_count,
    ) = row;
    Ok(SnippetRecord {
        snippet: Snippet {
            id: SnippetId::from_uuid(id),
            owner_id: UserId::from_uuid(owner_id),
            title,
            content,
            language: language.parse().map_err(ServiceError::PersistenceError)?,
            visibility: visibility.parse().map_err(ServiceError::PersistenceError)?,
            expires_at,
            created_at,
            updated_at,
        },
        owner_username,
        access_count: u64::try_from(access_count).unwrap_or(0),
    })
}
