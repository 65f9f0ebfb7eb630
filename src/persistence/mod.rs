//! Persistence layer: users, snippets and access logs.
//!
//! [`SnippetStore`] is the storage seam used by the service layer. Two
//! implementations exist: [`postgres::PostgresStore`] backed by
//! `sqlx::PgPool`, and [`memory::MemoryStore`] used when persistence is
//! disabled and in tests.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    AccessLog, PageRequest, RecordPage, Snippet, SnippetId, SnippetQuery, SnippetRecord, User,
    UserId,
};
use crate::error::ServiceError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Message used when a username is already registered.
pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

/// Durable storage for users, snippets and access logs.
///
/// Implementations must cascade snippet deletion to the snippet's access
/// logs.
#[async_trait]
pub trait SnippetStore: Send + Sync + std::fmt::Debug + 'static {
    /// Inserts a new user.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] on a duplicate username and
    /// [`ServiceError::PersistenceError`] on storage failure.
    async fn create_user(&self, user: &User) -> Result<(), ServiceError>;

    /// Looks up a user by username.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PersistenceError`] on storage failure.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ServiceError>;

    /// Looks up a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PersistenceError`] on storage failure.
    async fn find_user(&self, id: UserId) -> Result<Option<User>, ServiceError>;

    /// Inserts a new snippet.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PersistenceError`] on storage failure.
    async fn insert_snippet(&self, snippet: &Snippet) -> Result<(), ServiceError>;

    /// Fetches a snippet with its owner's username and view count.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PersistenceError`] on storage failure.
    async fn get_snippet(&self, id: SnippetId) -> Result<Option<SnippetRecord>, ServiceError>;

    /// Overwrites the mutable fields of an existing snippet.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SnippetNotFound`] if the snippet is gone and
    /// [`ServiceError::PersistenceError`] on storage failure.
    async fn update_snippet(&self, snippet: &Snippet) -> Result<(), ServiceError>;

    /// Deletes a snippet and its access logs.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SnippetNotFound`] if the snippet is gone and
    /// [`ServiceError::PersistenceError`] on storage failure.
    async fn delete_snippet(&self, id: SnippetId) -> Result<(), ServiceError>;

    /// Returns one page of snippets matching `query` at time `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PersistenceError`] on storage failure.
    async fn list_snippets(
        &self,
        query: &SnippetQuery,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<RecordPage, ServiceError>;

    /// Appends an access-log row.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PersistenceError`] on storage failure.
    async fn record_access(&self, log: &AccessLog) -> Result<(), ServiceError>;

    /// Counts every access-log row of a snippet.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PersistenceError`] on storage failure.
    async fn count_access(&self, id: SnippetId) -> Result<u64, ServiceError>;

    /// Counts access-log rows per UTC calendar date, from `since` onward.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PersistenceError`] on storage failure.
    async fn daily_access_counts(
        &self,
        id: SnippetId,
        since: DateTime<Utc>,
    ) -> Result<Vec<(NaiveDate, u64)>, ServiceError>;

    /// Checks that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PersistenceError`] if it is not.
    async fn ping(&self) -> Result<(), ServiceError>;
}
