//! Append-only record of snippet detail views.

use std::net::IpAddr;

use chrono::{DateTime, Utc};

use super::SnippetId;

/// One read of one snippet.
///
/// Written by the service on every successful detail view, never updated,
/// and removed only together with its snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessLog {
    /// Row identifier.
    pub id: uuid::Uuid,
    /// Snippet that was viewed.
    pub snippet_id: SnippetId,
    /// Requester address.
    pub ip_address: IpAddr,
    /// Requester `User-Agent`, empty when absent.
    pub user_agent: String,
    /// When the view happened.
    pub accessed_at: DateTime<Utc>,
}

impl AccessLog {
    /// Creates a log entry stamped with the current time.
    #[must_use]
    pub fn new(snippet_id: SnippetId, ip_address: IpAddr, user_agent: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            snippet_id,
            ip_address,
            user_agent,
            accessed_at: Utc::now(),
        }
    }
}

/// Requester metadata captured for the access log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client address.
    pub ip_address: IpAddr,
    /// `User-Agent` header value, empty when absent.
    pub user_agent: String,
}

impl ClientInfo {
    /// Builds the log entry for a view of `snippet_id` by this client.
    #[must_use]
    pub fn access_log(&self, snippet_id: SnippetId) -> AccessLog {
        AccessLog::new(snippet_id, self.ip_address, self.user_agent.clone())
    }
}

/// Result of the access-log side effect of a detail view.
///
/// A failed write never fails the view itself, but it is reported here so
/// callers can surface it instead of losing it silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessLogOutcome {
    /// The view was recorded.
    Recorded,
    /// The view was served but could not be recorded.
    Failed(String),
}

impl AccessLogOutcome {
    /// Returns `true` if the log write failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}
