//! Domain layer: records, identifiers, and the rules applied to them.
//!
//! This module holds the snippet and user model, the visibility rules that
//! decide what a caller may list or retrieve, the object-level permission
//! check, listing criteria, and the analytics histogram.

pub mod access_log;
pub mod analytics;
pub mod ids;
pub mod permission;
pub mod query;
pub mod snippet;
pub mod user;

pub use access_log::{AccessLog, AccessLogOutcome, ClientInfo};
pub use analytics::DailyViews;
pub use ids::{SnippetId, UserId};
pub use permission::AccessKind;
pub use query::{PageRequest, RecordPage, SnippetQuery, SortKey, SortOrder};
pub use snippet::{Language, Snippet, SnippetRecord, Visibility};
pub use user::User;
