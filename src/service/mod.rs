//! Service layer: business logic orchestration.
//!
//! [`SnippetService`] applies visibility and ownership rules, records
//! access logs and keeps the listing cache coherent. [`UserService`]
//! handles registration and credentials.

pub mod snippet_service;
pub mod user_service;

pub use snippet_service::{SnippetAnalytics, SnippetDraft, SnippetPatch, SnippetService, SnippetView};
pub use user_service::UserService;
