//! Object-level permission check for snippets.
//!
//! Safe (read-only) methods always pass. Mutating methods pass only for
//! the snippet's owner. Authentication itself is checked earlier by the
//! request extractors, so `requester` is `None` only for reads.

use super::{Snippet, UserId, Visibility};

/// Kind of access a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// Read-only access, as for GET, HEAD or OPTIONS.
    Read,
    /// Mutation, as for PUT, PATCH or DELETE.
    Write,
}

/// Returns `true` if `requester` may perform `kind` on `snippet`.
#[must_use]
pub fn has_object_permission(kind: AccessKind, requester: Option<UserId>, snippet: &Snippet) -> bool {
    match kind {
        AccessKind::Read => true,
        AccessKind::Write => snippet.is_owned_by(requester),
    }
}

/// Returns `true` if `requester` may read the analytics of `snippet`:
/// owners always, everyone else only for public snippets.
#[must_use]
pub fn can_view_analytics(requester: Option<UserId>, snippet: &Snippet) -> bool {
    snippet.is_owned_by(requester) || snippet.visibility == Visibility::Public
}
