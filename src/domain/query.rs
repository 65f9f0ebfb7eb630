//! Listing and search criteria shared by every store implementation.
//!
//! [`SnippetQuery`] carries the caller identity, optional filters and the
//! requested [`SortOrder`]. The in-memory store evaluates it directly with
//! [`SnippetQuery::matches`]; the PostgreSQL store translates the same
//! rules into SQL.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::{Language, SnippetRecord, UserId, Visibility};

/// Column a listing is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Creation timestamp.
    CreatedAt,
    /// Title, lexicographic.
    Title,
    /// Number of recorded views.
    AccessCount,
}

impl SortKey {
    /// Canonical parameter name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Title => "title",
            Self::AccessCount => "access_count",
        }
    }
}

/// Sort key plus direction, parsed from an `ordering` parameter such as
/// `"-created_at"` or `"title"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortOrder {
    /// Column to sort by.
    pub key: SortKey,
    /// `true` for descending order.
    pub descending: bool,
}

impl SortOrder {
    /// Creates a sort order.
    #[must_use]
    pub const fn new(key: SortKey, descending: bool) -> Self {
        Self { key, descending }
    }

    /// Compares two records under this order. Ties fall back to the
    /// snippet id so pages are stable.
    #[must_use]
    pub fn compare(&self, a: &SnippetRecord, b: &SnippetRecord) -> Ordering {
        let primary = match self.key {
            SortKey::CreatedAt => a.snippet.created_at.cmp(&b.snippet.created_at),
            SortKey::Title => a.snippet.title.cmp(&b.snippet.title),
            SortKey::AccessCount => a.access_count.cmp(&b.access_count),
        };
        let primary = if self.descending {
            primary.reverse()
        } else {
            primary
        };
        primary.then_with(|| a.snippet.id.cmp(&b.snippet.id))
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::new(SortKey::CreatedAt, true)
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            f.write_str("-")?;
        }
        f.write_str(self.key.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, field) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let key = match field {
            "created_at" => SortKey::CreatedAt,
            "title" => SortKey::Title,
            "access_count" | "views" => SortKey::AccessCount,
            other => return Err(format!("cannot order by \"{other}\"")),
        };
        Ok(Self::new(key, descending))
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    /// 1-indexed page number.
    pub page: u32,
    /// Page size.
    pub per_page: u32,
}

impl PageRequest {
    /// Number of rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.per_page as u64
    }
}

/// A page of records plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPage {
    /// Records on this page, already ordered.
    pub records: Vec<SnippetRecord>,
    /// Total matching records across all pages.
    pub total: u64,
    /// Earliest `expires_at` among every matching record, on any page.
    /// The page stops describing the listing at that instant.
    pub next_expiry: Option<DateTime<Utc>>,
}

impl RecordPage {
    /// Returns `true` while no matching record has expired yet.
    #[must_use]
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.next_expiry.is_none_or(|at| at > now)
    }
}

/// Who is asking, what they filter on, and how results are ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SnippetQuery {
    /// Authenticated caller, `None` for anonymous requests.
    pub viewer: Option<UserId>,
    /// Substring matched against title, content and language, ignoring
    /// ASCII case. Already trimmed and lowercased; `None` when blank.
    pub text: Option<String>,
    /// Exact language filter.
    pub language: Option<Language>,
    /// Exact visibility filter.
    pub visibility: Option<Visibility>,
    /// Result order.
    pub ordering: SortOrder,
}

impl SnippetQuery {
    /// Creates an unfiltered query for `viewer`.
    #[must_use]
    pub fn for_viewer(viewer: Option<UserId>) -> Self {
        Self {
            viewer,
            ..Self::default()
        }
    }

    /// Sets the free-text term, ignoring blank input.
    #[must_use]
    pub fn with_text(mut self, text: Option<&str>) -> Self {
        self.text = text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_ascii_lowercase);
        self
    }

    /// Returns `true` if `record` belongs in this listing at time `now`.
    #[must_use]
    pub fn matches(&self, record: &SnippetRecord, now: DateTime<Utc>) -> bool {
        let snippet = &record.snippet;
        if !snippet.is_listable_by(self.viewer, now) {
            return false;
        }
        if self.language.is_some_and(|l| l != snippet.language) {
            return false;
        }
        if self.visibility.is_some_and(|v| v != snippet.visibility) {
            return false;
        }
        match &self.text {
            Some(needle) => {
                snippet.title.to_ascii_lowercase().contains(needle.as_str())
                    || snippet.content.to_ascii_lowercase().contains(needle.as_str())
                    || snippet.language.as_str().contains(needle.as_str())
            }
            None => true,
        }
    }
}
