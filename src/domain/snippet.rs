//! Snippet record, its enumerated tags, and the visibility rules that decide
//! who may see it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{SnippetId, UserId};

/// Number of characters kept in a list preview before the ellipsis marker.
pub const PREVIEW_CHARS: usize = 100;

/// Marker appended to truncated previews.
pub const PREVIEW_ELLIPSIS: &str = "...";

/// Language tag attached to a snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Python.
    Python,
    /// JavaScript.
    JavaScript,
    /// Java.
    Java,
    /// C++.
    Cpp,
    /// HTML.
    Html,
    /// CSS.
    Css,
    /// Elixir.
    Elixir,
    /// PHP.
    Php,
    /// Vue single-file components.
    Vue,
    /// Laravel (PHP framework).
    Laravel,
    /// Phoenix (Elixir framework).
    Phoenix,
    /// Django (Python framework).
    Django,
    /// Unhighlighted plain text.
    #[default]
    PlainText,
}

impl Language {
    /// Every supported language, in catalog order.
    pub const ALL: [Self; 13] = [
        Self::Python,
        Self::JavaScript,
        Self::Java,
        Self::Cpp,
        Self::Html,
        Self::Css,
        Self::Elixir,
        Self::Php,
        Self::Vue,
        Self::Laravel,
        Self::Phoenix,
        Self::Django,
        Self::PlainText,
    ];

    /// Wire/storage tag, e.g. `"cpp"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::Html => "html",
            Self::Css => "css",
            Self::Elixir => "elixir",
            Self::Php => "php",
            Self::Vue => "vue",
            Self::Laravel => "laravel",
            Self::Phoenix => "phoenix",
            Self::Django => "django",
            Self::PlainText => "plaintext",
        }
    }

    /// Human-readable label, e.g. `"C++"`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Python => "Python",
            Self::JavaScript => "JavaScript",
            Self::Java => "Java",
            Self::Cpp => "C++",
            Self::Html => "HTML",
            Self::Css => "CSS",
            Self::Elixir => "Elixir",
            Self::Php => "PHP",
            Self::Vue => "Vue",
            Self::Laravel => "Laravel",
            Self::Phoenix => "Phoenix",
            Self::Django => "Django",
            Self::PlainText => "Plain Text",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.as_str() == s)
            .ok_or_else(|| format!("\"{s}\" is not a valid language"))
    }
}

/// Who may see a snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Anyone may list and read it.
    #[default]
    Public,
    /// Only the owner may list and read it.
    Private,
    /// Never listed for other users; readable only by the owner.
    Unlisted,
}

impl Visibility {
    /// Wire/storage tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Unlisted => "unlisted",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            "unlisted" => Ok(Self::Unlisted),
            other => Err(format!("\"{other}\" is not a valid visibility")),
        }
    }
}

/// A stored piece of text with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    /// Unique snippet identifier.
    pub id: SnippetId,
    /// Owning user; the only user allowed to mutate the snippet.
    pub owner_id: UserId,
    /// Title, 1 to 255 characters.
    pub title: String,
    /// Snippet body.
    pub content: String,
    /// Language tag.
    pub language: Language,
    /// Visibility level.
    pub visibility: Visibility,
    /// Optional expiry; the snippet disappears from listings after it.
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Snippet {
    /// Returns `true` once `now` is past the expiry timestamp.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }

    /// Returns `true` if `viewer` is the owner.
    #[must_use]
    pub fn is_owned_by(&self, viewer: Option<UserId>) -> bool {
        viewer == Some(self.owner_id)
    }

    /// Whether `viewer` may appear to see this snippet in a list or search.
    ///
    /// Expired snippets are never listed, not even to their owner.
    #[must_use]
    pub fn is_listable_by(&self, viewer: Option<UserId>, now: DateTime<Utc>) -> bool {
        if self.is_expired_at(now) {
            return false;
        }
        self.visibility == Visibility::Public || self.is_owned_by(viewer)
    }

    /// Whether `viewer` may look this snippet up directly by id.
    ///
    /// Owners always can, so they keep access to their own expired
    /// snippets. Everyone else only sees live public snippets.
    #[must_use]
    pub fn is_retrievable_by(&self, viewer: Option<UserId>, now: DateTime<Utc>) -> bool {
        self.is_owned_by(viewer)
            || (self.visibility == Visibility::Public && !self.is_expired_at(now))
    }

    /// List preview of the content.
    #[must_use]
    pub fn preview(&self) -> String {
        preview(&self.content)
    }
}

/// Truncates `content` to [`PREVIEW_CHARS`] characters plus
/// [`PREVIEW_ELLIPSIS`], or returns it unchanged when it is short enough.
#[must_use]
pub fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + PREVIEW_ELLIPSIS.len());
            out.push_str(content.get(..cut).unwrap_or(content));
            out.push_str(PREVIEW_ELLIPSIS);
            out
        }
        None => content.to_string(),
    }
}

/// A snippet joined with the data listings need: the owner's username and
/// the number of recorded views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetRecord {
    /// The snippet itself.
    pub snippet: Snippet,
    /// Username of the owner.
    pub owner_username: String,
    /// Number of access-log rows for the snippet.
    pub access_count: u64,
}
