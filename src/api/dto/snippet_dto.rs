//! Snippet request and response bodies, and listing query parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use super::common_dto::{PaginationMeta, PaginationParams, default_page, default_per_page};
use crate::domain::{
    Language, RecordPage, SnippetId, SnippetQuery, SnippetRecord, SortOrder, UserId, Visibility,
};
use crate::error::ServiceError;
use crate::service::{SnippetDraft, SnippetPatch};

/// Rejects titles made only of whitespace.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("This field may not be blank.".into());
        return Err(err);
    }
    Ok(())
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`).
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Body of `POST /snippets` and `PUT /snippets/{id}`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSnippetRequest {
    /// Title, 1 to 255 characters.
    #[validate(
        length(min = 1, max = 255, message = "Ensure this field has between 1 and 255 characters."),
        custom(function = "not_blank")
    )]
    pub title: String,
    /// Snippet body.
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub content: String,
    /// Language tag, `plaintext` when omitted.
    #[serde(default)]
    pub language: Language,
    /// Visibility, `public` when omitted.
    #[serde(default)]
    pub visibility: Visibility,
    /// Optional expiry; must be in the future.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<CreateSnippetRequest> for SnippetDraft {
    fn from(req: CreateSnippetRequest) -> Self {
        Self {
            title: req.title,
            content: req.content,
            language: req.language,
            visibility: req.visibility,
            expires_at: req.expires_at,
        }
    }
}

/// Body of `PATCH /snippets/{id}`. Omitted fields are left unchanged;
/// `"expires_at": null` removes the expiry.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct PatchSnippetRequest {
    /// New title.
    #[validate(
        length(min = 1, max = 255, message = "Ensure this field has between 1 and 255 characters."),
        custom(function = "not_blank")
    )]
    pub title: Option<String>,
    /// New body.
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub content: Option<String>,
    /// New language tag.
    pub language: Option<Language>,
    /// New visibility.
    pub visibility: Option<Visibility>,
    /// New expiry, or `null` to clear it.
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl From<PatchSnippetRequest> for SnippetPatch {
    fn from(req: PatchSnippetRequest) -> Self {
        Self {
            title: req.title,
            content: req.content,
            language: req.language,
            visibility: req.visibility,
            expires_at: req.expires_at,
        }
    }
}

/// Full snippet representation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SnippetResponse {
    /// Snippet id.
    pub id: SnippetId,
    /// Owner's username.
    pub user: String,
    /// Title.
    pub title: String,
    /// Body.
    pub content: String,
    /// Language tag.
    pub language: Language,
    /// Visibility.
    pub visibility: Visibility,
    /// Expiry, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Whether the expiry has passed.
    pub is_expired: bool,
}

impl SnippetResponse {
    /// Projects a record as seen at `now`.
    #[must_use]
    pub fn from_record(record: &SnippetRecord, now: DateTime<Utc>) -> Self {
        let s = &record.snippet;
        Self {
            id: s.id,
            user: record.owner_username.clone(),
            title: s.title.clone(),
            content: s.content.clone(),
            language: s.language,
            visibility: s.visibility,
            expires_at: s.expires_at,
            created_at: s.created_at,
            updated_at: s.updated_at,
            is_expired: s.is_expired_at(now),
        }
    }
}

/// List-preview representation: no full content.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SnippetPreview {
    /// Snippet id.
    pub id: SnippetId,
    /// Owner's username.
    pub user: String,
    /// Title.
    pub title: String,
    /// First 100 characters of the content, with `...` when cut.
    pub preview: String,
    /// Language tag.
    pub language: Language,
    /// Visibility.
    pub visibility: Visibility,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Whether the expiry has passed.
    pub is_expired: bool,
    /// Recorded views.
    pub access_count: u64,
}

impl SnippetPreview {
    /// Projects a record as seen at `now`.
    #[must_use]
    pub fn from_record(record: &SnippetRecord, now: DateTime<Utc>) -> Self {
        let s = &record.snippet;
        Self {
            id: s.id,
            user: record.owner_username.clone(),
            title: s.title.clone(),
            preview: s.preview(),
            language: s.language,
            visibility: s.visibility,
            created_at: s.created_at,
            is_expired: s.is_expired_at(now),
            access_count: record.access_count,
        }
    }
}

/// Paginated list of previews.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SnippetListResponse {
    /// Previews on this page.
    pub data: Vec<SnippetPreview>,
    /// Paging metadata.
    pub pagination: PaginationMeta,
}

impl SnippetListResponse {
    /// Builds the response body for one page of records.
    #[must_use]
    pub fn from_page(page: &RecordPage, params: PaginationParams, now: DateTime<Utc>) -> Self {
        Self {
            data: page
                .records
                .iter()
                .map(|r| SnippetPreview::from_record(r, now))
                .collect(),
            pagination: PaginationMeta::new(params.clamped(), page.total),
        }
    }
}

/// Query parameters of `GET /snippets`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Exact language tag.
    pub language: Option<String>,
    /// Exact visibility level.
    pub visibility: Option<String>,
    /// `created_at`, `title` or `access_count`, optionally prefixed with `-`.
    pub ordering: Option<String>,
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100).
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl ListParams {
    /// Pagination part of the parameters.
    #[must_use]
    pub const fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }

    /// Builds the listing criteria for `viewer`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] for an unknown language,
    /// visibility or ordering.
    pub fn to_query(&self, viewer: Option<UserId>) -> Result<SnippetQuery, ServiceError> {
        let mut query = SnippetQuery::for_viewer(viewer);
        query.language = parse_filter("language", self.language.as_deref())?;
        query.visibility = parse_filter("visibility", self.visibility.as_deref())?;
        if let Some(ordering) = parse_filter::<SortOrder>("ordering", self.ordering.as_deref())? {
            query.ordering = ordering;
        }
        Ok(query)
    }
}

/// Query parameters of `GET /snippets/search`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Case-insensitive text matched against title, content and language.
    pub q: Option<String>,
    /// Exact language tag.
    pub language: Option<String>,
    /// Exact visibility level.
    pub visibility: Option<String>,
    /// `created_at`, `title` or `access_count`, optionally prefixed with `-`.
    pub ordering: Option<String>,
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100).
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl SearchParams {
    /// Pagination part of the parameters.
    #[must_use]
    pub const fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }

    /// Builds the search criteria for `viewer`.
    ///
    /// # Errors
    ///
    /// Same as [`ListParams::to_query`].
    pub fn to_query(&self, viewer: Option<UserId>) -> Result<SnippetQuery, ServiceError> {
        let filters = ListParams {
            language: self.language.clone(),
            visibility: self.visibility.clone(),
            ordering: self.ordering.clone(),
            page: self.page,
            per_page: self.per_page,
        };
        Ok(filters.to_query(viewer)?.with_text(self.q.as_deref()))
    }
}

/// Parses an optional, possibly blank, query value.
fn parse_filter<T>(field: &str, raw: Option<&str>) -> Result<Option<T>, ServiceError>
where
    T: std::str::FromStr<Err = String>,
{
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|msg| ServiceError::field(field, msg)),
        None => Ok(None),
    }
}
