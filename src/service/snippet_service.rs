//! Snippet service: visibility, ownership, access logging and listing cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use crate::cache::{ListingCache, ListingScope};
use crate::domain::analytics::{daily_histogram, histogram_window_start};
use crate::domain::permission::{can_view_analytics, has_object_permission};
use crate::domain::{
    AccessKind, AccessLogOutcome, ClientInfo, DailyViews, Language, PageRequest, RecordPage,
    Snippet, SnippetId, SnippetQuery, SnippetRecord, UserId, Visibility,
};
use crate::error::ServiceError;
use crate::persistence::SnippetStore;

/// Message for an expiry that is not strictly in the future.
pub const EXPIRY_IN_PAST: &str = "Expiration date must be in the future";

/// Writable fields of a snippet, as supplied on create and full replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetDraft {
    /// Title.
    pub title: String,
    /// Body.
    pub content: String,
    /// Language tag.
    pub language: Language,
    /// Visibility level.
    pub visibility: Visibility,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Partial update. `None` leaves a field untouched; `expires_at:
/// Some(None)` clears the expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetPatch {
    /// New title.
    pub title: Option<String>,
    /// New body.
    pub content: Option<String>,
    /// New language tag.
    pub language: Option<Language>,
    /// New visibility level.
    pub visibility: Option<Visibility>,
    /// New expiry, or `Some(None)` to remove it.
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

/// A served detail view plus the fate of its access-log row.
#[derive(Debug, Clone)]
pub struct SnippetView {
    /// The snippet as read.
    pub record: SnippetRecord,
    /// Whether the view was recorded.
    pub access_log: AccessLogOutcome,
}

/// View totals for one snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetAnalytics {
    /// Snippet the figures belong to.
    pub snippet_id: SnippetId,
    /// Every recorded view.
    pub total_views: u64,
    /// Views per UTC date over the last seven days, oldest first.
    pub daily_views: Vec<DailyViews>,
}

/// Orchestrates snippet reads and writes.
///
/// Every write goes to the store first and only then moves the affected
/// cache generations, so a listing computed concurrently with the write is
/// cached under a key nobody asks for again.
#[derive(Debug, Clone)]
pub struct SnippetService {
    store: Arc<dyn SnippetStore>,
    cache: ListingCache,
    access_log_failures: Arc<AtomicU64>,
}

impl SnippetService {
    /// Creates a new `SnippetService`.
    #[must_use]
    pub fn new(store: Arc<dyn SnippetStore>, cache: ListingCache) -> Self {
        Self {
            store,
            cache,
            access_log_failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of detail views whose access-log write failed since startup.
    #[must_use]
    pub fn access_log_failures(&self) -> u64 {
        self.access_log_failures.load(Ordering::Relaxed)
    }

    /// Checks that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns the store's error if it is not.
    pub async fn ping(&self) -> Result<(), ServiceError> {
        self.store.ping().await
    }

    /// Creates a snippet owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] for an expiry that is not in
    /// the future, or a store error.
    pub async fn create(
        &self,
        owner: UserId,
        draft: SnippetDraft,
    ) -> Result<SnippetRecord, ServiceError> {
        let now = Utc::now();
        validate_expiry(draft.expires_at, now)?;

        let snippet = Snippet {
            id: SnippetId::new(),
            owner_id: owner,
            title: draft.title,
            content: draft.content,
            language: draft.language,
            visibility: draft.visibility,
            expires_at: draft.expires_at,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_snippet(&snippet).await?;
        self.cache
            .invalidate_for_write(owner, false, snippet.visibility == Visibility::Public);

        tracing::info!(snippet_id = %snippet.id, owner = %owner, "snippet created");
        self.fetch(snippet.id).await
    }

    /// Serves a detail view and records it in the access log.
    ///
    /// The log write never fails the view; its outcome is returned in
    /// [`SnippetView::access_log`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SnippetNotFound`] when the snippet does not
    /// exist or `viewer` may not retrieve it.
    pub async fn get(
        &self,
        id: SnippetId,
        viewer: Option<UserId>,
        client: &ClientInfo,
    ) -> Result<SnippetView, ServiceError> {
        let mut record = self.retrievable(id, viewer).await?;

        let access_log = match self.store.record_access(&client.access_log(id)).await {
            Ok(()) => {
                record.access_count += 1;
                self.cache.invalidate_views();
                AccessLogOutcome::Recorded
            }
            Err(e) => {
                self.access_log_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(snippet_id = %id, error = %e, "failed to record access log");
                AccessLogOutcome::Failed(e.to_string())
            }
        };

        Ok(SnippetView { record, access_log })
    }

    /// Replaces every writable field of a snippet.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SnippetNotFound`] if the snippet is not
    /// retrievable, [`ServiceError::Forbidden`] if `requester` is not the
    /// owner, or [`ServiceError::Validation`] for a past expiry.
    pub async fn replace(
        &self,
        id: SnippetId,
        requester: UserId,
        draft: SnippetDraft,
    ) -> Result<SnippetRecord, ServiceError> {
        let patch = SnippetPatch {
            title: Some(draft.title),
            content: Some(draft.content),
            language: Some(draft.language),
            visibility: Some(draft.visibility),
            expires_at: Some(draft.expires_at),
        };
        self.patch(id, requester, patch).await
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Same as [`SnippetService::replace`]. The expiry is only checked
    /// when the patch sets a new one.
    pub async fn patch(
        &self,
        id: SnippetId,
        requester: UserId,
        patch: SnippetPatch,
    ) -> Result<SnippetRecord, ServiceError> {
        let current = self.writable(id, requester).await?;
        let now = Utc::now();
        if let Some(expires_at) = patch.expires_at {
            validate_expiry(expires_at, now)?;
        }

        let was_public = current.visibility == Visibility::Public;
        let updated = Snippet {
            title: patch.title.unwrap_or(current.title),
            content: patch.content.unwrap_or(current.content),
            language: patch.language.unwrap_or(current.language),
            visibility: patch.visibility.unwrap_or(current.visibility),
            expires_at: patch.expires_at.unwrap_or(current.expires_at),
            updated_at: now,
            ..current
        };
        self.store.update_snippet(&updated).await?;
        self.cache.invalidate_for_write(
            requester,
            was_public,
            updated.visibility == Visibility::Public,
        );

        tracing::info!(snippet_id = %id, "snippet updated");
        self.fetch(id).await
    }

    /// Deletes a snippet together with its access logs.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SnippetNotFound`] if the snippet is not
    /// retrievable or [`ServiceError::Forbidden`] if `requester` is not
    /// the owner.
    pub async fn delete(&self, id: SnippetId, requester: UserId) -> Result<(), ServiceError> {
        let current = self.writable(id, requester).await?;
        self.store.delete_snippet(id).await?;
        self.cache.invalidate_for_write(
            requester,
            current.visibility == Visibility::Public,
            false,
        );
        tracing::info!(snippet_id = %id, "snippet deleted");
        Ok(())
    }

    /// Lists snippets visible to `query.viewer`.
    ///
    /// # Errors
    ///
    /// Returns a store error on cache miss failures.
    pub async fn list(
        &self,
        query: &SnippetQuery,
        page: PageRequest,
    ) -> Result<Arc<RecordPage>, ServiceError> {
        self.listing(ListingScope::List, query, page).await
    }

    /// Searches snippets visible to `query.viewer`.
    ///
    /// # Errors
    ///
    /// Returns a store error on cache miss failures.
    pub async fn search(
        &self,
        query: &SnippetQuery,
        page: PageRequest,
    ) -> Result<Arc<RecordPage>, ServiceError> {
        self.listing(ListingScope::Search, query, page).await
    }

    /// Returns view totals for a snippet.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SnippetNotFound`] if the snippet is not
    /// retrievable and [`ServiceError::Forbidden`] if `viewer` is neither
    /// the owner nor looking at a public snippet.
    pub async fn analytics(
        &self,
        id: SnippetId,
        viewer: Option<UserId>,
    ) -> Result<SnippetAnalytics, ServiceError> {
        let record = self.retrievable(id, viewer).await?;
        if !can_view_analytics(viewer, &record.snippet) {
            return Err(ServiceError::Forbidden(
                "You do not have permission to access this resource.".to_string(),
            ));
        }

        let now = Utc::now();
        let total_views = self.store.count_access(id).await?;
        let counts = self
            .store
            .daily_access_counts(id, histogram_window_start(now))
            .await?;

        Ok(SnippetAnalytics {
            snippet_id: id,
            total_views,
            daily_views: daily_histogram(now.date_naive(), &counts),
        })
    }

    async fn listing(
        &self,
        scope: ListingScope,
        query: &SnippetQuery,
        page: PageRequest,
    ) -> Result<Arc<RecordPage>, ServiceError> {
        let key = self.cache.key(scope, query, page);
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit);
        }
        let fresh = Arc::new(self.store.list_snippets(query, page, Utc::now()).await?);
        self.cache.insert(key, Arc::clone(&fresh)).await;
        Ok(fresh)
    }

    async fn fetch(&self, id: SnippetId) -> Result<SnippetRecord, ServiceError> {
        self.store
            .get_snippet(id)
            .await?
            .ok_or(ServiceError::SnippetNotFound(id))
    }

    async fn retrievable(
        &self,
        id: SnippetId,
        viewer: Option<UserId>,
    ) -> Result<SnippetRecord, ServiceError> {
        let record = self.fetch(id).await?;
        if record.snippet.is_retrievable_by(viewer, Utc::now()) {
            Ok(record)
        } else {
            Err(ServiceError::SnippetNotFound(id))
        }
    }

    async fn writable(&self, id: SnippetId, requester: UserId) -> Result<Snippet, ServiceError> {
        let record = self.retrievable(id, Some(requester)).await?;
        if !has_object_permission(AccessKind::Write, Some(requester), &record.snippet) {
            return Err(ServiceError::Forbidden(
                "only the owner may modify this snippet".to_string(),
            ));
        }
        Ok(record.snippet)
    }
}

/// Rejects an expiry that is not strictly after `now`.
///
/// # Errors
///
/// Returns [`ServiceError::Validation`] on the `expires_at` field.
pub fn validate_expiry(
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    match expires_at {
        Some(at) if at <= now => Err(ServiceError::field("expires_at", EXPIRY_IN_PAST)),
        _ => Ok(()),
    }
}
