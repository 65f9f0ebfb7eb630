//! Memoization of list and search pages.
//!
//! Entries are never flushed wholesale. Instead every key embeds the
//! generation counters of the data it could contain:
//!
//! - the public generation, since every listing shows public snippets;
//! - the caller's owner generation, for authenticated listings;
//! - the views generation, for listings ordered by access count.
//!
//! A write bumps only the generations it affects, which orphans exactly the
//! keys that could have included the written snippet. Orphaned entries are
//! never read again and age out through the TTL.
//!
//! Expiry is not a write, so it moves no generation. Instead each page
//! lives no longer than the earliest `expires_at` among the records its
//! query matched ([`RecordPage::next_expiry`]).

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use moka::Expiry;
use moka::future::Cache;

use crate::domain::{PageRequest, RecordPage, SnippetQuery, SortKey, UserId};

/// Which endpoint produced a cached page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingScope {
    /// `GET /snippets`.
    List,
    /// `GET /snippets/search`.
    Search,
}

impl ListingScope {
    const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Search => "search",
        }
    }
}

/// Per-entry lifetime: until the page's first matching snippet expires.
/// The builder's TTL still caps every entry.
#[derive(Debug, Clone, Copy)]
struct PageExpiry;

impl PageExpiry {
    fn remaining(page: &RecordPage) -> Option<Duration> {
        page.next_expiry
            .map(|at| (at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }
}

impl Expiry<String, Arc<RecordPage>> for PageExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        page: &Arc<RecordPage>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Self::remaining(page)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        page: &Arc<RecordPage>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Self::remaining(page)
    }
}

/// TTL cache of listing pages with generation-scoped invalidation.
#[derive(Debug, Clone)]
pub struct ListingCache {
    entries: Cache<String, Arc<RecordPage>>,
    public_generation: Arc<AtomicU64>,
    views_generation: Arc<AtomicU64>,
    owner_generations: Arc<DashMap<UserId, u64>>,
}

impl ListingCache {
    /// Creates a cache holding at most `max_capacity` pages for `ttl` each.
    #[must_use]
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .expire_after(PageExpiry)
            .build();
        Self {
            entries,
            public_generation: Arc::new(AtomicU64::new(0)),
            views_generation: Arc::new(AtomicU64::new(0)),
            owner_generations: Arc::new(DashMap::new()),
        }
    }

    /// Builds the cache key for a listing request under the current
    /// generations.
    #[must_use]
    pub fn key(&self, scope: ListingScope, query: &SnippetQuery, page: PageRequest) -> String {
        let mut key = format!(
            "{}:p{}",
            scope.as_str(),
            self.public_generation.load(Ordering::Acquire)
        );
        match query.viewer {
            Some(viewer) => {
                let owner = self.owner_generations.get(&viewer).map_or(0, |g| *g);
                let _ = write!(key, ":u{viewer}.{owner}");
            }
            None => key.push_str(":anon"),
        }
        if query.ordering.key == SortKey::AccessCount {
            let _ = write!(key, ":v{}", self.views_generation.load(Ordering::Acquire));
        }
        // free text goes last so it cannot collide with the fixed fields
        let _ = write!(
            key,
            ":lang={}:vis={}:o={}:page={}:per={}:q={}",
            query.language.map_or("", |l| l.as_str()),
            query.visibility.map_or("", |v| v.as_str()),
            query.ordering,
            page.page,
            page.per_page,
            query.text.as_deref().unwrap_or(""),
        );
        key
    }

    /// Returns the cached page for `key`, if still live and none of its
    /// matching snippets has expired since it was computed.
    pub async fn get(&self, key: &str) -> Option<Arc<RecordPage>> {
        let hit = self
            .entries
            .get(key)
            .await
            .filter(|page| page.is_current(Utc::now()));
        tracing::debug!(key, hit = hit.is_some(), "listing cache lookup");
        hit
    }

    /// Stores a page under `key`.
    pub async fn insert(&self, key: String, page: Arc<RecordPage>) {
        self.entries.insert(key, page).await;
    }

    /// Orphans every listing that could include a snippet of `owner` whose
    /// visibility was (`was_public`) or now is (`is_public`) public.
    pub fn invalidate_for_write(&self, owner: UserId, was_public: bool, is_public: bool) {
        *self.owner_generations.entry(owner).or_insert(0) += 1;
        if was_public || is_public {
            self.public_generation.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Orphans every listing ordered by access count.
    pub fn invalidate_views(&self) {
        self.views_generation.fetch_add(1, Ordering::AcqRel);
    }
}
