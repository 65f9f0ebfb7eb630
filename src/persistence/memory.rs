//! In-memory [`SnippetStore`] used when persistence is disabled.
//!
//! All state lives behind one [`tokio::sync::RwLock`], so reads run
//! concurrently and writes are serialized. Access logs are keyed by
//! snippet, which makes snippet deletion cascade for free.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use super::{DUPLICATE_USERNAME, SnippetStore};
use crate::domain::{
    AccessLog, PageRequest, RecordPage, Snippet, SnippetId, SnippetQuery, SnippetRecord, User,
    UserId,
};
use crate::error::ServiceError;

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    snippets: HashMap<SnippetId, Snippet>,
    access_logs: HashMap<SnippetId, Vec<AccessLog>>,
}

impl MemoryState {
    fn record(&self, snippet: &Snippet) -> SnippetRecord {
        let owner_username = self
            .users
            .get(&snippet.owner_id)
            .map(|u| u.username.clone())
            .unwrap_or_default();
        let access_count = self
            .access_logs
            .get(&snippet.id)
            .map_or(0, |logs| logs.len() as u64);
        SnippetRecord {
            snippet: snippet.clone(),
            owner_username,
            access_count,
        }
    }
}

/// Process-local store for users, snippets and access logs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored snippets.
    pub async fn snippet_count(&self) -> usize {
        self.state.read().await.snippets.len()
    }
}

#[async_trait]
impl SnippetStore for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<(), ServiceError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(ServiceError::field("username", DUPLICATE_USERNAME));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ServiceError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, ServiceError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn insert_snippet(&self, snippet: &Snippet) -> Result<(), ServiceError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&snippet.owner_id) {
            return Err(ServiceError::PersistenceError(format!(
                "owner {} does not exist",
                snippet.owner_id
            )));
        }
        if state.snippets.contains_key(&snippet.id) {
            return Err(ServiceError::PersistenceError(format!(
                "snippet {} already exists",
                snippet.id
            )));
        }
        state.snippets.insert(snippet.id, snippet.clone());
        Ok(())
    }

    async fn get_snippet(&self, id: SnippetId) -> Result<Option<SnippetRecord>, ServiceError> {
        let state = self.state.read().await;
        Ok(state.snippets.get(&id).map(|s| state.record(s)))
    }

    async fn update_snippet(&self, snippet: &Snippet) -> Result<(), ServiceError> {
        let mut state = self.state.write().await;
        let stored = state
            .snippets
            .get_mut(&snippet.id)
            .ok_or(ServiceError::SnippetNotFound(snippet.id))?;
        *stored = snippet.clone();
        Ok(())
    }

    async fn delete_snippet(&self, id: SnippetId) -> Result<(), ServiceError> {
        let mut state = self.state.write().await;
        state
            .snippets
            .remove(&id)
            .ok_or(ServiceError::SnippetNotFound(id))?;
        state.access_logs.remove(&id);
        Ok(())
    }

    async fn list_snippets(
        &self,
        query: &SnippetQuery,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<RecordPage, ServiceError> {
        let state = self.state.read().await;
        let mut records: Vec<SnippetRecord> = state
            .snippets
            .values()
            .map(|s| state.record(s))
            .filter(|r| query.matches(r, now))
            .collect();
        records.sort_by(|a, b| query.ordering.compare(a, b));

        let total = records.len() as u64;
        let next_expiry = records.iter().filter_map(|r| r.snippet.expires_at).min();
        let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let records = records
            .into_iter()
            .skip(skip)
            .take(page.per_page as usize)
            .collect();
        Ok(RecordPage {
            records,
            total,
            next_expiry,
        })
    }

    async fn record_access(&self, log: &AccessLog) -> Result<(), ServiceError> {
        let mut state = self.state.write().await;
        if !state.snippets.contains_key(&log.snippet_id) {
            return Err(ServiceError::PersistenceError(format!(
                "snippet {} does not exist",
                log.snippet_id
            )));
        }
        state
            .access_logs
            .entry(log.snippet_id)
            .or_default()
            .push(log.clone());
        Ok(())
    }

    async fn count_access(&self, id: SnippetId) -> Result<u64, ServiceError> {
        let state = self.state.read().await;
        Ok(state.access_logs.get(&id).map_or(0, |logs| logs.len() as u64))
    }

    async fn daily_access_counts(
        &self,
        id: SnippetId,
        since: DateTime<Utc>,
    ) -> Result<Vec<(NaiveDate, u64)>, ServiceError> {
        let state = self.state.read().await;
        let mut per_day: HashMap<NaiveDate, u64> = HashMap::new();
        for log in state.access_logs.get(&id).into_iter().flatten() {
            if log.accessed_at >= since {
                *per_day.entry(log.accessed_at.date_naive()).or_default() += 1;
            }
        }
        let mut counts: Vec<(NaiveDate, u64)> = per_day.into_iter().collect();
        counts.sort_unstable();
        Ok(counts)
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use chrono::Duration;

    use super::*;
    use crate::domain::{Language, SortKey, SortOrder, Visibility};

    fn user(name: &str) -> User {
        User {
            id: UserId::new(),
            username: name.to_string(),
            email: None,
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
        }
    }

    fn snippet(owner: UserId, title: &str, visibility: Visibility) -> Snippet {
        let now = Utc::now();
        Snippet {
            id: SnippetId::new(),
            owner_id: owner,
            title: title.to_string(),
            content: "body".to_string(),
            language: Language::Python,
            visibility,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn page() -> PageRequest {
        PageRequest {
            page: 1,
            per_page: 20,
        }
    }

    async fn store_with_user(name: &str) -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let u = user(name);
        if store.create_user(&u).await.is_err() {
            panic!("user creation failed");
        }
        (store, u)
    }

    #[tokio::test]
    async fn duplicate_username_is_a_validation_error() {
        let (store, _) = store_with_user("alice").await;
        let result = store.create_user(&user("alice")).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn get_returns_owner_username_and_views() {
        let (store, alice) = store_with_user("alice").await;
        let s = snippet(alice.id, "one", Visibility::Public);
        let _ = store.insert_snippet(&s).await;
        let log = AccessLog::new(s.id, IpAddr::V4(Ipv4Addr::LOCALHOST), String::new());
        let _ = store.record_access(&log).await;

        let Ok(Some(record)) = store.get_snippet(s.id).await else {
            panic!("snippet should exist");
        };
        assert_eq!(record.owner_username, "alice");
        assert_eq!(record.access_count, 1);
    }

    #[tokio::test]
    async fn insert_requires_existing_owner() {
        let store = MemoryStore::new();
        let result = store
            .insert_snippet(&snippet(UserId::new(), "orphan", Visibility::Public))
            .await;
        assert!(result.is_err());
        assert_eq!(store.snippet_count().await, 0);
    }

    #[tokio::test]
    async fn delete_cascades_to_access_logs() {
        let (store, alice) = store_with_user("alice").await;
        let s = snippet(alice.id, "one", Visibility::Public);
        let _ = store.insert_snippet(&s).await;
        let log = AccessLog::new(s.id, IpAddr::V4(Ipv4Addr::LOCALHOST), String::new());
        let _ = store.record_access(&log).await;

        assert!(store.delete_snippet(s.id).await.is_ok());
        assert_eq!(store.count_access(s.id).await.ok(), Some(0));
        assert!(matches!(
            store.delete_snippet(s.id).await,
            Err(ServiceError::SnippetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_missing_snippet_is_not_found() {
        let (store, alice) = store_with_user("alice").await;
        let result = store
            .update_snippet(&snippet(alice.id, "ghost", Visibility::Public))
            .await;
        assert!(matches!(result, Err(ServiceError::SnippetNotFound(_))));
    }

    #[tokio::test]
    async fn list_applies_visibility_ordering_and_paging() {
        let (store, alice) = store_with_user("alice").await;
        let _ = store
            .insert_snippet(&snippet(alice.id, "b", Visibility::Public))
            .await;
        let _ = store
            .insert_snippet(&snippet(alice.id, "a", Visibility::Public))
            .await;
        let _ = store
            .insert_snippet(&snippet(alice.id, "c", Visibility::Private))
            .await;

        let mut query = SnippetQuery::for_viewer(None);
        query.ordering = SortOrder::new(SortKey::Title, false);
        let Ok(anon) = store.list_snippets(&query, page(), Utc::now()).await else {
            panic!("list failed");
        };
        assert_eq!(anon.total, 2);
        let titles: Vec<&str> = anon.records.iter().map(|r| r.snippet.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);

        query.viewer = Some(alice.id);
        let second_page = PageRequest {
            page: 2,
            per_page: 2,
        };
        let Ok(own) = store.list_snippets(&query, second_page, Utc::now()).await else {
            panic!("list failed");
        };
        assert_eq!(own.total, 3);
        assert_eq!(own.records.len(), 1);
        assert_eq!(own.records.first().map(|r| r.snippet.title.as_str()), Some("c"));
    }

    #[tokio::test]
    async fn next_expiry_covers_matches_beyond_the_page() {
        let (store, alice) = store_with_user("alice").await;
        let soon = Utc::now() + Duration::minutes(1);
        let mut first = snippet(alice.id, "a", Visibility::Public);
        first.expires_at = Some(soon + Duration::minutes(5));
        let mut second = snippet(alice.id, "b", Visibility::Public);
        second.expires_at = Some(soon);
        let _ = store.insert_snippet(&first).await;
        let _ = store.insert_snippet(&second).await;

        let mut query = SnippetQuery::for_viewer(None);
        query.ordering = SortOrder::new(SortKey::Title, false);
        let first_page = PageRequest {
            page: 1,
            per_page: 1,
        };
        let Ok(listed) = store.list_snippets(&query, first_page, Utc::now()).await else {
            panic!("list failed");
        };
        assert_eq!(listed.records.len(), 1);
        assert_eq!(listed.next_expiry, Some(soon));
    }

    #[tokio::test]
    async fn daily_counts_skip_rows_before_window() {
        let (store, alice) = store_with_user("alice").await;
        let s = snippet(alice.id, "one", Visibility::Public);
        let _ = store.insert_snippet(&s).await;

        let now = Utc::now();
        let mut old = AccessLog::new(s.id, IpAddr::V4(Ipv4Addr::LOCALHOST), String::new());
        old.accessed_at = now - Duration::days(30);
        let _ = store.record_access(&old).await;
        let fresh = AccessLog::new(s.id, IpAddr::V4(Ipv4Addr::LOCALHOST), String::new());
        let _ = store.record_access(&fresh).await;

        let Ok(counts) = store
            .daily_access_counts(s.id, now - Duration::days(6))
            .await
        else {
            panic!("count failed");
        };
        assert_eq!(counts, vec![(fresh.accessed_at.date_naive(), 1)]);
        assert_eq!(store.count_access(s.id).await.ok(), Some(2));
    }
}
