//! End-to-end tests of the REST API against the in-memory store.
//!
//! Each test builds a fresh router and drives it with
//! `tower::ServiceExt::oneshot`, so no socket is opened.

#![allow(clippy::panic, clippy::indexing_slicing)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use chrono::{DateTime, NaiveDate, Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

use snippet_service::app_state::AppState;
use snippet_service::build_app;
use snippet_service::config::ServiceConfig;
use snippet_service::domain::{
    AccessLog, PageRequest, RecordPage, Snippet, SnippetId, SnippetQuery, SnippetRecord, User,
    UserId,
};
use snippet_service::error::ServiceError;
use snippet_service::persistence::{MemoryStore, SnippetStore};

/// Memory store whose access-log writes always fail.
#[derive(Debug, Default)]
struct BrokenLogStore {
    inner: MemoryStore,
}

#[async_trait]
impl SnippetStore for BrokenLogStore {
    async fn create_user(&self, user: &User) -> Result<(), ServiceError> {
        self.inner.create_user(user).await
    }
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ServiceError> {
        self.inner.find_user_by_username(username).await
    }
    async fn find_user(&self, id: UserId) -> Result<Option<User>, ServiceError> {
        self.inner.find_user(id).await
    }
    async fn insert_snippet(&self, snippet: &Snippet) -> Result<(), ServiceError> {
        self.inner.insert_snippet(snippet).await
    }
    async fn get_snippet(&self, id: SnippetId) -> Result<Option<SnippetRecord>, ServiceError> {
        self.inner.get_snippet(id).await
    }
    async fn update_snippet(&self, snippet: &Snippet) -> Result<(), ServiceError> {
        self.inner.update_snippet(snippet).await
    }
    async fn delete_snippet(&self, id: SnippetId) -> Result<(), ServiceError> {
        self.inner.delete_snippet(id).await
    }
    async fn list_snippets(
        &self,
        query: &SnippetQuery,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<RecordPage, ServiceError> {
        self.inner.list_snippets(query, page, now).await
    }
    async fn record_access(&self, _log: &AccessLog) -> Result<(), ServiceError> {
        Err(ServiceError::PersistenceError("access_logs unavailable".to_string()))
    }
    async fn count_access(&self, id: SnippetId) -> Result<u64, ServiceError> {
        self.inner.count_access(id).await
    }
    async fn daily_access_counts(
        &self,
        id: SnippetId,
        since: DateTime<Utc>,
    ) -> Result<Vec<(NaiveDate, u64)>, ServiceError> {
        self.inner.daily_access_counts(id, since).await
    }
    async fn ping(&self) -> Result<(), ServiceError> {
        self.inner.ping().await
    }
}

fn app() -> Router {
    app_with(Arc::new(MemoryStore::new()))
}

fn app_with(store: Arc<dyn SnippetStore>) -> Router {
    build_app(AppState::new(&ServiceConfig::default(), store))
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    };
    let Ok(request) = request else {
        panic!("request should build");
    };
    let Ok(response) = app.clone().oneshot(request).await else {
        panic!("router is infallible");
    };
    let status = response.status();
    let headers = response.headers().clone();
    let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
        panic!("body should be readable");
    };
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Reply {
        status,
        headers,
        body,
    }
}

async fn get(app: &Router, uri: &str, token: Option<&str>) -> Reply {
    send(app, Method::GET, uri, token, None).await
}

/// Registers `username` and returns a bearer token for it.
async fn login(app: &Router, username: &str) -> String {
    let creds = json!({"username": username, "password": "s3cret-pass"});
    let reply = send(app, Method::POST, "/api/v1/auth/register", None, Some(creds.clone())).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let reply = send(app, Method::POST, "/api/v1/auth/token", None, Some(creds)).await;
    assert_eq!(reply.status, StatusCode::OK);
    let Some(token) = reply.body["access_token"].as_str() else {
        panic!("token missing: {}", reply.body);
    };
    token.to_string()
}

/// Creates a snippet and returns its id.
async fn create(app: &Router, token: &str, body: Value) -> String {
    let reply = send(app, Method::POST, "/api/v1/snippets", Some(token), Some(body)).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    let Some(id) = reply.body["id"].as_str() else {
        panic!("id missing: {}", reply.body);
    };
    id.to_string()
}

fn titles(reply: &Reply) -> Vec<String> {
    reply.body["data"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i["title"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn register_returns_confirmation_message() {
    let app = app();
    let body = json!({"username": "alice", "email": "a@example.com", "password": "s3cret-pass"});
    let reply = send(&app, Method::POST, "/api/v1/auth/register", None, Some(body.clone())).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["message"], "User registered successfully");

    let reply = send(&app, Method::POST, "/api/v1/auth/register", None, Some(body)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["error"]["fields"]["username"].is_array());
}

#[tokio::test]
async fn register_accepts_blank_email_but_not_malformed() {
    let app = app();
    let body = json!({"username": "alice", "email": "", "password": "s3cret-pass"});
    let reply = send(&app, Method::POST, "/api/v1/auth/register", None, Some(body)).await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let body = json!({"username": "bob", "email": "not-an-email", "password": "s3cret-pass"});
    let reply = send(&app, Method::POST, "/api/v1/auth/register", None, Some(body)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["error"]["fields"]["email"].is_array());
}

#[tokio::test]
async fn create_requires_authentication() {
    let app = app();
    let body = json!({"title": "t", "content": "c"});
    let reply = send(&app, Method::POST, "/api/v1/snippets", None, Some(body)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_token_is_rejected_even_on_reads() {
    let app = app();
    let reply = get(&app, "/api/v1/snippets", Some("not-a-token")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_returns_full_representation() {
    let app = app();
    let token = login(&app, "alice").await;
    let body = json!({"title": "hello", "content": "print('hi')", "language": "python"});
    let reply = send(&app, Method::POST, "/api/v1/snippets", Some(&token), Some(body)).await;

    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["user"], "alice");
    assert_eq!(reply.body["language"], "python");
    assert_eq!(reply.body["visibility"], "public");
    assert_eq!(reply.body["is_expired"], false);
    assert!(reply.body["expires_at"].is_null());
}

#[tokio::test]
async fn create_rejects_past_expiry_and_bad_fields() {
    let app = app();
    let token = login(&app, "alice").await;

    let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
    let body = json!({"title": "t", "content": "c", "expires_at": past});
    let reply = send(&app, Method::POST, "/api/v1/snippets", Some(&token), Some(body)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["error"]["fields"]["expires_at"].is_array());

    let body = json!({"title": "", "content": "c"});
    let reply = send(&app, Method::POST, "/api/v1/snippets", Some(&token), Some(body)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["error"]["fields"]["title"].is_array());

    let body = json!({"title": "t", "content": "c", "language": "cobol"});
    let reply = send(&app, Method::POST, "/api/v1/snippets", Some(&token), Some(body)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = get(&app, "/api/v1/snippets", None).await;
    assert_eq!(reply.body["pagination"]["total"], 0);
}

#[tokio::test]
async fn anonymous_detail_view_is_logged() {
    let app = app();
    let token = login(&app, "alice").await;
    let id = create(&app, &token, json!({"title": "t", "content": "c"})).await;

    let reply = get(&app, &format!("/api/v1/snippets/{id}"), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["content"], "c");
    assert!(reply.headers.get("x-access-log").is_none());

    let reply = get(&app, &format!("/api/v1/snippets/{id}/analytics"), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["total_views"], 1);
}

#[tokio::test]
async fn private_and_unlisted_snippets_are_hidden_from_others() {
    let app = app();
    let alice = login(&app, "alice").await;
    let bob = login(&app, "bob").await;
    let private = create(&app, &alice, json!({"title": "p", "content": "c", "visibility": "private"})).await;
    let unlisted = create(&app, &alice, json!({"title": "u", "content": "c", "visibility": "unlisted"})).await;

    for id in [&private, &unlisted] {
        let uri = format!("/api/v1/snippets/{id}");
        assert_eq!(get(&app, &uri, None).await.status, StatusCode::NOT_FOUND);
        assert_eq!(get(&app, &uri, Some(&bob)).await.status, StatusCode::NOT_FOUND);
        assert_eq!(get(&app, &uri, Some(&alice)).await.status, StatusCode::OK);
    }

    let unknown = format!("/api/v1/snippets/{}", uuid::Uuid::new_v4());
    assert_eq!(get(&app, &unknown, None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_shows_public_plus_own() {
    let app = app();
    let alice = login(&app, "alice").await;
    let bob = login(&app, "bob").await;
    create(&app, &alice, json!({"title": "a-public", "content": "c"})).await;
    create(&app, &alice, json!({"title": "a-private", "content": "c", "visibility": "private"})).await;
    create(&app, &bob, json!({"title": "b-unlisted", "content": "c", "visibility": "unlisted"})).await;

    let ordered = "/api/v1/snippets?ordering=title";
    assert_eq!(titles(&get(&app, ordered, None).await), vec!["a-public"]);
    assert_eq!(
        titles(&get(&app, ordered, Some(&alice)).await),
        vec!["a-private", "a-public"]
    );
    assert_eq!(
        titles(&get(&app, ordered, Some(&bob)).await),
        vec!["a-public", "b-unlisted"]
    );
}

#[tokio::test]
async fn non_owner_cannot_update_or_delete() {
    let app = app();
    let alice = login(&app, "alice").await;
    let bob = login(&app, "bob").await;
    let id = create(&app, &alice, json!({"title": "original", "content": "c"})).await;
    let uri = format!("/api/v1/snippets/{id}");

    let body = json!({"title": "hijacked", "content": "x"});
    let reply = send(&app, Method::PUT, &uri, Some(&bob), Some(body)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    let reply = send(&app, Method::PATCH, &uri, Some(&bob), Some(json!({"title": "x"}))).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    let reply = send(&app, Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    let reply = send(&app, Method::DELETE, &uri, None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = get(&app, &uri, None).await;
    assert_eq!(reply.body["title"], "original");
}

#[tokio::test]
async fn owner_can_replace_patch_and_delete() {
    let app = app();
    let alice = login(&app, "alice").await;
    let id = create(&app, &alice, json!({"title": "v1", "content": "c", "language": "css"})).await;
    let uri = format!("/api/v1/snippets/{id}");

    let body = json!({"title": "v2", "content": "new"});
    let reply = send(&app, Method::PUT, &uri, Some(&alice), Some(body)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["title"], "v2");
    assert_eq!(reply.body["language"], "plaintext");

    let reply = send(&app, Method::PATCH, &uri, Some(&alice), Some(json!({"visibility": "private"}))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["title"], "v2");
    assert_eq!(reply.body["visibility"], "private");

    let reply = send(&app, Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert_eq!(get(&app, &uri, Some(&alice)).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn previews_truncate_long_content() {
    let app = app();
    let token = login(&app, "alice").await;
    let long = "é".repeat(150);
    create(&app, &token, json!({"title": "long", "content": long})).await;
    create(&app, &token, json!({"title": "short", "content": "x".repeat(100)})).await;

    let reply = get(&app, "/api/v1/snippets?ordering=title", None).await;
    let data = &reply.body["data"];
    assert_eq!(data[0]["preview"], format!("{}...", "é".repeat(100)));
    assert_eq!(data[1]["preview"], "x".repeat(100));
    assert!(data[0].get("content").is_none());
}

#[tokio::test]
async fn search_matches_text_and_filters() {
    let app = app();
    let token = login(&app, "alice").await;
    create(&app, &token, json!({"title": "Quick Sort", "content": "def qs(): pass", "language": "python"})).await;
    create(&app, &token, json!({"title": "Flexbox", "content": ".row { display: flex }", "language": "css"})).await;

    let reply = get(&app, "/api/v1/snippets/search?q=SORT", None).await;
    assert_eq!(titles(&reply), vec!["Quick Sort"]);

    let reply = get(&app, "/api/v1/snippets/search?q=display&language=css", None).await;
    assert_eq!(titles(&reply), vec!["Flexbox"]);

    let reply = get(&app, "/api/v1/snippets/search?q=display&language=python", None).await;
    assert!(titles(&reply).is_empty());

    let reply = get(&app, "/api/v1/snippets/search?ordering=popularity", None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ordering_by_views() {
    let app = app();
    let token = login(&app, "alice").await;
    let popular = create(&app, &token, json!({"title": "popular", "content": "c"})).await;
    create(&app, &token, json!({"title": "quiet", "content": "c"})).await;

    // prime the cache before the views happen
    let before = get(&app, "/api/v1/snippets?ordering=-views", None).await;
    assert_eq!(before.body["data"][0]["access_count"], 0);

    for _ in 0..2 {
        get(&app, &format!("/api/v1/snippets/{popular}"), None).await;
    }
    let reply = get(&app, "/api/v1/snippets?ordering=-views", None).await;
    assert_eq!(titles(&reply), vec!["popular", "quiet"]);
    assert_eq!(reply.body["data"][0]["access_count"], 2);
}

#[tokio::test]
async fn cached_listing_refreshes_after_public_write() {
    let app = app();
    let token = login(&app, "alice").await;
    create(&app, &token, json!({"title": "first", "content": "c"})).await;
    assert_eq!(get(&app, "/api/v1/snippets", None).await.body["pagination"]["total"], 1);

    let id = create(&app, &token, json!({"title": "second", "content": "c"})).await;
    assert_eq!(get(&app, "/api/v1/snippets", None).await.body["pagination"]["total"], 2);

    let uri = format!("/api/v1/snippets/{id}");
    let reply = send(&app, Method::PATCH, &uri, Some(&token), Some(json!({"visibility": "private"}))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(get(&app, "/api/v1/snippets", None).await.body["pagination"]["total"], 1);
}

#[tokio::test]
async fn expired_snippets_leave_listings() {
    let app = app();
    let token = login(&app, "alice").await;
    let soon = (Utc::now() + Duration::milliseconds(300)).to_rfc3339();
    let id = create(&app, &token, json!({"title": "fleeting", "content": "c", "expires_at": soon})).await;
    create(&app, &token, json!({"title": "lasting", "content": "c"})).await;

    let listing = "/api/v1/snippets?ordering=title";
    let searching = "/api/v1/snippets/search?q=ING&ordering=-title";
    assert_eq!(titles(&get(&app, listing, None).await), vec!["fleeting", "lasting"]);
    assert_eq!(titles(&get(&app, searching, None).await), vec!["lasting", "fleeting"]);

    tokio::time::sleep(std::time::Duration::from_millis(400)).await;

    // same keys as above, nothing written in between
    let reply = get(&app, listing, None).await;
    assert_eq!(titles(&reply), vec!["lasting"]);
    assert_eq!(reply.body["pagination"]["total"], 1);
    assert_eq!(titles(&get(&app, searching, None).await), vec!["lasting"]);

    let uri = format!("/api/v1/snippets/{id}");
    assert_eq!(get(&app, &uri, None).await.status, StatusCode::NOT_FOUND);
    let reply = get(&app, &uri, Some(&token)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["is_expired"], true);
}

#[tokio::test]
async fn malformed_query_and_path_get_json_errors() {
    let app = app();
    for uri in [
        "/api/v1/snippets?page=abc",
        "/api/v1/snippets/search?per_page=-1",
        "/api/v1/snippets/not-a-uuid",
        "/api/v1/snippets/not-a-uuid/analytics",
    ] {
        let reply = get(&app, uri, None).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(
            reply.headers.get("content-type").and_then(|v| v.to_str().ok()),
            Some("application/json"),
            "{uri}"
        );
        assert_eq!(reply.body["error"]["code"], 1002, "{uri}");
        assert!(reply.body["error"]["message"].is_string(), "{uri}");
    }
}

#[tokio::test]
async fn analytics_has_seven_zero_filled_days() {
    let app = app();
    let token = login(&app, "alice").await;
    let id = create(&app, &token, json!({"title": "t", "content": "c"})).await;
    for _ in 0..3 {
        get(&app, &format!("/api/v1/snippets/{id}"), None).await;
    }

    let reply = get(&app, &format!("/api/v1/snippets/{id}/analytics"), Some(&token)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["total_views"], 3);
    let Some(days) = reply.body["daily_views"].as_array() else {
        panic!("daily_views missing");
    };
    assert_eq!(days.len(), 7);
    assert_eq!(days[6]["date"], Utc::now().date_naive().to_string());
    assert_eq!(days[6]["views"], 3);
    assert!(days[..6].iter().all(|d| d["views"] == 0));
}

#[tokio::test]
async fn analytics_of_hidden_snippet_is_not_found() {
    let app = app();
    let alice = login(&app, "alice").await;
    let bob = login(&app, "bob").await;
    let id = create(&app, &alice, json!({"title": "p", "content": "c", "visibility": "private"})).await;
    let uri = format!("/api/v1/snippets/{id}/analytics");
    assert_eq!(get(&app, &uri, Some(&bob)).await.status, StatusCode::NOT_FOUND);
    assert_eq!(get(&app, &uri, Some(&alice)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn failed_access_log_is_surfaced_not_fatal() {
    let app = app_with(Arc::new(BrokenLogStore::default()));
    let token = login(&app, "alice").await;
    let id = create(&app, &token, json!({"title": "t", "content": "c"})).await;

    let reply = get(&app, &format!("/api/v1/snippets/{id}"), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.headers.get("x-access-log").and_then(|v| v.to_str().ok()),
        Some("failed")
    );

    let health = get(&app, "/health", None).await;
    assert_eq!(health.body["access_log_failures"], 1);
}

#[tokio::test]
async fn pagination_is_clamped() {
    let app = app();
    let token = login(&app, "alice").await;
    for i in 0..3 {
        create(&app, &token, json!({"title": format!("s{i}"), "content": "c"})).await;
    }
    let reply = get(&app, "/api/v1/snippets?per_page=2&page=2", None).await;
    assert_eq!(reply.body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(reply.body["pagination"]["total_pages"], 2);

    let reply = get(&app, "/api/v1/snippets?per_page=1000&page=0", None).await;
    assert_eq!(reply.body["pagination"]["per_page"], 100);
    assert_eq!(reply.body["pagination"]["page"], 1);
}

#[tokio::test]
async fn system_endpoints() {
    let app = app();
    let reply = get(&app, "/health", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "healthy");

    let reply = get(&app, "/config/languages", None).await;
    assert_eq!(reply.body.as_array().map(Vec::len), Some(13));
}
