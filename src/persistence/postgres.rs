//! PostgreSQL implementation of the persistence layer.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{SnippetRow, UserRow, record_from_row, user_from_row};
use super::{DUPLICATE_USERNAME, SnippetStore};
use crate::config::ServiceConfig;
use crate::domain::{
    AccessLog, PageRequest, RecordPage, Snippet, SnippetId, SnippetQuery, SnippetRecord, SortKey,
    User, UserId, Visibility,
};
use crate::error::ServiceError;

/// Columns selected by every snippet read, matching [`SnippetRow`].
const SNIPPET_COLUMNS: &str = "s.id, s.user_id, s.title, s.content, s.language, s.visibility, \
     s.expires_at, s.created_at, s.updated_at, u.username, \
     COALESCE(a.views, 0) AS access_count";

/// Joins shared by snippet reads.
const SNIPPET_JOINS: &str = " FROM snippets s \
     JOIN users u ON u.id = s.user_id \
     LEFT JOIN (SELECT snippet_id, COUNT(*) AS views FROM access_logs GROUP BY snippet_id) a \
     ON a.snippet_id = s.id";

fn db_error(e: sqlx::Error) -> ServiceError {
    ServiceError::PersistenceError(e.to_string())
}

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool from configuration and applies pending
    /// migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError::PersistenceError`] if the database is
    /// unreachable or a migration fails.
    pub async fn connect(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(db_error)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| ServiceError::PersistenceError(e.to_string()))?;

        tracing::info!("database migrations applied");
        Ok(Self::new(pool))
    }
}

/// Appends the `WHERE` clause for `query` to `qb`.
///
/// Case folding and title comparison use the `"C"` collation, which folds
/// ASCII only and orders by code point, the same rules
/// [`SnippetQuery::matches`] and [`crate::domain::SortOrder::compare`]
/// apply in memory.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &SnippetQuery, now: DateTime<Utc>) {
    qb.push(" WHERE (s.expires_at IS NULL OR s.expires_at > ")
        .push_bind(now)
        .push(") AND (s.visibility = ")
        .push_bind(Visibility::Public.as_str());
    if let Some(viewer) = query.viewer {
        qb.push(" OR s.user_id = ").push_bind(*viewer.as_uuid());
    }
    qb.push(")");

    if let Some(language) = query.language {
        qb.push(" AND s.language = ").push_bind(language.as_str());
    }
    if let Some(visibility) = query.visibility {
        qb.push(" AND s.visibility = ").push_bind(visibility.as_str());
    }
    if let Some(text) = &query.text {
        qb.push(" AND (strpos(lower(s.title COLLATE \"C\"), ")
            .push_bind(text.clone())
            .push(") > 0 OR strpos(lower(s.content COLLATE \"C\"), ")
            .push_bind(text.clone())
            .push(") > 0 OR strpos(s.language, ")
            .push_bind(text.clone())
            .push(") > 0)");
    }
}

/// Appends `ORDER BY`, `LIMIT` and `OFFSET` for `query` and `page`.
fn push_order(qb: &mut QueryBuilder<'_, Postgres>, query: &SnippetQuery, page: PageRequest) {
    let column = match query.ordering.key {
        SortKey::CreatedAt => "s.created_at",
        SortKey::Title => "s.title COLLATE \"C\"",
        SortKey::AccessCount => "access_count",
    };
    let direction = if query.ordering.descending {
        "DESC"
    } else {
        "ASC"
    };
    qb.push(format!(" ORDER BY {column} {direction}, s.id ASC LIMIT "))
        .push_bind(i64::from(page.per_page))
        .push(" OFFSET ")
        .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
}

#[async_trait]
impl SnippetStore for PostgresStore {
    async fn create_user(&self, user: &User) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(*user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ServiceError::field("username", DUPLICATE_USERNAME)
            }
            other => db_error(other),
        })?;
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ServiceError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(user_from_row))
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, ServiceError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(user_from_row))
    }

    async fn insert_snippet(&self, snippet: &Snippet) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO snippets \
             (id, user_id, title, content, language, visibility, expires_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(*snippet.id.as_uuid())
        .bind(*snippet.owner_id.as_uuid())
        .bind(&snippet.title)
        .bind(&snippet.content)
        .bind(snippet.language.as_str())
        .bind(snippet.visibility.as_str())
        .bind(snippet.expires_at)
        .bind(snippet.created_at)
        .bind(snippet.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn get_snippet(&self, id: SnippetId) -> Result<Option<SnippetRecord>, ServiceError> {
        let sql = format!("SELECT {SNIPPET_COLUMNS}{SNIPPET_JOINS} WHERE s.id = $1");
        let row = sqlx::query_as::<_, SnippetRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(record_from_row).transpose()
    }

    async fn update_snippet(&self, snippet: &Snippet) -> Result<(), ServiceError> {
        let result = sqlx::query(
            "UPDATE snippets SET title = $2, content = $3, language = $4, visibility = $5, \
             expires_at = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(*snippet.id.as_uuid())
        .bind(&snippet.title)
        .bind(&snippet.content)
        .bind(snippet.language.as_str())
        .bind(snippet.visibility.as_str())
        .bind(snippet.expires_at)
        .bind(snippet.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::SnippetNotFound(snippet.id));
        }
        Ok(())
    }

    async fn delete_snippet(&self, id: SnippetId) -> Result<(), ServiceError> {
        // access_logs rows go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM snippets WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::SnippetNotFound(id));
        }
        Ok(())
    }

    async fn list_snippets(
        &self,
        query: &SnippetQuery,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<RecordPage, ServiceError> {
        // MIN skips NULLs and the filter already dropped expired rows
        let mut count_qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*), MIN(s.expires_at) FROM snippets s");
        push_filters(&mut count_qb, query, now);
        let (total, next_expiry) = count_qb
            .build_query_as::<(i64, Option<DateTime<Utc>>)>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {SNIPPET_COLUMNS}{SNIPPET_JOINS}"));
        push_filters(&mut qb, query, now);
        push_order(&mut qb, query, page);

        let rows = qb
            .build_query_as::<SnippetRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let records = rows
            .into_iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RecordPage {
            records,
            total: u64::try_from(total).unwrap_or(0),
            next_expiry,
        })
    }

    async fn record_access(&self, log: &AccessLog) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO access_logs (id, snippet_id, ip_address, user_agent, accessed_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(log.id)
        .bind(*log.snippet_id.as_uuid())
        .bind(log.ip_address.to_string())
        .bind(&log.user_agent)
        .bind(log.accessed_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn count_access(&self, id: SnippetId) -> Result<u64, ServiceError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM access_logs WHERE snippet_id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn daily_access_counts(
        &self,
        id: SnippetId,
        since: DateTime<Utc>,
    ) -> Result<Vec<(NaiveDate, u64)>, ServiceError> {
        let rows = sqlx::query_as::<_, (NaiveDate, i64)>(
            "SELECT (accessed_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) \
             FROM access_logs WHERE snippet_id = $1 AND accessed_at >= $2 \
             GROUP BY day ORDER BY day",
        )
        .bind(Uuid::from(id))
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|(day, count)| (day, u64::try_from(count).unwrap_or(0)))
            .collect())
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SortOrder;

    fn page() -> PageRequest {
        PageRequest {
            page: 2,
            per_page: 10,
        }
    }

    fn filtered_sql(query: &SnippetQuery) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM snippets s");
        push_filters(&mut qb, query, Utc::now());
        qb.sql().to_string()
    }

    #[test]
    fn anonymous_filter_keeps_live_public_rows() {
        let sql = filtered_sql(&SnippetQuery::for_viewer(None));
        assert!(sql.contains("WHERE (s.expires_at IS NULL OR s.expires_at > $1)"));
        assert!(sql.contains("AND (s.visibility = $2)"));
        assert!(!sql.contains("s.user_id"));
    }

    #[test]
    fn viewer_filter_adds_own_rows() {
        let sql = filtered_sql(&SnippetQuery::for_viewer(Some(UserId::new())));
        assert!(sql.contains("AND (s.visibility = $2 OR s.user_id = $3)"));
    }

    #[test]
    fn text_and_exact_filters_bind_in_order() {
        let mut query = SnippetQuery::for_viewer(None).with_text(Some("Sort"));
        query.language = Some(crate::domain::Language::Python);
        query.visibility = Some(Visibility::Public);
        let sql = filtered_sql(&query);
        assert!(sql.contains("AND s.language = $3 AND s.visibility = $4"));
        assert!(sql.contains("strpos(lower(s.title COLLATE \"C\"), $5) > 0"));
        assert!(sql.contains("strpos(lower(s.content COLLATE \"C\"), $6) > 0"));
        assert!(sql.contains("strpos(s.language, $7) > 0"));
    }

    #[test]
    fn order_uses_code_point_titles_and_id_tie_break() {
        let mut query = SnippetQuery::for_viewer(None);
        query.ordering = SortOrder::new(SortKey::Title, false);
        let mut qb = QueryBuilder::<Postgres>::new("SELECT s.id FROM snippets s");
        push_order(&mut qb, &query, page());
        assert_eq!(
            qb.sql(),
            "SELECT s.id FROM snippets s ORDER BY s.title COLLATE \"C\" ASC, s.id ASC LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn default_order_is_newest_first() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT s.id FROM snippets s");
        push_order(&mut qb, &SnippetQuery::for_viewer(None), page());
        assert!(qb.sql().contains("ORDER BY s.created_at DESC, s.id ASC"));
    }
}
