// src/audit/store.rs
//! Append-only request log storage

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use thiserror::Error;

use super::models::{NewRequestLogEntry, RequestLogEntry};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request log database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("request log store unavailable: {0}")]
    Unavailable(String),
}

/// Conditions for reading the log. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilter {
    pub method: Option<String>,
    pub status_code: Option<i32>,
    /// Inclusive lower bound
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound
    pub until: Option<DateTime<Utc>>,
    pub path_prefix: Option<String>,
    pub user_id: Option<i64>,
    /// Case-insensitive substring over path, remote IP, user agent and username
    pub search: Option<String>,
}

/// Storage behind the request logger and the reporting views.
///
/// `append` must be safe to call concurrently; each call is one atomic insert.
/// Reads are ordered newest first, ties broken by insertion order.
#[rocket::async_trait]
pub trait RequestLogStore: Send + Sync {
    async fn append(&self, entry: NewRequestLogEntry) -> Result<i64, StoreError>;

    async fn query(
        &self,
        filter: &LogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RequestLogEntry>, StoreError>;

    async fn count(&self, filter: &LogFilter) -> Result<i64, StoreError>;
}

const SELECT_ENTRIES: &str = r#"
    SELECT l.id, l.timestamp, l.method, l.path, l.query_string, l.remote_ip, l.user_agent,
           l.user_id, u.username AS username, l.status_code, l.response_time_ms,
           l.content_type, l.content_length
    FROM request_logs l
    LEFT JOIN users u ON u.id = l.user_id
    WHERE 1 = 1"#;

const COUNT_ENTRIES: &str = r#"
    SELECT COUNT(*)
    FROM request_logs l
    LEFT JOIN users u ON u.id = l.user_id
    WHERE 1 = 1"#;

#[derive(Debug, Clone)]
pub struct SqliteRequestLogStore {
    pool: SqlitePool,
}

impl SqliteRequestLogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &LogFilter) {
        if let Some(method) = &filter.method {
            qb.push(" AND l.method = ").push_bind(method.to_uppercase());
        }
        if let Some(status) = filter.status_code {
            qb.push(" AND l.status_code = ").push_bind(status);
        }
        if let Some(since) = filter.since {
            qb.push(" AND l.timestamp >= ").push_bind(since);
        }
        if let Some(until) = filter.until {
            qb.push(" AND l.timestamp < ").push_bind(until);
        }
        if let Some(prefix) = &filter.path_prefix {
            qb.push(" AND substr(l.path, 1, ")
                .push_bind(prefix.chars().count() as i64)
                .push(") = ")
                .push_bind(prefix.clone());
        }
        if let Some(user_id) = filter.user_id {
            qb.push(" AND l.user_id = ").push_bind(user_id);
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let columns = [
                "l.path",
                "COALESCE(l.remote_ip, '')",
                "l.user_agent",
                "COALESCE(u.username, '')",
            ];
            qb.push(" AND (");
            for (idx, column) in columns.iter().enumerate() {
                if idx > 0 {
                    qb.push(" OR ");
                }
                qb.push(format!("instr(lower({}), lower(", column))
                    .push_bind(term.to_string())
                    .push(")) > 0");
            }
            qb.push(")");
        }
    }
}

#[rocket::async_trait]
impl RequestLogStore for SqliteRequestLogStore {
    async fn append(&self, entry: NewRequestLogEntry) -> Result<i64, StoreError> {
        let entry = entry.bounded();
        let result = sqlx::query(
            r#"
            INSERT INTO request_logs (timestamp, method, path, query_string, remote_ip,
                                      user_agent, user_id, status_code, response_time_ms,
                                      content_type, content_length)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Utc::now())
        .bind(&entry.method)
        .bind(&entry.path)
        .bind(&entry.query_string)
        .bind(&entry.remote_ip)
        .bind(&entry.user_agent)
        .bind(entry.user_id)
        .bind(entry.status_code)
        .bind(entry.response_time_ms)
        .bind(&entry.content_type)
        .bind(entry.content_length)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn query(
        &self,
        filter: &LogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RequestLogEntry>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_ENTRIES);
        Self::push_filter(&mut qb, filter);
        qb.push(" ORDER BY l.timestamp DESC, l.id DESC LIMIT ")
            .push_bind(limit.max(0))
            .push(" OFFSET ")
            .push_bind(offset.max(0));

        let entries = qb
            .build_query_as::<RequestLogEntry>()
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    async fn count(&self, filter: &LogFilter) -> Result<i64, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(COUNT_ENTRIES);
        Self::push_filter(&mut qb, filter);

        let total = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total)
    }
}
