// src/audit/models.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::utils::truncate_chars;

pub const MAX_METHOD_LEN: usize = 10;
pub const MAX_PATH_LEN: usize = 500;
pub const MAX_USER_AGENT_LEN: usize = 1000;
pub const MAX_CONTENT_TYPE_LEN: usize = 100;

/// A request/response exchange ready to be appended. The store assigns the
/// id and the timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewRequestLogEntry {
    pub method: String,
    pub path: String,
    pub query_string: String,
    pub remote_ip: Option<String>,
    pub user_agent: String,
    pub user_id: Option<i64>,
    pub status_code: Option<i32>,
    pub response_time_ms: Option<f64>,
    pub content_type: String,
    pub content_length: Option<i64>,
}

impl NewRequestLogEntry {
    /// Cap the free-form columns to their maximum stored length
    pub fn bounded(mut self) -> Self {
        self.method = truncate_chars(&self.method, MAX_METHOD_LEN);
        self.path = truncate_chars(&self.path, MAX_PATH_LEN);
        self.user_agent = truncate_chars(&self.user_agent, MAX_USER_AGENT_LEN);
        self.content_type = truncate_chars(&self.content_type, MAX_CONTENT_TYPE_LEN);
        self
    }
}

/// A persisted request log row. Rows are never updated.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct RequestLogEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub query_string: String,
    pub remote_ip: Option<String>,
    pub user_agent: String,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub status_code: Option<i32>,
    pub response_time_ms: Option<f64>,
    pub content_type: String,
    pub content_length: Option<i64>,
}

impl RequestLogEntry {
    pub fn is_api_request(&self, api_prefix: &str) -> bool {
        self.path.starts_with(api_prefix)
    }

    /// 2xx status; a missing status is never successful
    pub fn is_successful(&self) -> bool {
        matches!(self.status_code, Some(code) if (200..300).contains(&code))
    }
}

impl fmt::Display for RequestLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} - {}",
            self.method,
            self.path,
            self.timestamp.format("%Y-%m-%d %H:%M:%S")
        )?;
        if let Some(username) = &self.username {
            write!(f, " ({})", username)?;
        }
        Ok(())
    }
}

/// Serialized form with the derived flags resolved
#[derive(Debug, Clone, Serialize)]
pub struct RequestLogView {
    #[serde(flatten)]
    pub entry: RequestLogEntry,
    pub is_api_request: bool,
    pub is_successful: bool,
}

impl RequestLogView {
    pub fn new(entry: RequestLogEntry, api_prefix: &str) -> Self {
        Self {
            is_api_request: entry.is_api_request(api_prefix),
            is_successful: entry.is_successful(),
            entry,
        }
    }
}
