// src/audit/report.rs
use serde::Serialize;

use super::models::RequestLogEntry;
use super::store::{LogFilter, RequestLogStore, StoreError};

pub const DEFAULT_RECENT_LIMIT: i64 = 10;

/// The most recent entries and the total number of recorded requests
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestReport {
    pub entries: Vec<RequestLogEntry>,
    pub total: i64,
}

pub async fn get_recent(store: &dyn RequestLogStore, n: i64) -> Result<RequestReport, StoreError> {
    let filter = LogFilter::default();
    let entries = store.query(&filter, n.max(0), 0).await?;
    let total = store.count(&filter).await?;

    Ok(RequestReport { entries, total })
}
