// src/web/handlers/audit_handlers.rs
use chrono::{DateTime, NaiveDate, Utc};
use rocket::serde::json::Json;
use rocket::State;

use crate::audit::{LogFilter, RequestLogView};
use crate::auth::StaffUser;
use crate::web::errors::ApiError;
use crate::web::types::*;

/// Raw query parameters of `GET /api/v1/logs`
#[derive(Debug, Default, rocket::FromForm)]
pub struct LogQuery {
    pub method: Option<String>,
    pub status: Option<i32>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub path: Option<String>,
    pub user: Option<i64>,
    pub search: Option<String>,
    pub page: Option<i64>,
}

/// RFC 3339 timestamp or a bare `YYYY-MM-DD` (midnight UTC)
fn parse_bound(field: &str, value: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            ApiError::field(field, "Enter a valid date or RFC 3339 timestamp.")
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl LogQuery {
    pub fn to_filter(&self) -> Result<LogFilter, ApiError> {
        let since = match non_empty(self.since.clone()) {
            Some(value) => Some(parse_bound("since", &value)?),
            None => None,
        };
        let until = match non_empty(self.until.clone()) {
            Some(value) => Some(parse_bound("until", &value)?),
            None => None,
        };

        Ok(LogFilter {
            method: non_empty(self.method.clone()),
            status_code: self.status,
            since,
            until,
            path_prefix: non_empty(self.path.clone()),
            user_id: self.user,
            search: non_empty(self.search.clone()),
        })
    }
}

/// Row offset of a 1-based page; `None` when the page cannot exist
fn page_offset(page: i64) -> Option<i64> {
    if page < 1 {
        return None;
    }
    (page - 1).checked_mul(LOG_PAGE_SIZE)
}

pub async fn list_logs_handler(
    query: LogQuery,
    _staff: StaffUser,
    state: &State<AppState>,
) -> Result<Json<DataResponse<LogPage>>, ApiError> {
    let page = query.page.unwrap_or(1);
    let offset = page_offset(page).ok_or_else(|| ApiError::NotFound("Invalid page.".to_string()))?;
    let filter = query.to_filter()?;

    let store = state.log_store.as_ref();
    let entries = store.query(&filter, LOG_PAGE_SIZE, offset).await?;
    let count = store.count(&filter).await?;

    let api_prefix = state.api_prefix();
    let results = entries
        .into_iter()
        .map(|entry| RequestLogView::new(entry, api_prefix))
        .collect();

    Ok(Json(DataResponse::success(
        format!("{} requests match", count),
        LogPage {
            count,
            page,
            page_size: LOG_PAGE_SIZE,
            results,
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1), Some(0));
        assert_eq!(page_offset(3), Some(2 * LOG_PAGE_SIZE));
        assert_eq!(page_offset(0), None);
        assert_eq!(page_offset(-4), None);
        assert_eq!(page_offset(i64::MAX), None);
    }

    #[test]
    fn test_query_to_filter() {
        let query = LogQuery {
            method: Some("get".to_string()),
            status: Some(404),
            since: Some("2024-03-01".to_string()),
            until: Some("2024-03-02T12:00:00+02:00".to_string()),
            search: Some("   ".to_string()),
            ..Default::default()
        };
        let filter = query.to_filter().unwrap();

        assert_eq!(filter.method.as_deref(), Some("get"));
        assert_eq!(filter.status_code, Some(404));
        assert_eq!(filter.since.unwrap().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(filter.until.unwrap().to_rfc3339(), "2024-03-02T10:00:00+00:00");
        assert_eq!(filter.search, None);
    }

    #[test]
    fn test_invalid_bound_is_a_field_error() {
        let query = LogQuery {
            since: Some("yesterday".to_string()),
            ..Default::default()
        };
        let err = query.to_filter().unwrap_err();
        assert_eq!(err.body().field_errors.unwrap()["since"].len(), 1);
    }
}
