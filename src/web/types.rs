// src/web/types.rs
use rocket::http::ContentType;
use rocket::response::{self, Responder};
use rocket::serde::{Deserialize, Serialize};
use rocket::{Request, Response};
use std::sync::Arc;

use crate::audit::{RequestLogStore, RequestLogView};
use crate::auth::AuthConfig;
use crate::core::{ConfigManager, Database, Mailer, PdfRenderer, TranslationService};
use crate::types::FieldErrors;

pub const CV_PAGE_SIZE: u32 = 10;
pub const LOG_PAGE_SIZE: i64 = 50;

/// Shared services, managed by Rocket next to `Database` and `AuthConfig`
pub struct AppState {
    pub config: ConfigManager,
    pub database: Database,
    pub auth: AuthConfig,
    pub log_store: Arc<dyn RequestLogStore>,
    pub renderer: Arc<dyn PdfRenderer>,
    pub mailer: Arc<dyn Mailer>,
    pub translation: Arc<TranslationService>,
    /// Names of the fairings `build_rocket` attached
    pub fairings: Vec<String>,
}

impl AppState {
    pub fn api_prefix(&self) -> &str {
        &self.config.audit.api_prefix
    }
}

pub struct PdfResponse {
    pub data: Vec<u8>,
    pub filename: Option<String>,
}

impl PdfResponse {
    pub fn with_filename(data: Vec<u8>, filename: String) -> Self {
        Self {
            data,
            filename: Some(filename),
        }
    }
}

impl<'r> Responder<'r, 'static> for PdfResponse {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let mut binding = Response::build();
        let mut response = binding
            .header(ContentType::PDF)
            .sized_body(self.data.len(), std::io::Cursor::new(self.data));

        if let Some(filename) = self.filename {
            response = response.raw_header(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", filename),
            );
        }

        response.ok()
    }
}

// ===== Request Payloads =====

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct EmailRequest {
    pub recipient_email: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct TranslateRequest {
    pub target_language: String,
}

// ===== Response Data =====

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TokenData {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
}

/// One page of a list endpoint
#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(base_url: &str, page: u32, page_size: u32, count: i64, results: Vec<T>) -> Self {
        let shown = i64::from(page) * i64::from(page_size);
        Self {
            count,
            next: (shown < count).then(|| format!("{}?page={}", base_url, page + 1)),
            previous: (page > 1).then(|| format!("{}?page={}", base_url, page - 1)),
            results,
        }
    }
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TaskAccepted {
    pub task_id: String,
    pub status_url: String,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct LanguageInfo {
    pub key: &'static str,
    pub name: &'static str,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct LogPage {
    pub count: i64,
    pub page: i64,
    pub page_size: i64,
    pub results: Vec<RequestLogView>,
}

// ===== Standard Envelopes =====

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TextResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub data: T,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ActionResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub action: String,
    pub data: T,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<FieldErrors>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    Data,
    Action,
    Error,
}

impl TextResponse {
    pub fn success(message: String) -> Self {
        Self {
            response_type: ResponseType::Text,
            success: true,
            message,
        }
    }
}

impl<T> DataResponse<T> {
    pub fn success(message: String, data: T) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message,
            data,
        }
    }
}

impl<T> ActionResponse<T> {
    pub fn success(message: String, action: String, data: T) -> Self {
        Self {
            response_type: ResponseType::Action,
            success: true,
            message,
            action,
            data,
        }
    }
}

impl StandardErrorResponse {
    pub fn new(error: String, error_code: String, suggestions: Vec<String>) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
            field_errors: None,
        }
    }

    pub fn with_field_errors(mut self, field_errors: FieldErrors) -> Self {
        self.field_errors = Some(field_errors);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginated_links() {
        let first = Paginated::new("/api/v1/cvs", 1, 10, 25, vec![1, 2]);
        assert_eq!(first.next.as_deref(), Some("/api/v1/cvs?page=2"));
        assert_eq!(first.previous, None);

        let last = Paginated::new("/api/v1/cvs", 3, 10, 25, vec![1]);
        assert_eq!(last.next, None);
        assert_eq!(last.previous.as_deref(), Some("/api/v1/cvs?page=2"));

        let empty: Paginated<i32> = Paginated::new("/api/v1/cvs", 1, 10, 0, Vec::new());
        assert_eq!(empty.next, None);
        assert_eq!(empty.previous, None);
    }

    #[test]
    fn test_error_body_shape() {
        let mut errors = FieldErrors::new();
        errors.insert("email".to_string(), vec!["Invalid email format".to_string()]);
        let body = StandardErrorResponse::new(
            "Validation failed".to_string(),
            "VALIDATION_ERROR".to_string(),
            Vec::new(),
        )
        .with_field_errors(errors);

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["success"], false);
        assert_eq!(json["field_errors"]["email"][0], "Invalid email format");
    }
}
