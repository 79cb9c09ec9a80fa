// src/web/errors.rs
use rocket::http::Status;
use rocket::response::{self, status, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use thiserror::Error;

use crate::app_log;
use crate::audit::StoreError;
use crate::auth::AuthError;
use crate::core::CvStoreError;
use crate::types::FieldErrors;
use crate::web::types::StandardErrorResponse;

/// Failure of an API route, rendered as the standard error body
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: FieldErrors,
    },
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field_errors: FieldErrors) -> Self {
        ApiError::Validation {
            message: "Validation failed".to_string(),
            field_errors,
        }
    }

    pub fn field(field: &str, message: &str) -> Self {
        let mut field_errors = FieldErrors::new();
        field_errors.insert(field.to_string(), vec![message.to_string()]);
        Self::validation(field_errors)
    }

    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        app_log!(error, "{}: {}", context, err);
        ApiError::Internal(context.to_string())
    }

    pub fn status(&self) -> Status {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::Unauthorized(_) => Status::Unauthorized,
            ApiError::Forbidden(_) => Status::Forbidden,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Unavailable(_) => Status::ServiceUnavailable,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "AUTHENTICATION_ERROR",
            ApiError::Forbidden(_) => "AUTHORIZATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn suggestions(&self) -> Vec<String> {
        let suggestions: &[&str] = match self {
            ApiError::Validation { .. } => &["Check the field errors and resubmit"],
            ApiError::BadRequest(_) => &["Check your request JSON format"],
            ApiError::Unauthorized(_) => &["Obtain a token from /api/v1/auth/token"],
            ApiError::Forbidden(_) => &["Ask an administrator for staff access"],
            ApiError::NotFound(_) => &["Check the identifier in the URL"],
            ApiError::Unavailable(_) | ApiError::Internal(_) => &[
                "Try again in a few moments",
                "Contact support if the problem persists",
            ],
        };
        suggestions.iter().map(|s| s.to_string()).collect()
    }

    pub fn body(&self) -> StandardErrorResponse {
        let body = StandardErrorResponse::new(
            self.to_string(),
            self.error_code().to_string(),
            self.suggestions(),
        );
        match self {
            ApiError::Validation { field_errors, .. } => body.with_field_errors(field_errors.clone()),
            _ => body,
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        status::Custom(self.status(), Json(self.body())).respond_to(req)
    }
}

impl From<CvStoreError> for ApiError {
    fn from(err: CvStoreError) -> Self {
        match err {
            CvStoreError::NotFound(id) => ApiError::NotFound(format!("CV with ID {} not found", id)),
            CvStoreError::DuplicateEmail(_) => {
                ApiError::field("email", "cv with this email already exists.")
            }
            CvStoreError::Database(e) => ApiError::internal("Database error occurred", e),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        app_log!(error, "Request log store failed: {}", err);
        ApiError::Unavailable("Request log is unavailable".to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotAuthorized => ApiError::Forbidden(err.to_string()),
            AuthError::DatabaseError => ApiError::Internal(err.to_string()),
            _ => ApiError::Unauthorized(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::field("email", "x").status(), Status::BadRequest);
        assert_eq!(ApiError::NotFound("x".into()).status(), Status::NotFound);
        assert_eq!(
            ApiError::Unavailable("x".into()).status(),
            Status::ServiceUnavailable
        );
        assert_eq!(
            ApiError::from(AuthError::NotAuthorized).status(),
            Status::Forbidden
        );
        assert_eq!(
            ApiError::from(AuthError::MissingToken).status(),
            Status::Unauthorized
        );
        assert_eq!(
            ApiError::from(AuthError::DatabaseError).status(),
            Status::InternalServerError
        );
    }

    #[test]
    fn test_cv_store_errors() {
        let not_found = ApiError::from(CvStoreError::NotFound(5));
        assert_eq!(not_found.to_string(), "CV with ID 5 not found");

        let duplicate = ApiError::from(CvStoreError::DuplicateEmail("a@b.c".into()));
        let body = duplicate.body();
        assert_eq!(body.error_code, "VALIDATION_ERROR");
        assert_eq!(
            body.field_errors.unwrap()["email"],
            vec!["cv with this email already exists.".to_string()]
        );
    }
}
