// src/web/handlers/system_handlers.rs
use rocket::serde::json::Json;
use rocket::State;

use crate::app_log;
use crate::auth::OptionalAuth;
use crate::web::errors::ApiError;
use crate::web::types::*;

pub async fn health_handler(
    auth: OptionalAuth,
    state: &State<AppState>,
) -> Result<Json<TextResponse>, ApiError> {
    match &auth.user {
        Some(user) => app_log!(debug, "Health check by {}", user.username),
        None => app_log!(debug, "Health check by anonymous user"),
    }

    state.database.health_check().await.map_err(|e| {
        app_log!(error, "Health check failed: {}", e);
        ApiError::Unavailable("Database is unreachable".to_string())
    })?;

    Ok(Json(TextResponse::success("OK".to_string())))
}
