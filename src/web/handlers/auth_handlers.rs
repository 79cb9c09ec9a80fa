// src/web/handlers/auth_handlers.rs
use rocket::serde::json::Json;
use rocket::State;

use crate::app_log;
use crate::auth::{AuthenticatedUser, Principal};
use crate::core::UserRepository;
use crate::web::errors::ApiError;
use crate::web::types::*;

pub async fn token_handler(
    request: Json<TokenRequest>,
    state: &State<AppState>,
) -> Result<Json<DataResponse<TokenData>>, ApiError> {
    let user = UserRepository::new(state.database.pool())
        .verify_credentials(&request.username, &request.password)
        .await
        .map_err(|e| ApiError::internal("Failed to verify credentials", e))?;

    let user = match user {
        Some(user) if user.is_active => user,
        _ => {
            app_log!(warn, "Rejected token request for {}", request.username);
            return Err(ApiError::Unauthorized(
                "Invalid username or password".to_string(),
            ));
        }
    };

    let access_token = state.auth.issue_token(&Principal::from(&user))?;
    app_log!(info, "Issued token for {}", user.username);

    Ok(Json(DataResponse::success(
        format!("Token issued for {}", user.username),
        TokenData {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: state.auth.ttl_seconds(),
        },
    )))
}

pub async fn current_user_handler(auth: AuthenticatedUser) -> Json<DataResponse<UserInfo>> {
    let principal = auth.principal();

    Json(DataResponse::success(
        format!("Authenticated as {}", principal.username),
        UserInfo {
            id: principal.id,
            username: principal.username.clone(),
            is_staff: principal.is_staff,
        },
    ))
}
