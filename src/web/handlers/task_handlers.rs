// src/web/handlers/task_handlers.rs
use rocket::serde::json::Json;
use rocket::State;
use uuid::Uuid;

use crate::core::{TaskQueue, TaskRecord, TranslationService};
use crate::web::errors::ApiError;
use crate::web::types::*;

pub async fn task_status_handler(
    id: &str,
    tasks: &State<TaskQueue>,
) -> Result<Json<DataResponse<TaskRecord>>, ApiError> {
    let not_found = || ApiError::NotFound(format!("Task {} not found", id));

    let task_id = Uuid::parse_str(id).map_err(|_| not_found())?;
    let record = tasks.status(task_id).await.ok_or_else(not_found)?;

    Ok(Json(DataResponse::success(
        format!("Task {}", task_id),
        record,
    )))
}

pub async fn languages_handler() -> Json<DataResponse<Vec<LanguageInfo>>> {
    let languages = TranslationService::supported_languages()
        .iter()
        .map(|&(key, name)| LanguageInfo { key, name })
        .collect();

    Json(DataResponse::success(
        "Supported translation languages".to_string(),
        languages,
    ))
}
