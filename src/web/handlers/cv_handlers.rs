// src/web/handlers/cv_handlers.rs
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;

use crate::app_log;
use crate::core::translation_client::language_name;
use crate::core::{pdf_filename, CvRepository, CvStoreError, TaskKind, TaskQueue};
use crate::types::cv_data::is_valid_email;
use crate::types::{Cv, CvInput, CvPatch};
use crate::web::errors::ApiError;
use crate::web::types::*;

const CVS_URL: &str = "/api/v1/cvs";

async fn load_cv(state: &AppState, id: i64) -> Result<Cv, ApiError> {
    let cv = CvRepository::new(state.database.pool())
        .get(id)
        .await?
        .ok_or(CvStoreError::NotFound(id))?;
    Ok(cv)
}

fn validated(input: CvInput) -> Result<CvInput, ApiError> {
    let input = input.normalized();
    input.validate().map_err(ApiError::validation)?;
    Ok(input)
}

pub async fn list_cvs_handler(
    page: Option<u32>,
    state: &State<AppState>,
) -> Result<Json<DataResponse<Paginated<Cv>>>, ApiError> {
    let page = page.unwrap_or(1);
    if page == 0 {
        return Err(ApiError::NotFound("Invalid page.".to_string()));
    }

    let (cvs, count) = CvRepository::new(state.database.pool())
        .list(page, CV_PAGE_SIZE)
        .await?;

    if page > 1 && cvs.is_empty() {
        return Err(ApiError::NotFound("Invalid page.".to_string()));
    }

    Ok(Json(DataResponse::success(
        format!("{} CVs found", count),
        Paginated::new(CVS_URL, page, CV_PAGE_SIZE, count, cvs),
    )))
}

pub async fn create_cv_handler(
    input: Json<CvInput>,
    state: &State<AppState>,
) -> Result<status::Created<Json<DataResponse<Cv>>>, ApiError> {
    let input = validated(input.into_inner())?;
    let cv = CvRepository::new(state.database.pool())
        .create(&input)
        .await?;

    app_log!(info, "Created CV {} ({})", cv.id, cv.full_name());

    Ok(status::Created::new(format!("{}/{}", CVS_URL, cv.id)).body(Json(
        DataResponse::success(format!("CV for {} created", cv.full_name()), cv),
    )))
}

pub async fn get_cv_handler(
    id: i64,
    state: &State<AppState>,
) -> Result<Json<DataResponse<Cv>>, ApiError> {
    let cv = load_cv(state, id).await?;
    Ok(Json(DataResponse::success(cv.to_string(), cv)))
}

pub async fn update_cv_handler(
    id: i64,
    input: Json<CvInput>,
    state: &State<AppState>,
) -> Result<Json<DataResponse<Cv>>, ApiError> {
    let input = validated(input.into_inner())?;
    let cv = CvRepository::new(state.database.pool())
        .update(id, &input)
        .await?;

    Ok(Json(DataResponse::success(
        format!("CV {} updated", id),
        cv,
    )))
}

pub async fn patch_cv_handler(
    id: i64,
    patch: Json<CvPatch>,
    state: &State<AppState>,
) -> Result<Json<DataResponse<Cv>>, ApiError> {
    let existing = load_cv(state, id).await?;
    let patch = patch.into_inner();
    let replaces_projects = patch.projects.is_some();

    let mut input = validated(patch.apply(CvInput::from(&existing)))?;
    // Stored projects stay untouched unless the patch names them
    if !replaces_projects {
        input.projects = None;
    }

    let cv = CvRepository::new(state.database.pool())
        .update(id, &input)
        .await?;

    Ok(Json(DataResponse::success(
        format!("CV {} updated", id),
        cv,
    )))
}

pub async fn delete_cv_handler(
    id: i64,
    state: &State<AppState>,
) -> Result<status::NoContent, ApiError> {
    let deleted = CvRepository::new(state.database.pool()).delete(id).await?;
    if deleted {
        Ok(status::NoContent)
    } else {
        Err(CvStoreError::NotFound(id).into())
    }
}

pub async fn cv_pdf_handler(id: i64, state: &State<AppState>) -> Result<PdfResponse, ApiError> {
    let cv = load_cv(state, id).await?;

    match state.renderer.render(&cv).await {
        Ok(pdf) => Ok(PdfResponse::with_filename(pdf, pdf_filename(&cv))),
        Err(e) => {
            app_log!(error, "PDF generation failed for CV {}: {}", id, e);
            Err(ApiError::Unavailable("PDF generation failed".to_string()))
        }
    }
}

fn accepted(task_id: uuid::Uuid, message: String) -> status::Accepted<Json<ActionResponse<TaskAccepted>>> {
    status::Accepted(Json(ActionResponse::success(
        message,
        "queued".to_string(),
        TaskAccepted {
            task_id: task_id.to_string(),
            status_url: format!("/api/v1/tasks/{}", task_id),
        },
    )))
}

pub async fn email_cv_handler(
    id: i64,
    request: Json<EmailRequest>,
    state: &State<AppState>,
    tasks: &State<TaskQueue>,
) -> Result<status::Accepted<Json<ActionResponse<TaskAccepted>>>, ApiError> {
    let recipient = request.recipient_email.trim().to_string();
    if recipient.is_empty() {
        return Err(ApiError::field("recipient_email", "This field may not be blank."));
    }
    if !is_valid_email(&recipient) {
        return Err(ApiError::field("recipient_email", "Enter a valid email address."));
    }

    let cv = load_cv(state, id).await?;
    let task_id = tasks
        .enqueue(TaskKind::SendCvPdf {
            cv_id: cv.id,
            recipient: recipient.clone(),
        })
        .await
        .map_err(|e| ApiError::internal("Failed to queue email", e))?;

    Ok(accepted(
        task_id,
        format!("CV for {} will be sent to {}", cv.full_name(), recipient),
    ))
}

pub async fn translate_cv_handler(
    id: i64,
    request: Json<TranslateRequest>,
    state: &State<AppState>,
    tasks: &State<TaskQueue>,
) -> Result<status::Accepted<Json<ActionResponse<TaskAccepted>>>, ApiError> {
    let Some(language) = language_name(&request.target_language) else {
        return Err(ApiError::field(
            "target_language",
            &format!("Language '{}' not supported", request.target_language),
        ));
    };

    let cv = load_cv(state, id).await?;
    let task_id = tasks
        .enqueue(TaskKind::TranslateCv {
            cv_id: cv.id,
            target_language: request.target_language.clone(),
        })
        .await
        .map_err(|e| ApiError::internal("Failed to queue translation", e))?;

    Ok(accepted(
        task_id,
        format!("Translation of CV {} to {} started", cv.id, language),
    ))
}
