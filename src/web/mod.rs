// src/web/mod.rs

pub mod errors;
pub mod handlers;
pub mod types;
pub mod views;

pub use errors::ApiError;
pub use handlers::*;
pub use types::*;
pub use views::Views;

use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::response::content::RawHtml;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{
    catchers, delete, get, options, patch, post, put, routes, Build, Request, Response, Rocket,
    State,
};
use std::sync::Arc;

use crate::app_log;
use crate::audit::{RequestLogger, SqliteRequestLogStore};
use crate::auth::{AuthConfig, AuthenticatedUser, OptionalAuth, StaffUser};
use crate::core::{
    ConfigManager, Database, OpenAiTranslator, OutboxMailer, TaskContext, TaskQueue, TaskRecord,
    TranslationService, TypstRenderer,
};
use crate::types::{Cv, CvInput, CvPatch};

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, PUT, PATCH, DELETE, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

// ===== CV API =====

#[get("/cvs?<page>")]
pub async fn list_cvs(
    page: Option<u32>,
    state: &State<AppState>,
) -> Result<Json<DataResponse<Paginated<Cv>>>, ApiError> {
    handlers::list_cvs_handler(page, state).await
}

#[post("/cvs", data = "<input>")]
pub async fn create_cv(
    input: Json<CvInput>,
    state: &State<AppState>,
) -> Result<status::Created<Json<DataResponse<Cv>>>, ApiError> {
    handlers::create_cv_handler(input, state).await
}

#[get("/cvs/<id>")]
pub async fn get_cv(id: i64, state: &State<AppState>) -> Result<Json<DataResponse<Cv>>, ApiError> {
    handlers::get_cv_handler(id, state).await
}

#[put("/cvs/<id>", data = "<input>")]
pub async fn update_cv(
    id: i64,
    input: Json<CvInput>,
    state: &State<AppState>,
) -> Result<Json<DataResponse<Cv>>, ApiError> {
    handlers::update_cv_handler(id, input, state).await
}

#[patch("/cvs/<id>", data = "<patch>")]
pub async fn patch_cv(
    id: i64,
    patch: Json<CvPatch>,
    state: &State<AppState>,
) -> Result<Json<DataResponse<Cv>>, ApiError> {
    handlers::patch_cv_handler(id, patch, state).await
}

#[delete("/cvs/<id>")]
pub async fn delete_cv(id: i64, state: &State<AppState>) -> Result<status::NoContent, ApiError> {
    handlers::delete_cv_handler(id, state).await
}

#[get("/cvs/<id>/pdf")]
pub async fn cv_pdf(id: i64, state: &State<AppState>) -> Result<PdfResponse, ApiError> {
    handlers::cv_pdf_handler(id, state).await
}

#[post("/cvs/<id>/email", data = "<request>")]
pub async fn email_cv(
    id: i64,
    request: Json<EmailRequest>,
    state: &State<AppState>,
    tasks: &State<TaskQueue>,
) -> Result<status::Accepted<Json<ActionResponse<TaskAccepted>>>, ApiError> {
    handlers::email_cv_handler(id, request, state, tasks).await
}

#[post("/cvs/<id>/translate", data = "<request>")]
pub async fn translate_cv(
    id: i64,
    request: Json<TranslateRequest>,
    state: &State<AppState>,
    tasks: &State<TaskQueue>,
) -> Result<status::Accepted<Json<ActionResponse<TaskAccepted>>>, ApiError> {
    handlers::translate_cv_handler(id, request, state, tasks).await
}

#[get("/tasks/<id>")]
pub async fn task_status(
    id: &str,
    tasks: &State<TaskQueue>,
) -> Result<Json<DataResponse<TaskRecord>>, ApiError> {
    handlers::task_status_handler(id, tasks).await
}

#[get("/translation/languages")]
pub async fn languages() -> Json<DataResponse<Vec<LanguageInfo>>> {
    handlers::languages_handler().await
}

// ===== Auth & audit API =====

#[post("/auth/token", data = "<request>")]
pub async fn issue_token(
    request: Json<TokenRequest>,
    state: &State<AppState>,
) -> Result<Json<DataResponse<TokenData>>, ApiError> {
    handlers::token_handler(request, state).await
}

#[get("/me")]
pub async fn get_current_user(auth: AuthenticatedUser) -> Json<DataResponse<UserInfo>> {
    handlers::current_user_handler(auth).await
}

#[get("/logs?<query..>")]
pub async fn list_logs(
    query: LogQuery,
    staff: StaffUser,
    state: &State<AppState>,
) -> Result<Json<DataResponse<LogPage>>, ApiError> {
    handlers::list_logs_handler(query, staff, state).await
}

#[get("/health")]
pub async fn health(
    auth: OptionalAuth,
    state: &State<AppState>,
) -> Result<Json<TextResponse>, ApiError> {
    handlers::health_handler(auth, state).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// ===== Pages =====

#[get("/?<page>")]
pub async fn index(
    page: Option<u32>,
    state: &State<AppState>,
    views: &State<Views>,
) -> Result<RawHtml<String>, PageError> {
    handlers::cv_list_page(page, state, views).await
}

#[get("/cv/<id>")]
pub async fn cv_detail(
    id: i64,
    state: &State<AppState>,
    views: &State<Views>,
) -> Result<RawHtml<String>, PageError> {
    handlers::cv_detail_page(id, state, views).await
}

#[get("/cv/<id>/pdf")]
pub async fn cv_download(id: i64, state: &State<AppState>) -> Result<PdfResponse, PageError> {
    handlers::cv_pdf_page(id, state).await
}

#[get("/settings")]
pub async fn settings(
    routes: RouteTable,
    state: &State<AppState>,
    views: &State<Views>,
) -> Result<RawHtml<String>, PageError> {
    handlers::settings_page(routes, state, views).await
}

#[get("/settings/detailed")]
pub async fn settings_detailed(
    routes: RouteTable,
    state: &State<AppState>,
    views: &State<Views>,
) -> Result<RawHtml<String>, PageError> {
    handlers::settings_detailed_page(routes, state, views).await
}

#[get("/logs")]
pub async fn request_logs(
    state: &State<AppState>,
    views: &State<Views>,
) -> Result<RawHtml<String>, PageError> {
    handlers::request_logs_page(state, views).await
}

// ===== Error catchers =====

fn api_error(status: Status) -> ApiError {
    match status.code {
        400 | 422 => ApiError::BadRequest("Invalid request format".to_string()),
        401 => ApiError::Unauthorized("Authentication required".to_string()),
        403 => ApiError::Forbidden("Staff access required".to_string()),
        404 => ApiError::NotFound("Resource not found".to_string()),
        503 => ApiError::Unavailable("Service unavailable".to_string()),
        _ => ApiError::Internal("Internal server error".to_string()),
    }
}

#[rocket::catch(default)]
pub fn api_catcher(status: Status, _req: &Request<'_>) -> status::Custom<Json<StandardErrorResponse>> {
    status::Custom(status, Json(api_error(status).body()))
}

#[rocket::catch(default)]
pub fn page_catcher(status: Status, req: &Request<'_>) -> PageError {
    handlers::error_page(status, req)
}

// ===== Assembly =====

/// Assemble the application around already-built services
pub fn build_rocket(mut state: AppState) -> Result<Rocket<Build>> {
    let views = Views::new()?;
    let tasks = TaskQueue::start(TaskContext {
        database: state.database.clone(),
        renderer: Arc::clone(&state.renderer),
        mailer: Arc::clone(&state.mailer),
        translation: Arc::clone(&state.translation),
        from_email: state.config.mail.default_from_email.clone(),
    });
    let logger = RequestLogger::new(Arc::clone(&state.log_store), state.config.audit.mode);
    state.fairings = vec![logger.name().to_string(), Cors.info().name.to_string()];

    let figment = rocket::Config::figment()
        .merge(("address", state.config.server.address.clone()))
        .merge(("port", state.config.server.port));

    Ok(rocket::custom(figment)
        .attach(logger)
        .attach(Cors)
        .manage(state.database.clone())
        .manage(state.auth.clone())
        .manage(tasks)
        .manage(views)
        .manage(state)
        .register("/api", catchers![api_catcher])
        .register("/", catchers![page_catcher])
        .mount(
            "/api/v1",
            routes![
                list_cvs,
                create_cv,
                get_cv,
                update_cv,
                patch_cv,
                delete_cv,
                cv_pdf,
                email_cv,
                translate_cv,
                task_status,
                languages,
                issue_token,
                get_current_user,
                list_logs,
            ],
        )
        .mount("/api", routes![health, options])
        .mount(
            "/",
            routes![
                index,
                cv_detail,
                cv_download,
                settings,
                settings_detailed,
                request_logs,
            ],
        ))
}

/// Open storage, wire the collaborators and serve until shutdown
pub async fn start_web_server(config: ConfigManager) -> Result<()> {
    config.ensure_directories().await?;

    let database = Database::new(&config.paths.database_path).await?;
    let auth = AuthConfig::from_settings(&config.auth);
    let log_store = Arc::new(SqliteRequestLogStore::new(database.pool().clone()));
    let renderer = Arc::new(TypstRenderer::new(config.paths.output_path.clone()));
    let mailer = Arc::new(OutboxMailer::new(config.paths.outbox_path.clone()));
    let translator = Arc::new(OpenAiTranslator::new(&config.translation)?);
    let translation = Arc::new(TranslationService::new(translator));

    app_log!(info, "Starting CV Desk on {}:{}", config.server.address, config.server.port);
    app_log!(info, "Database: {}", config.paths.database_path.display());
    app_log!(info, "Audit mode: {}", config.audit.mode);

    let state = AppState {
        config,
        database,
        auth,
        log_store,
        renderer,
        mailer,
        translation,
        fairings: Vec::new(),
    };

    let _rocket = build_rocket(state)?
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Web server failed: {}", e))?;

    Ok(())
}
