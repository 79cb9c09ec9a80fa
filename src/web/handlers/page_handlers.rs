// src/web/handlers/page_handlers.rs
//! Server-rendered HTML pages

use minijinja::context;
use rocket::http::Status;
use rocket::response::content::RawHtml;
use rocket::response::{self, status, Responder};
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};

use crate::app_log;
use crate::audit::{get_recent, DEFAULT_RECENT_LIMIT};
use crate::core::{pdf_filename, CvRepository, SettingsSnapshot};
use crate::web::types::*;
use crate::web::views::Views;

/// Failure of an HTML route, rendered with the error template
#[derive(Debug)]
pub struct PageError {
    pub status: Status,
    pub message: String,
}

impl PageError {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Status::NotFound, message)
    }

    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        app_log!(error, "{}: {}", context, err);
        Self::new(Status::InternalServerError, context)
    }
}

impl<'r> Responder<'r, 'static> for PageError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let rendered = req.rocket().state::<Views>().and_then(|views| {
            views
                .render(
                    "error.html",
                    context! { code => self.status.code, message => &self.message },
                )
                .ok()
        });
        let html = rendered.unwrap_or_else(|| RawHtml(format!("<h1>{}</h1>", self.status.code)));
        status::Custom(self.status, html).respond_to(req)
    }
}

type Page = Result<RawHtml<String>, PageError>;

fn render(views: &Views, name: &str, ctx: minijinja::Value) -> Page {
    views
        .render(name, ctx)
        .map_err(|e| PageError::internal("Failed to render page", e))
}

pub async fn cv_list_page(page: Option<u32>, state: &State<AppState>, views: &State<Views>) -> Page {
    let page = page.unwrap_or(1);
    if page == 0 {
        return Err(PageError::not_found("Invalid page."));
    }

    let (cvs, count) = CvRepository::new(state.database.pool())
        .list(page, CV_PAGE_SIZE)
        .await
        .map_err(|e| PageError::internal("Failed to load CVs", e))?;

    let page_size = i64::from(CV_PAGE_SIZE);
    let num_pages = ((count + page_size - 1) / page_size).max(1);
    if i64::from(page) > num_pages {
        return Err(PageError::not_found("Invalid page."));
    }

    render(
        views,
        "cv_list.html",
        context! {
            cvs => cvs,
            page => page,
            num_pages => num_pages,
            has_next => i64::from(page) < num_pages,
            has_previous => page > 1,
        },
    )
}

pub async fn cv_detail_page(id: i64, state: &State<AppState>, views: &State<Views>) -> Page {
    let cv = CvRepository::new(state.database.pool())
        .get(id)
        .await
        .map_err(|e| PageError::internal("Failed to load CV", e))?
        .ok_or_else(|| PageError::not_found(format!("CV with ID {} not found", id)))?;

    let links: Vec<_> = cv
        .links()
        .into_iter()
        .map(|(label, url)| context! { label => label, url => url })
        .collect();

    render(
        views,
        "cv_detail.html",
        context! {
            full_name => cv.full_name(),
            links => links,
            cv => &cv,
        },
    )
}

pub async fn cv_pdf_page(id: i64, state: &State<AppState>) -> Result<PdfResponse, PageError> {
    let cv = CvRepository::new(state.database.pool())
        .get(id)
        .await
        .map_err(|e| PageError::internal("Failed to load CV", e))?
        .ok_or_else(|| PageError::not_found(format!("CV with ID {} not found", id)))?;

    let pdf = state.renderer.render(&cv).await.map_err(|e| {
        app_log!(error, "PDF generation failed for CV {}: {}", id, e);
        PageError::new(Status::ServiceUnavailable, "PDF generation failed")
    })?;

    Ok(PdfResponse::with_filename(pdf, pdf_filename(&cv)))
}

/// Every mounted route as `METHOD /uri`
pub struct RouteTable(pub Vec<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RouteTable {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let routes = req
            .rocket()
            .routes()
            .map(|route| format!("{} {}", route.method, route.uri))
            .collect();
        Outcome::Success(RouteTable(routes))
    }
}

fn snapshot(routes: RouteTable, state: &AppState) -> Result<SettingsSnapshot, PageError> {
    SettingsSnapshot::capture(&state.config, routes.0, state.fairings.clone())
        .map_err(|e| PageError::internal("Failed to read settings", e))
}

pub async fn settings_page(
    routes: RouteTable,
    state: &State<AppState>,
    views: &State<Views>,
) -> Page {
    let snapshot = snapshot(routes, state)?;

    render(
        views,
        "settings.html",
        context! {
            settings => &snapshot.safe,
            extra => &snapshot.all,
            detailed => false,
            debug => snapshot.debug,
        },
    )
}

pub async fn settings_detailed_page(
    routes: RouteTable,
    state: &State<AppState>,
    views: &State<Views>,
) -> Page {
    let snapshot = snapshot(routes, state)?;
    let notice = (!snapshot.debug)
        .then_some("Detailed settings are only available in debug mode.");

    render(
        views,
        "settings.html",
        context! {
            settings => snapshot.detailed(),
            detailed => true,
            notice => notice,
            debug => snapshot.debug,
        },
    )
}

pub async fn request_logs_page(state: &State<AppState>, views: &State<Views>) -> Page {
    let report = get_recent(state.log_store.as_ref(), DEFAULT_RECENT_LIMIT)
        .await
        .map_err(|e| {
            app_log!(error, "Failed to load request report: {}", e);
            PageError::new(Status::ServiceUnavailable, "Request log is unavailable")
        })?;

    render(
        views,
        "request_logs.html",
        context! {
            requests => &report.entries,
            total_requests => report.total,
        },
    )
}

pub fn error_page(status: Status, req: &Request<'_>) -> PageError {
    let message = match status.code {
        404 => format!("Nothing lives at {}", req.uri().path()),
        _ => status.reason_lossy().to_string(),
    };
    PageError::new(status, message)
}
