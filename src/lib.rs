//! CV management service: CV CRUD over a REST API and server-rendered pages,
//! PDF export, background email/translation tasks and a request audit log.

pub mod audit;
pub mod auth;
pub mod core;
pub mod logging;
pub mod types;
pub mod user_cli;
pub mod utils;
pub mod web;

pub use web::{build_rocket, start_web_server, AppState};

/// Emit a `tracing` event at the given level.
///
/// `app_log!(info, "Created CV {}", id)`
#[macro_export]
macro_rules! app_log {
    (trace, $($arg:tt)+) => { ::tracing::trace!($($arg)+) };
    (debug, $($arg:tt)+) => { ::tracing::debug!($($arg)+) };
    (info, $($arg:tt)+) => { ::tracing::info!($($arg)+) };
    (warn, $($arg:tt)+) => { ::tracing::warn!($($arg)+) };
    (error, $($arg:tt)+) => { ::tracing::error!($($arg)+) };
}

/// Open an info-level span with structured fields.
#[macro_export]
macro_rules! app_span {
    ($name:expr) => { ::tracing::info_span!($name) };
    ($name:expr, $($fields:tt)+) => { ::tracing::info_span!($name, $($fields)+) };
}
