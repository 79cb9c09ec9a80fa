// src/logging.rs
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

pub const DEFAULT_LOG_FILTER: &str = "cv_manager=info,cvdesk=info,rocket::server=off";

/// Install the global subscriber.
///
/// With a log file the output is JSON lines written to that file (truncated on
/// startup); without one it is the human-readable formatter on stdout.
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory: {}", parent.display())
                })?;
            }

            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;

            Registry::default()
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(Mutex::new(file))
                        .with_current_span(false)
                        .with_span_list(false),
                )
                .with(filter)
                .try_init()
                .context("Failed to install tracing subscriber")?;
        }
        None => {
            Registry::default()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .context("Failed to install tracing subscriber")?;
        }
    }

    Ok(())
}
