// src/audit/middleware.rs
use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use super::models::NewRequestLogEntry;
use super::policy::ExclusionPolicy;
use super::store::RequestLogStore;
use crate::app_log;
use crate::auth::OptionalAuth;
use crate::utils::first_list_item;

/// When the log write happens relative to the response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditMode {
    /// Awaited before the response goes back to the transport
    #[default]
    Inline,
    /// Spawned on the runtime; the response does not wait for it
    Background,
}

impl FromStr for AuditMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inline" | "sync" => Ok(AuditMode::Inline),
            "background" | "async" => Ok(AuditMode::Background),
            other => Err(anyhow::anyhow!(
                "Unknown audit mode '{}': expected 'inline' or 'background'",
                other
            )),
        }
    }
}

impl fmt::Display for AuditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditMode::Inline => write!(f, "inline"),
            AuditMode::Background => write!(f, "background"),
        }
    }
}

/// Start instant, request-local
struct RequestStart(Option<Instant>);

/// Fairing that records every non-excluded exchange into the request log.
///
/// Nothing here can change the response: metadata that cannot be derived is
/// left unset and store failures are only reported to the operational log.
pub struct RequestLogger {
    store: Arc<dyn RequestLogStore>,
    policy: ExclusionPolicy,
    mode: AuditMode,
}

impl RequestLogger {
    pub fn new(store: Arc<dyn RequestLogStore>, mode: AuditMode) -> Self {
        Self {
            store,
            policy: ExclusionPolicy::default(),
            mode,
        }
    }

    pub fn name(&self) -> &'static str {
        self.info().name
    }
}

/// Snapshot of the exchange; nothing is awaited while `res` is borrowed
fn build_entry(req: &Request<'_>, res: &Response<'_>, user_id: Option<i64>) -> NewRequestLogEntry {
    let response_time_ms = req
        .local_cache(|| RequestStart(None))
        .0
        .map(|start| start.elapsed().as_secs_f64() * 1000.0);

    NewRequestLogEntry {
        method: req.method().as_str().to_string(),
        path: req.uri().path().as_str().to_string(),
        query_string: req
            .uri()
            .query()
            .map(|q| q.as_str().to_string())
            .unwrap_or_default(),
        remote_ip: client_ip(req),
        user_agent: req
            .headers()
            .get_one("User-Agent")
            .unwrap_or_default()
            .to_string(),
        user_id,
        status_code: Some(i32::from(res.status().code)),
        response_time_ms,
        content_type: res
            .content_type()
            .map(|ct| ct.to_string())
            .unwrap_or_default(),
        content_length: content_length(res),
    }
    .bounded()
}

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request audit logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _: &mut Data<'_>) {
        if self.policy.should_skip(req.uri().path().as_str()) {
            return;
        }
        req.local_cache(|| RequestStart(Some(Instant::now())));
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        if self.policy.should_skip(req.uri().path().as_str()) {
            return;
        }

        let user_id = req
            .guard::<OptionalAuth>()
            .await
            .succeeded()
            .and_then(|auth| auth.user)
            .map(|principal| principal.id);
        let entry = build_entry(req, res, user_id);

        match self.mode {
            AuditMode::Inline => record(self.store.as_ref(), entry).await,
            AuditMode::Background => {
                let store = Arc::clone(&self.store);
                tokio::spawn(async move {
                    record(store.as_ref(), entry).await;
                });
            }
        }
    }
}

async fn record(store: &dyn RequestLogStore, entry: NewRequestLogEntry) {
    let method = entry.method.clone();
    let path = entry.path.clone();

    match store.append(entry).await {
        Ok(id) => app_log!(trace, "Recorded request {} {} as #{}", method, path, id),
        Err(e) => app_log!(error, "Failed to record request {} {}: {}", method, path, e),
    }
}

/// `X-Forwarded-For` (first hop), then `X-Real-IP`, then the peer address
fn client_ip(req: &Request<'_>) -> Option<String> {
    let headers = req.headers();

    headers
        .get_one("X-Forwarded-For")
        .and_then(first_list_item)
        .or_else(|| {
            headers
                .get_one("X-Real-IP")
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
        })
        .map(str::to_string)
        .or_else(|| req.remote().map(|addr| addr.ip().to_string()))
}

/// The declared `Content-Length` wins over the body's known size
fn content_length(res: &Response<'_>) -> Option<i64> {
    res.headers()
        .get_one("Content-Length")
        .and_then(|value| value.trim().parse::<i64>().ok())
        .or_else(|| {
            res.body()
                .preset_size()
                .and_then(|size| i64::try_from(size).ok())
        })
}
