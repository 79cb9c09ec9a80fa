// src/audit/mod.rs
//! Request audit logging: a Rocket fairing records every non-excluded
//! request/response pair into an append-only store that backs the reporting
//! page and the read-only admin query API.

pub mod middleware;
pub mod models;
pub mod policy;
pub mod report;
pub mod store;

pub use middleware::{AuditMode, RequestLogger};
pub use models::{NewRequestLogEntry, RequestLogEntry, RequestLogView};
pub use policy::ExclusionPolicy;
pub use report::{get_recent, RequestReport, DEFAULT_RECENT_LIMIT};
pub use store::{LogFilter, RequestLogStore, SqliteRequestLogStore, StoreError};

pub const DEFAULT_API_PREFIX: &str = "/api/";
