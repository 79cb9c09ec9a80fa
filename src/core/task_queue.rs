// src/core/task_queue.rs
//! In-process background tasks: a single tokio worker fed by an unbounded
//! channel, with task status kept in memory.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use minijinja::{context, Environment};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::Instrument;
use uuid::Uuid;

use crate::core::cv_repository::{CvRepository, CvStoreError};
use crate::core::database::Database;
use crate::core::mailer::{Attachment, Mailer, OutgoingEmail};
use crate::core::pdf_renderer::PdfRenderer;
use crate::core::translation_client::{language_name, TranslationService};
use crate::types::{Cv, TranslationResult};
use crate::{app_log, app_span};

const EMAIL_TEMPLATE: &str = include_str!("../web/templates/email_cv.txt");

/// How long a finished task stays queryable
const FINISHED_RETENTION_MINUTES: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum TaskKind {
    SendCvPdf { cv_id: i64, recipient: String },
    TranslateCv { cv_id: i64, target_language: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded { result: serde_json::Value },
    Failed { error: String },
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Succeeded { .. } | TaskStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub kind: TaskKind,
    #[serde(flatten)]
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything a task needs to do its work
#[derive(Clone)]
pub struct TaskContext {
    pub database: Database,
    pub renderer: Arc<dyn PdfRenderer>,
    pub mailer: Arc<dyn Mailer>,
    pub translation: Arc<TranslationService>,
    pub from_email: String,
}

struct QueuedTask {
    id: Uuid,
    kind: TaskKind,
}

type TaskTable = Arc<RwLock<HashMap<Uuid, TaskRecord>>>;

#[derive(Clone)]
pub struct TaskQueue {
    sender: mpsc::UnboundedSender<QueuedTask>,
    records: TaskTable,
}

impl TaskQueue {
    /// Spawn the worker on the current tokio runtime
    pub fn start(context: TaskContext) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let records: TaskTable = Arc::new(RwLock::new(HashMap::new()));

        tokio::spawn(worker(context, receiver, Arc::clone(&records)));
        app_log!(info, "Background task worker started");

        Self { sender, records }
    }

    pub async fn enqueue(&self, kind: TaskKind) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut records = self.records.write().await;
        prune_finished(
            &mut records,
            now,
            Duration::minutes(FINISHED_RETENTION_MINUTES),
        );
        records.insert(
            id,
            TaskRecord {
                id,
                kind: kind.clone(),
                status: TaskStatus::Pending,
                created_at: now,
                updated_at: now,
            },
        );
        drop(records);

        if self.sender.send(QueuedTask { id, kind }).is_err() {
            self.records.write().await.remove(&id);
            anyhow::bail!("Background task worker is not running");
        }

        app_log!(info, "Queued task {}", id);
        Ok(id)
    }

    pub async fn status(&self, id: Uuid) -> Option<TaskRecord> {
        self.records.read().await.get(&id).cloned()
    }
}

async fn worker(
    context: TaskContext,
    mut receiver: mpsc::UnboundedReceiver<QueuedTask>,
    records: TaskTable,
) {
    while let Some(task) = receiver.recv().await {
        set_status(&records, task.id, TaskStatus::Running).await;

        let outcome = run(&context, &task.kind)
            .instrument(app_span!("task", task_id = %task.id))
            .await;

        let status = match outcome {
            Ok(result) => {
                app_log!(info, "Task {} succeeded", task.id);
                TaskStatus::Succeeded { result }
            }
            Err(e) => {
                app_log!(error, "Task {} failed: {:#}", task.id, e);
                TaskStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        set_status(&records, task.id, status).await;
    }

    app_log!(info, "Background task worker stopped");
}

/// Drop succeeded and failed records last touched before `now - retention`
fn prune_finished(records: &mut HashMap<Uuid, TaskRecord>, now: DateTime<Utc>, retention: Duration) {
    let cutoff = now - retention;
    records.retain(|_, record| !record.status.is_finished() || record.updated_at >= cutoff);
}

async fn set_status(records: &TaskTable, id: Uuid, status: TaskStatus) {
    if let Some(record) = records.write().await.get_mut(&id) {
        record.status = status;
        record.updated_at = Utc::now();
    }
}

async fn load_cv(context: &TaskContext, cv_id: i64) -> Result<Cv> {
    let cv = CvRepository::new(context.database.pool())
        .get(cv_id)
        .await?
        .ok_or(CvStoreError::NotFound(cv_id))?;
    Ok(cv)
}

async fn run(context: &TaskContext, kind: &TaskKind) -> Result<serde_json::Value> {
    match kind {
        TaskKind::SendCvPdf { cv_id, recipient } => {
            send_cv_pdf(context, *cv_id, recipient).await
        }
        TaskKind::TranslateCv {
            cv_id,
            target_language,
        } => translate_cv(context, *cv_id, target_language).await,
    }
}

async fn send_cv_pdf(
    context: &TaskContext,
    cv_id: i64,
    recipient: &str,
) -> Result<serde_json::Value> {
    let cv = load_cv(context, cv_id).await?;
    let pdf = context.renderer.render(&cv).await?;
    let full_name = cv.full_name();

    let email_id = context
        .mailer
        .send(OutgoingEmail {
            from: context.from_email.clone(),
            to: vec![recipient.to_string()],
            subject: format!("CV for {}", full_name),
            body: render_email_body(&cv, recipient)?,
            attachments: vec![Attachment {
                filename: format!("{}_CV.pdf", full_name),
                content_type: "application/pdf".to_string(),
                data: pdf,
            }],
        })
        .await?;

    app_log!(info, "CV PDF sent to {} for CV ID: {}", recipient, cv_id);
    Ok(serde_json::json!({
        "message": format!("Email sent successfully to {}", recipient),
        "email_id": email_id,
    }))
}

async fn translate_cv(
    context: &TaskContext,
    cv_id: i64,
    target_language: &str,
) -> Result<serde_json::Value> {
    let cv = load_cv(context, cv_id).await?;
    let translated_content = context.translation.translate(&cv, target_language).await?;

    let result = TranslationResult {
        cv_id,
        target_language: language_name(target_language)
            .unwrap_or(target_language)
            .to_string(),
        translated_content,
    };
    serde_json::to_value(result).context("Failed to encode translation result")
}

pub fn render_email_body(cv: &Cv, recipient: &str) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("email_cv.txt", EMAIL_TEMPLATE)
        .context("Invalid email template")?;

    env.get_template("email_cv.txt")?
        .render(context! {
            cv => cv,
            full_name => cv.full_name(),
            recipient_email => recipient,
        })
        .context("Failed to render email body")
}
