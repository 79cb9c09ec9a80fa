// src/core/mailer.rs
//! Outgoing mail. Messages are dropped into an outbox directory; delivery is
//! somebody else's job.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::app_log;
use crate::core::FsOps;

#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

#[rocket::async_trait]
pub trait Mailer: Send + Sync {
    /// Queue a message, returning its id
    async fn send(&self, email: OutgoingEmail) -> Result<String>;
}

#[derive(Serialize)]
struct Envelope<'a> {
    id: &'a str,
    created_at: DateTime<Utc>,
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    body: &'a str,
    attachments: Vec<EnvelopeAttachment<'a>>,
}

#[derive(Serialize)]
struct EnvelopeAttachment<'a> {
    filename: &'a str,
    stored_as: String,
    content_type: &'a str,
    size: usize,
}

/// `<outbox>/<id>/message.json` plus one file per attachment
pub struct OutboxMailer {
    outbox_dir: PathBuf,
}

impl OutboxMailer {
    pub fn new(outbox_dir: PathBuf) -> Self {
        Self { outbox_dir }
    }
}

#[rocket::async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<String> {
        if email.to.is_empty() {
            anyhow::bail!("Email has no recipients");
        }

        let id = Uuid::new_v4().to_string();
        let message_dir = self.outbox_dir.join(&id);
        FsOps::ensure_dir_exists(&message_dir).await?;

        let mut attachments = Vec::with_capacity(email.attachments.len());
        for (idx, attachment) in email.attachments.iter().enumerate() {
            let stored_as = format!("{}-{}", idx, stored_name(&attachment.filename));
            FsOps::write_bytes(&message_dir.join(&stored_as), &attachment.data).await?;
            attachments.push(EnvelopeAttachment {
                filename: &attachment.filename,
                stored_as,
                content_type: &attachment.content_type,
                size: attachment.data.len(),
            });
        }

        let envelope = Envelope {
            id: &id,
            created_at: Utc::now(),
            from: &email.from,
            to: &email.to,
            subject: &email.subject,
            body: &email.body,
            attachments,
        };
        let json = serde_json::to_string_pretty(&envelope).context("Failed to encode email")?;
        FsOps::write_file_safe(&message_dir.join("message.json"), &json).await?;

        app_log!(
            info,
            "Queued email '{}' to {} in outbox ({})",
            email.subject,
            email.to.join(", "),
            id
        );
        Ok(id)
    }
}

/// File-system safe attachment name
fn stored_name(filename: &str) -> String {
    let name: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let name = name.trim_start_matches('.');

    if name.is_empty() {
        "attachment".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outbox_writes_envelope_and_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = OutboxMailer::new(dir.path().to_path_buf());

        let id = mailer
            .send(OutgoingEmail {
                from: "noreply@cvdesk.local".to_string(),
                to: vec!["hr@example.com".to_string()],
                subject: "CV for Ada Lovelace".to_string(),
                body: "Please find attached".to_string(),
                attachments: vec![Attachment {
                    filename: "Ada Lovelace_CV.pdf".to_string(),
                    content_type: "application/pdf".to_string(),
                    data: b"%PDF-1.7".to_vec(),
                }],
            })
            .await
            .unwrap();

        let message_dir = dir.path().join(&id);
        let envelope: serde_json::Value = serde_json::from_slice(
            &std::fs::read(message_dir.join("message.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(envelope["subject"], "CV for Ada Lovelace");
        assert_eq!(envelope["to"][0], "hr@example.com");
        assert_eq!(envelope["attachments"][0]["filename"], "Ada Lovelace_CV.pdf");
        assert_eq!(envelope["attachments"][0]["size"], 8);

        let stored = envelope["attachments"][0]["stored_as"].as_str().unwrap();
        assert_eq!(stored, "0-Ada_Lovelace_CV.pdf");
        assert_eq!(std::fs::read(message_dir.join(stored)).unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_rejects_empty_recipients() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = OutboxMailer::new(dir.path().to_path_buf());

        let result = mailer
            .send(OutgoingEmail {
                from: "a@b.c".to_string(),
                to: Vec::new(),
                subject: String::new(),
                body: String::new(),
                attachments: Vec::new(),
            })
            .await;
        assert!(result.is_err());
    }
}
