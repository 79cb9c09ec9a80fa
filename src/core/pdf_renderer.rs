// src/core/pdf_renderer.rs
//! PDF export: Typst markup generated from a CV, compiled by the `typst` CLI
//! in a throwaway directory under the output path.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use uuid::Uuid;

use crate::app_log;
use crate::core::FsOps;
use crate::types::Cv;
use crate::utils::sanitize_filename;

const SOURCE_FILE: &str = "main.typ";
const PDF_FILE: &str = "cv.pdf";

#[rocket::async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, cv: &Cv) -> Result<Vec<u8>>;
}

/// `{sanitized full name}_CV.pdf`
pub fn pdf_filename(cv: &Cv) -> String {
    format!("{}_CV.pdf", sanitize_filename(&cv.full_name()))
}

pub struct TypstRenderer {
    output_dir: PathBuf,
    binary: String,
}

impl TypstRenderer {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            binary: "typst".to_string(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    async fn compile(&self, workspace: &Path, source: &str) -> Result<Vec<u8>> {
        FsOps::write_file_safe(&workspace.join(SOURCE_FILE), source).await?;

        let output = Command::new(&self.binary)
            .arg("compile")
            .arg(SOURCE_FILE)
            .arg(PDF_FILE)
            .current_dir(workspace)
            .output()
            .await
            .with_context(|| format!("Failed to execute {} compile", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Typst compilation failed: {}", stderr.trim());
        }

        FsOps::read_bytes(&workspace.join(PDF_FILE)).await
    }
}

#[rocket::async_trait]
impl PdfRenderer for TypstRenderer {
    async fn render(&self, cv: &Cv) -> Result<Vec<u8>> {
        let workspace = self.output_dir.join(format!(".render-{}", Uuid::new_v4()));
        FsOps::ensure_dir_exists(&workspace).await?;

        let result = self.compile(&workspace, &typst_source(cv)).await;

        if let Err(e) = FsOps::remove_dir_all(&workspace).await {
            app_log!(warn, "Failed to clean up render workspace: {}", e);
        }

        match &result {
            Ok(bytes) => app_log!(info, "Rendered PDF for CV {} ({} bytes)", cv.id, bytes.len()),
            Err(e) => app_log!(error, "PDF rendering failed for CV {}: {}", cv.id, e),
        }
        result
    }
}

/// Typst string literal displaying `value` verbatim
fn text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 3);
    escaped.push_str("#\"");
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\r' => {}
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped.push('"');
    escaped
}

fn paragraphs(out: &mut String, value: &str) {
    for line in value.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let _ = writeln!(out, "{}\n", text(line));
    }
}

/// Typst document for a CV. All user text goes through string literals.
pub fn typst_source(cv: &Cv) -> String {
    let mut out = String::new();
    out.push_str("#set page(paper: \"a4\", margin: 2cm)\n");
    out.push_str("#set text(size: 10pt)\n\n");

    let _ = writeln!(out, "= {}\n", text(&cv.full_name()));
    let _ = writeln!(out, "*{}*\n", text(&cv.title));

    let contact: Vec<&str> = [cv.email.as_str(), cv.phone.as_str(), cv.location.as_str()]
        .into_iter()
        .filter(|v| !v.is_empty())
        .collect();
    let _ = writeln!(out, "{}\n", text(&contact.join(" | ")));

    for (label, url) in cv.links() {
        let _ = writeln!(out, "{}: {}\n", text(label), text(url));
    }

    out.push_str("== Profile\n\n");
    paragraphs(&mut out, &cv.bio);

    if !cv.skills.is_empty() {
        out.push_str("== Skills\n\n");
        let _ = writeln!(out, "{}\n", text(&cv.skills.join(", ")));
    }

    out.push_str("== Experience\n\n");
    paragraphs(&mut out, &cv.experience);

    out.push_str("== Education\n\n");
    paragraphs(&mut out, &cv.education);

    if !cv.projects.is_empty() {
        out.push_str("== Projects\n\n");
        for project in &cv.projects {
            let _ = writeln!(out, "=== {}\n", text(&project.title));
            let period = match (project.start_date, project.end_date) {
                (Some(start), Some(end)) => format!("{} to {}", start, end),
                (Some(start), None) => format!("{} to present", start),
                _ => String::new(),
            };
            if !period.is_empty() {
                let _ = writeln!(out, "_{}_\n", text(&period));
            }
            paragraphs(&mut out, &project.description);
            let _ = writeln!(out, "{}\n", text(&project.technologies));
            if !project.url.is_empty() {
                let _ = writeln!(out, "{}\n", text(&project.url));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Project;
    use chrono::{NaiveDate, Utc};

    fn sample_cv() -> Cv {
        Cv {
            id: 7,
            first_name: "Jean-Paul".to_string(),
            last_name: "Sartre".to_string(),
            email: "jp@example.com".to_string(),
            phone: "+33 1 23 45".to_string(),
            location: "Paris".to_string(),
            title: "Writer #1 \"existentialist\"".to_string(),
            bio: "Line one\n\nLine $two$ with \\ backslash".to_string(),
            experience: "Les Temps modernes".to_string(),
            education: "ENS".to_string(),
            portfolio_url: String::new(),
            linkedin_url: "https://linkedin.com/in/jps".to_string(),
            github_url: String::new(),
            skills: vec!["Philosophy".to_string(), "Plays".to_string()],
            projects: vec![Project {
                id: 1,
                title: "Being and Nothingness".to_string(),
                description: "Treatise".to_string(),
                technologies: "Pen, paper".to_string(),
                url: String::new(),
                start_date: NaiveDate::from_ymd_opt(1940, 1, 1),
                end_date: NaiveDate::from_ymd_opt(1943, 6, 1),
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_pdf_filename() {
        assert_eq!(pdf_filename(&sample_cv()), "Jean_Paul_Sartre_CV.pdf");
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(text("plain"), "#\"plain\"");
        assert_eq!(text("a \"b\" \\ c"), "#\"a \\\"b\\\" \\\\ c\"");
        assert_eq!(text("x\r\ny"), "#\"x\\ny\"");
    }

    #[test]
    fn test_typst_source_sections() {
        let source = typst_source(&sample_cv());

        assert!(source.contains("= #\"Jean-Paul Sartre\""));
        assert!(source.contains("*#\"Writer #1 \\\"existentialist\\\"\"*"));
        assert!(source.contains("#\"Line $two$ with \\\\ backslash\""));
        assert!(source.contains("#\"LinkedIn\": #\"https://linkedin.com/in/jps\""));
        assert!(source.contains("#\"Philosophy, Plays\""));
        assert!(source.contains("=== #\"Being and Nothingness\""));
        assert!(source.contains("1940-01-01 to 1943-06-01"));
        assert!(!source.contains("Portfolio"));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = TypstRenderer::new(dir.path().to_path_buf())
            .with_binary("cvdesk-no-such-typst-binary");

        assert!(renderer.render(&sample_cv()).await.is_err());

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
