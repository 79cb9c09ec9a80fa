// src/web/views.rs
//! HTML templates compiled into the binary

use anyhow::{Context, Result};
use chrono::DateTime;
use minijinja::{Environment, Value};
use rocket::response::content::RawHtml;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("templates/base.html")),
    ("cv_list.html", include_str!("templates/cv_list.html")),
    ("cv_detail.html", include_str!("templates/cv_detail.html")),
    ("settings.html", include_str!("templates/settings.html")),
    ("request_logs.html", include_str!("templates/request_logs.html")),
    ("error.html", include_str!("templates/error.html")),
];

pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)
                .with_context(|| format!("Invalid template: {}", name))?;
        }
        env.add_filter("datetime", datetime);
        Ok(Self { env })
    }

    pub fn render(&self, name: &str, ctx: Value) -> Result<RawHtml<String>> {
        let html = self
            .env
            .get_template(name)?
            .render(ctx)
            .with_context(|| format!("Failed to render template: {}", name))?;
        Ok(RawHtml(html))
    }
}

/// RFC 3339 timestamp -> `YYYY-MM-DD HH:MM:SS`
fn datetime(value: String) -> String {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn test_templates_compile_and_escape() {
        let views = Views::new().unwrap();
        let html = views
            .render(
                "error.html",
                context! { code => 404, message => "<script>alert(1)</script>" },
            )
            .unwrap();

        assert!(html.0.contains("<h1>404</h1>"));
        assert!(html.0.contains("&lt;script&gt;"));
        assert!(!html.0.contains("<script>alert"));
    }

    #[test]
    fn test_datetime_filter() {
        assert_eq!(datetime("2024-03-09T14:05:07.123+00:00".to_string()), "2024-03-09 14:05:07");
        assert_eq!(datetime("not a date".to_string()), "not a date");
    }
}
