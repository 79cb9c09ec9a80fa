// src/audit/policy.rs
//! Which requests are not worth recording: static assets and operational noise.

/// Exact paths that are never logged
pub const EXCLUDED_PATHS: &[&str] = &["/admin/jsi18n/", "/favicon.ico", "/robots.txt"];

/// Static asset suffixes that are never logged
pub const EXCLUDED_EXTENSIONS: &[&str] = &[
    ".css", ".js", ".png", ".jpg", ".jpeg", ".gif", ".ico", ".woff", ".woff2", ".ttf", ".svg",
    ".map",
];

/// Asset mount points that are never logged
pub const EXCLUDED_PREFIXES: &[&str] = &["/static/", "/media/"];

/// Pure predicate over the request path. No I/O, cannot fail.
#[derive(Debug, Clone, Copy)]
pub struct ExclusionPolicy {
    paths: &'static [&'static str],
    extensions: &'static [&'static str],
    prefixes: &'static [&'static str],
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self {
            paths: EXCLUDED_PATHS,
            extensions: EXCLUDED_EXTENSIONS,
            prefixes: EXCLUDED_PREFIXES,
        }
    }
}

impl ExclusionPolicy {
    pub fn should_skip(&self, path: &str) -> bool {
        self.paths.contains(&path)
            || self.extensions.iter().any(|ext| path.ends_with(ext))
            || self.prefixes.iter().any(|prefix| path.starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_paths() {
        let policy = ExclusionPolicy::default();
        for path in [
            "/favicon.ico",
            "/robots.txt",
            "/admin/jsi18n/",
            "/static/css/style.css",
            "/static/js/script.js",
            "/static/readme",
            "/media/image.png",
            "/media/uploads/cv",
            "/assets/app.js.map",
            "/fonts/inter.woff2",
            "/logo.svg",
            "/photo.jpeg",
        ] {
            assert!(policy.should_skip(path), "{} should be skipped", path);
        }
    }

    #[test]
    fn test_logged_paths() {
        let policy = ExclusionPolicy::default();
        for path in [
            "/",
            "/logs/",
            "/cv/1",
            "/cv/1/pdf",
            "/api/v1/cvs",
            "/nonexistent-page/",
            "/robots.txt/extra",
            "/admin/jsi18n",
            "/staticfiles",
            "/api/v1/cvs/1/json",
        ] {
            assert!(!policy.should_skip(path), "{} should be logged", path);
        }
    }
}
