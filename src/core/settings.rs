// src/core/settings.rs
//! Read-only view of the running configuration with secrets removed

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::core::ConfigManager;

pub const DATABASE_ENGINE: &str = "sqlite";

/// Keys that end with any of these are never shown
const SENSITIVE_SUFFIXES: &[&str] = &["JWT_SECRET", "TRANSLATION_API_KEY", "DATABASE_PATH"];
/// Keys containing any of these are never shown
const SENSITIVE_MARKERS: &[&str] = &["PASSWORD", "SECRET"];

#[derive(Debug, Clone, Serialize)]
pub struct SettingsSnapshot {
    pub debug: bool,
    pub safe: BTreeMap<String, Value>,
    /// Every non-sensitive value; only captured in debug mode
    pub all: Option<BTreeMap<String, Value>>,
}

impl SettingsSnapshot {
    pub fn capture(config: &ConfigManager, routes: Vec<String>, fairings: Vec<String>) -> Result<Self> {
        let mut safe = BTreeMap::new();
        safe.insert("DEBUG".to_string(), Value::Bool(config.debug));
        safe.insert("ENVIRONMENT".to_string(), Value::from(config.environment.clone()));
        safe.insert("API_PREFIX".to_string(), Value::from(config.audit.api_prefix.clone()));
        safe.insert("AUDIT_MODE".to_string(), Value::from(config.audit.mode.to_string()));
        safe.insert("DATABASE_ENGINE".to_string(), Value::from(DATABASE_ENGINE));
        safe.insert(
            "DEFAULT_FROM_EMAIL".to_string(),
            Value::from(config.mail.default_from_email.clone()),
        );
        safe.insert(
            "TRANSLATION_MODEL".to_string(),
            Value::from(config.translation.model.clone()),
        );
        safe.insert("ROUTES".to_string(), Value::from(routes));
        safe.insert("FAIRINGS".to_string(), Value::from(fairings));

        let all = if config.debug {
            let tree = serde_json::to_value(config).context("Failed to serialize settings")?;
            let mut all = BTreeMap::new();
            flatten("", &tree, &mut all);
            all.retain(|key, _| !is_sensitive(key));
            for (key, value) in &safe {
                all.entry(key.clone()).or_insert_with(|| value.clone());
            }
            Some(all)
        } else {
            None
        };

        Ok(Self {
            debug: config.debug,
            safe,
            all,
        })
    }

    /// The detailed listing when available, otherwise the safe set
    pub fn detailed(&self) -> &BTreeMap<String, Value> {
        self.all.as_ref().unwrap_or(&self.safe)
    }
}

pub fn is_sensitive(key: &str) -> bool {
    let key = key.to_uppercase();
    SENSITIVE_SUFFIXES.iter().any(|suffix| key.ends_with(suffix))
        || SENSITIVE_MARKERS.iter().any(|marker| key.contains(marker))
}

/// `{"server": {"port": 8000}}` -> `SERVER_PORT = 8000`
fn flatten(prefix: &str, value: &Value, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let key = key.to_uppercase();
                let name = if prefix.is_empty() {
                    key
                } else {
                    format!("{}_{}", prefix, key)
                };
                flatten(&name, child, out);
            }
        }
        leaf => {
            out.insert(prefix.to_string(), leaf.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(debug: bool) -> ConfigManager {
        let mut config = ConfigManager {
            debug,
            ..Default::default()
        };
        config.auth.jwt_secret = "super-secret-value".to_string();
        config.translation.api_key = Some("sk-live-123".to_string());
        config
    }

    #[test]
    fn test_safe_set_only_outside_debug() {
        let snapshot = SettingsSnapshot::capture(
            &config(false),
            vec!["GET /".to_string()],
            vec!["Request audit logger".to_string()],
        )
        .unwrap();

        assert!(snapshot.all.is_none());
        assert_eq!(snapshot.safe["DEBUG"], Value::Bool(false));
        assert_eq!(snapshot.safe["DATABASE_ENGINE"], "sqlite");
        assert_eq!(snapshot.safe["AUDIT_MODE"], "inline");
        assert_eq!(snapshot.safe["ROUTES"][0], "GET /");
        assert_eq!(snapshot.detailed(), &snapshot.safe);
    }

    #[test]
    fn test_debug_listing_redacts_secrets() {
        let snapshot = SettingsSnapshot::capture(&config(true), Vec::new(), Vec::new()).unwrap();
        let all = snapshot.all.as_ref().unwrap();

        assert!(all.contains_key("SERVER_PORT"));
        assert!(all.contains_key("TRANSLATION_MODEL"));
        assert!(all.contains_key("PATHS_OUTBOX_PATH"));
        assert!(!all.contains_key("AUTH_JWT_SECRET"));
        assert!(!all.contains_key("TRANSLATION_API_KEY"));
        assert!(!all.contains_key("PATHS_DATABASE_PATH"));

        let dump = serde_json::to_string(all).unwrap();
        assert!(!dump.contains("super-secret-value"));
        assert!(!dump.contains("sk-live-123"));
    }

    #[test]
    fn test_is_sensitive() {
        assert!(is_sensitive("JWT_SECRET"));
        assert!(is_sensitive("SMTP_PASSWORD"));
        assert!(is_sensitive("translation_api_key"));
        assert!(is_sensitive("PATHS_DATABASE_PATH"));
        assert!(!is_sensitive("DEBUG"));
        assert!(!is_sensitive("API_PREFIX"));
    }
}
