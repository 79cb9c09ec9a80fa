// src/core/config_manager.rs
//! Unified configuration: optional `config.yaml` per environment, then
//! environment variable overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::app_log;
use crate::audit::AuditMode;
use crate::core::FsOps;

pub const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigManager {
    pub environment: String,
    pub debug: bool,
    pub server: ServerSettings,
    pub paths: PathSettings,
    pub audit: AuditSettings,
    pub auth: AuthSettings,
    pub translation: TranslationSettings,
    pub mail: MailSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub database_path: PathBuf,
    pub output_path: PathBuf,
    pub outbox_path: PathBuf,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    pub mode: AuditMode,
    pub api_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub default_from_email: String,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    local: Option<ConfigManager>,
    production: Option<ConfigManager>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self {
            environment: "local".to_string(),
            debug: false,
            server: ServerSettings::default(),
            paths: PathSettings::default(),
            audit: AuditSettings::default(),
            auth: AuthSettings::default(),
            translation: TranslationSettings::default(),
            mail: MailSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/cvdesk.db"),
            output_path: PathBuf::from("out"),
            outbox_path: PathBuf::from("out/outbox"),
            log_file: None,
        }
    }
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            mode: AuditMode::Inline,
            api_prefix: crate::audit::DEFAULT_API_PREFIX.to_string(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            token_ttl_hours: 24,
        }
    }
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 60,
        }
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            default_from_email: "noreply@cvdesk.local".to_string(),
        }
    }
}

impl ConfigManager {
    /// Load configuration for the current environment
    pub fn load() -> Result<Self> {
        let environment = Self::get_environment();
        app_log!(info, "Loading configuration for environment: {}", environment);

        let mut config = Self::load_from_file(Path::new(CONFIG_FILE), &environment)?;
        config.environment = environment;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.resolve_paths()?;
        Ok(config)
    }

    fn get_environment() -> String {
        std::env::var("ENVIRONMENT")
            .or_else(|_| std::env::var("ENV"))
            .unwrap_or_else(|_| "local".to_string())
    }

    /// Read the section for `environment`; a missing file yields defaults.
    pub fn load_from_file(path: &Path, environment: &str) -> Result<Self> {
        if !path.exists() {
            app_log!(
                info,
                "{} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content, environment)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str, environment: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(content)?;
        let section = match environment {
            "production" => file.production,
            _ => file.local,
        };
        Ok(section.unwrap_or_default())
    }

    /// Apply overrides from a key lookup (the process environment in `load`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("ROCKET_PORT").or_else(|| lookup("PORT")) {
            self.server.port = port
                .parse()
                .map_err(|_| anyhow::anyhow!("ROCKET_PORT must be a valid port number"))?;
        }
        if let Some(address) = lookup("ROCKET_ADDRESS") {
            self.server.address = address;
        }
        if let Some(debug) = lookup("DEBUG") {
            self.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            self.paths.database_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("OUTPUT_PATH") {
            self.paths.output_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("OUTBOX_PATH") {
            self.paths.outbox_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("LOG_FILE") {
            self.paths.log_file = Some(PathBuf::from(path));
        }
        if let Some(mode) = lookup("AUDIT_MODE") {
            self.audit.mode = mode.parse()?;
        }
        if let Some(prefix) = lookup("API_PREFIX") {
            self.audit.api_prefix = prefix;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(url) = lookup("TRANSLATION_API_URL") {
            self.translation.api_url = url;
        }
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
            self.translation.api_key = Some(key);
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.translation.model = model;
        }
        if let Some(from) = lookup("DEFAULT_FROM_EMAIL") {
            self.mail.default_from_email = from;
        }
        Ok(())
    }

    fn resolve_paths(&mut self) -> Result<()> {
        self.paths.database_path = Self::resolve_path(&self.paths.database_path)?;
        self.paths.output_path = Self::resolve_path(&self.paths.output_path)?;
        self.paths.outbox_path = Self::resolve_path(&self.paths.outbox_path)?;
        if let Some(log_file) = &self.paths.log_file {
            self.paths.log_file = Some(Self::resolve_path(log_file)?);
        }
        Ok(())
    }

    fn resolve_path(path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            let current_dir = std::env::current_dir().context("Failed to get current directory")?;
            Ok(current_dir.join(path))
        }
    }

    /// Ensure all required directories exist
    pub async fn ensure_directories(&self) -> Result<()> {
        FsOps::ensure_dir_exists(&self.paths.output_path).await?;
        FsOps::ensure_dir_exists(&self.paths.outbox_path).await?;

        if let Some(db_parent) = self.paths.database_path.parent() {
            FsOps::ensure_dir_exists(db_parent).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_file() {
        let config = ConfigManager::load_from_file(Path::new("/nonexistent/config.yaml"), "local")
            .unwrap();
        assert_eq!(config.audit.api_prefix, "/api/");
        assert_eq!(config.audit.mode, AuditMode::Inline);
        assert_eq!(config.server.port, 8000);
        assert!(config.translation.api_key.is_none());
    }

    #[test]
    fn test_yaml_sections() {
        let yaml = r#"
local:
  debug: true
  server:
    port: 9000
production:
  audit:
    mode: background
  paths:
    database_path: /var/lib/cvdesk/cvdesk.db
"#;
        let local = ConfigManager::from_yaml(yaml, "local").unwrap();
        assert!(local.debug);
        assert_eq!(local.server.port, 9000);
        assert_eq!(local.audit.mode, AuditMode::Inline);

        let production = ConfigManager::from_yaml(yaml, "production").unwrap();
        assert!(!production.debug);
        assert_eq!(production.audit.mode, AuditMode::Background);
        assert_eq!(
            production.paths.database_path,
            PathBuf::from("/var/lib/cvdesk/cvdesk.db")
        );
        // untouched sections keep their defaults
        assert_eq!(production.server.port, 8000);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ROCKET_PORT", "8123"),
            ("DEBUG", "true"),
            ("AUDIT_MODE", "background"),
            ("OPENAI_API_KEY", "sk-test"),
            ("API_PREFIX", "/rest/"),
        ]
        .into_iter()
        .collect();

        let mut config = ConfigManager::default();
        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 8123);
        assert!(config.debug);
        assert_eq!(config.audit.mode, AuditMode::Background);
        assert_eq!(config.translation.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.audit.api_prefix, "/rest/");
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = ConfigManager::default();
        let result = config.apply_env_overrides(|key| {
            (key == "ROCKET_PORT").then(|| "not-a-port".to_string())
        });
        assert!(result.is_err());
    }
}
