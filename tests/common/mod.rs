#![allow(dead_code)]

use anyhow::Result;
use cv_manager::audit::{
    AuditMode, LogFilter, NewRequestLogEntry, RequestLogEntry, RequestLogStore,
    SqliteRequestLogStore, StoreError,
};
use cv_manager::auth::{AuthConfig, Principal};
use cv_manager::core::{
    ConfigManager, Database, OutboxMailer, PdfRenderer, TranslationService, Translator,
    UserRepository,
};
use cv_manager::types::Cv;
use cv_manager::{build_rocket, AppState};
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const TEST_SECRET: &str = "integration-secret";

pub struct FakePdf;

#[rocket::async_trait]
impl PdfRenderer for FakePdf {
    async fn render(&self, _cv: &Cv) -> Result<Vec<u8>> {
        Ok(b"%PDF-1.7 fake".to_vec())
    }
}

pub struct CannedTranslator;

#[rocket::async_trait]
impl Translator for CannedTranslator {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
        Ok(r#"Here you go: {"title": "Skrifer", "bio": "Bio", "experience": "Exp",
            "education": "Edu", "skills": ["Rust"]}"#
            .to_string())
    }
}

/// Store whose every call fails
pub struct FailingStore;

#[rocket::async_trait]
impl RequestLogStore for FailingStore {
    async fn append(&self, _entry: NewRequestLogEntry) -> Result<i64, StoreError> {
        Err(StoreError::Unavailable("disk on fire".to_string()))
    }

    async fn query(
        &self,
        _filter: &LogFilter,
        _limit: i64,
        _offset: i64,
    ) -> Result<Vec<RequestLogEntry>, StoreError> {
        Err(StoreError::Unavailable("disk on fire".to_string()))
    }

    async fn count(&self, _filter: &LogFilter) -> Result<i64, StoreError> {
        Err(StoreError::Unavailable("disk on fire".to_string()))
    }
}

pub struct TestApp {
    pub client: Client,
    pub database: Database,
    pub auth: AuthConfig,
    pub store: Arc<dyn RequestLogStore>,
    pub outbox: TempDir,
}

pub struct Options {
    pub mode: AuditMode,
    pub debug: bool,
    pub failing_store: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mode: AuditMode::Inline,
            debug: false,
            failing_store: false,
        }
    }
}

pub async fn setup() -> TestApp {
    setup_with(Options::default()).await
}

pub async fn setup_with(options: Options) -> TestApp {
    let database = Database::in_memory().await.unwrap();
    let outbox = tempfile::tempdir().unwrap();

    let mut config = ConfigManager::default();
    config.debug = options.debug;
    config.audit.mode = options.mode;
    config.auth.jwt_secret = TEST_SECRET.to_string();
    config.paths.outbox_path = outbox.path().to_path_buf();

    let store: Arc<dyn RequestLogStore> = if options.failing_store {
        Arc::new(FailingStore)
    } else {
        Arc::new(SqliteRequestLogStore::new(database.pool().clone()))
    };
    let auth = AuthConfig::from_settings(&config.auth);

    let state = AppState {
        config,
        database: database.clone(),
        auth: auth.clone(),
        log_store: Arc::clone(&store),
        renderer: Arc::new(FakePdf),
        mailer: Arc::new(OutboxMailer::new(outbox.path().to_path_buf())),
        translation: Arc::new(TranslationService::new(Arc::new(CannedTranslator))),
        fairings: Vec::new(),
    };

    let client = Client::tracked(build_rocket(state).unwrap()).await.unwrap();

    TestApp {
        client,
        database,
        auth,
        store,
        outbox,
    }
}

impl TestApp {
    /// Create a user and return a bearer header value for it
    pub async fn login(&self, username: &str, is_staff: bool) -> (i64, String) {
        let user = UserRepository::new(self.database.pool())
            .with_hash_cost(4)
            .create(username, &format!("{}@example.com", username), "pw", is_staff)
            .await
            .unwrap();
        let token = self.auth.issue_token(&Principal::from(&user)).unwrap();
        (user.id, format!("Bearer {}", token))
    }

    pub async fn entries(&self) -> Vec<RequestLogEntry> {
        self.store
            .query(&LogFilter::default(), 1000, 0)
            .await
            .unwrap()
    }

    /// Poll until the store holds at least `n` entries
    pub async fn wait_for_entries(&self, n: usize) -> Vec<RequestLogEntry> {
        for _ in 0..200 {
            let entries = self.entries().await;
            if entries.len() >= n {
                return entries;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("store never reached {} entries", n);
    }
}

pub fn cv_payload(first: &str, last: &str, email: &str) -> Value {
    json!({
        "first_name": first,
        "last_name": last,
        "email": email,
        "phone": "+1234567890",
        "location": "New York, NY",
        "title": "Software Developer",
        "bio": "Experienced developer with passion for clean code",
        "experience": "5+ years of software development experience",
        "education": "Bachelor's in Computer Science",
        "portfolio_url": "https://johndoe.dev",
        "linkedin_url": "https://linkedin.com/in/johndoe",
        "github_url": "https://github.com/johndoe",
        "skills": ["Python", "Rust"],
        "projects": [{
            "title": "CV site",
            "description": "Personal site",
            "technologies": "Rust, Rocket",
            "url": "https://example.com/cv",
            "start_date": "2024-01-01",
            "end_date": null
        }]
    })
}
