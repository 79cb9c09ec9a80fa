// src/core/mod.rs
//! Storage, configuration and the external collaborators behind the web layer

pub mod config_manager;
pub mod cv_repository;
pub mod database;
pub mod fs_ops;
pub mod mailer;
pub mod pdf_renderer;
pub mod settings;
pub mod task_queue;
pub mod translation_client;

pub use config_manager::ConfigManager;
pub use cv_repository::{CvRepository, CvStoreError};
pub use database::{Database, User, UserRepository};
pub use fs_ops::FsOps;
pub use mailer::{Mailer, OutboxMailer, OutgoingEmail};
pub use pdf_renderer::{pdf_filename, PdfRenderer, TypstRenderer};
pub use settings::SettingsSnapshot;
pub use task_queue::{TaskContext, TaskKind, TaskQueue, TaskRecord, TaskStatus};
pub use translation_client::{OpenAiTranslator, TranslationService, Translator};
