// src/core/database.rs
//! SQLite connection management, schema migrations and the user table

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::app_log;
use crate::core::FsOps;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL DEFAULT '',
        password_hash TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        is_staff BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cvs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        phone TEXT NOT NULL DEFAULT '',
        location TEXT NOT NULL DEFAULT '',
        title TEXT NOT NULL,
        bio TEXT NOT NULL,
        experience TEXT NOT NULL,
        education TEXT NOT NULL,
        portfolio_url TEXT NOT NULL DEFAULT '',
        linkedin_url TEXT NOT NULL DEFAULT '',
        github_url TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_cvs_updated_at ON cvs(updated_at)",
    r#"
    CREATE TABLE IF NOT EXISTS skills (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cv_skills (
        cv_id INTEGER NOT NULL REFERENCES cvs(id) ON DELETE CASCADE,
        skill_id INTEGER NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
        PRIMARY KEY (cv_id, skill_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        cv_id INTEGER NOT NULL REFERENCES cvs(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        technologies TEXT NOT NULL,
        url TEXT NOT NULL DEFAULT '',
        start_date TEXT,
        end_date TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_projects_cv_id ON projects(cv_id)",
    r#"
    CREATE TABLE IF NOT EXISTS request_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        method TEXT NOT NULL,
        path TEXT NOT NULL,
        query_string TEXT NOT NULL DEFAULT '',
        remote_ip TEXT,
        user_agent TEXT NOT NULL DEFAULT '',
        user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
        status_code INTEGER,
        response_time_ms REAL,
        content_type TEXT NOT NULL DEFAULT '',
        content_length INTEGER
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_request_logs_timestamp ON request_logs(timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_request_logs_method ON request_logs(method)",
    "CREATE INDEX IF NOT EXISTS idx_request_logs_path ON request_logs(path)",
    "CREATE INDEX IF NOT EXISTS idx_request_logs_timestamp_method ON request_logs(timestamp, method)",
    "CREATE INDEX IF NOT EXISTS idx_request_logs_path_timestamp ON request_logs(path, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_request_logs_user_timestamp ON request_logs(user_id, timestamp)",
];

// ===== Core Database Connection Management =====

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database file and run migrations
    pub async fn new(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            FsOps::ensure_dir_exists(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .with_context(|| {
                format!("Failed to connect to database: {}", database_path.display())
            })?;

        app_log!(
            info,
            "Database connection established: {}",
            database_path.display()
        );

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Private in-memory database. A single connection that never idles out,
    /// so every query sees the same data.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        for statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Migration failed: {}", statement.trim()))?;
        }

        app_log!(info, "Database migrations completed");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }
}

// ===== User Models =====

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

// ===== User Repository =====

pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
    hash_cost: u32,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Lower the bcrypt cost (tests only need the minimum)
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password: &str,
        is_staff: bool,
    ) -> Result<User> {
        let now = Utc::now();
        let password_hash =
            bcrypt::hash(password, self.hash_cost).context("Failed to hash password")?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, is_active, is_staff, created_at)
            VALUES (?, ?, ?, TRUE, ?, ?)
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .bind(is_staff)
        .bind(now)
        .execute(self.pool)
        .await?;

        let user = User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            is_active: true,
            is_staff,
            created_at: now,
        };

        app_log!(info, "Created user: {} (staff: {})", username, is_staff);
        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_active, is_staff, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_active, is_staff, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Active user whose password matches, if any
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.find_by_username(username).await? else {
            return Ok(None);
        };

        if !user.is_active {
            return Ok(None);
        }

        let valid = bcrypt::verify(password, &user.password_hash)
            .context("Failed to verify password hash")?;

        Ok(valid.then_some(user))
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_active, is_staff, created_at
            FROM users
            ORDER BY username ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    pub async fn deactivate(&self, username: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_active = FALSE WHERE username = ?")
            .bind(username)
            .execute(self.pool)
            .await?;

        let updated = result.rows_affected() > 0;
        if updated {
            app_log!(info, "Deactivated user: {}", username);
        }
        Ok(updated)
    }

    /// Delete the user. Request log rows keep existing with a null user.
    pub async fn delete(&self, username: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            app_log!(info, "Deleted user: {}", username);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_user_lifecycle() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool()).with_hash_cost(4);

        let user = repo
            .create("alice", "alice@example.com", "s3cret", true)
            .await
            .unwrap();
        assert!(user.is_staff);

        let found = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.username, "alice");

        assert!(repo.verify_credentials("alice", "s3cret").await.unwrap().is_some());
        assert!(repo.verify_credentials("alice", "wrong").await.unwrap().is_none());
        assert!(repo.verify_credentials("nobody", "s3cret").await.unwrap().is_none());

        assert!(repo.deactivate("alice").await.unwrap());
        assert!(repo.verify_credentials("alice", "s3cret").await.unwrap().is_none());

        assert!(repo.delete("alice").await.unwrap());
        assert!(!repo.delete("alice").await.unwrap());
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool()).with_hash_cost(4);

        repo.create("bob", "bob@example.com", "pw", false).await.unwrap();
        assert!(repo.create("bob", "other@example.com", "pw", false).await.is_err());
    }
}
