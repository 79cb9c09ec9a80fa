// src/core/cv_repository.rs
//! CV persistence: CVs, their skill links and projects

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;

use crate::app_log;
use crate::types::cv_data::{Cv, CvInput, Project, ProjectInput};

#[derive(Debug, Error)]
pub enum CvStoreError {
    #[error("CV with ID {0} not found")]
    NotFound(i64),

    #[error("cv with this email already exists: {0}")]
    DuplicateEmail(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CvStoreError {
    fn from_write(err: sqlx::Error, email: &str) -> Self {
        let unique_violation = err
            .as_database_error()
            .map(|db_err| db_err.is_unique_violation())
            .unwrap_or(false);

        if unique_violation {
            CvStoreError::DuplicateEmail(email.to_string())
        } else {
            CvStoreError::Database(err)
        }
    }
}

#[derive(sqlx::FromRow)]
struct CvRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    location: String,
    title: String,
    bio: String,
    experience: String,
    education: String,
    portfolio_url: String,
    linkedin_url: String,
    github_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CvRow {
    fn into_cv(self, skills: Vec<String>, projects: Vec<Project>) -> Cv {
        Cv {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            location: self.location,
            title: self.title,
            bio: self.bio,
            experience: self.experience,
            education: self.education,
            portfolio_url: self.portfolio_url,
            linkedin_url: self.linkedin_url,
            github_url: self.github_url,
            skills,
            projects,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const CV_COLUMNS: &str = "id, first_name, last_name, email, phone, location, title, bio, \
     experience, education, portfolio_url, linkedin_url, github_url, created_at, updated_at";

pub struct CvRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CvRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// One page of CVs, most recently updated first, plus the total count
    pub async fn list(&self, page: u32, page_size: u32) -> Result<(Vec<Cv>, i64), CvStoreError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);

        let rows = sqlx::query_as::<_, CvRow>(&format!(
            "SELECT {} FROM cvs ORDER BY updated_at DESC, id DESC LIMIT ? OFFSET ?",
            CV_COLUMNS
        ))
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let mut cvs = Vec::with_capacity(rows.len());
        for row in rows {
            cvs.push(self.hydrate(row).await?);
        }

        Ok((cvs, self.count().await?))
    }

    pub async fn count(&self) -> Result<i64, CvStoreError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cvs")
            .fetch_one(self.pool)
            .await?;
        Ok(total)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Cv>, CvStoreError> {
        let row = sqlx::query_as::<_, CvRow>(&format!("SELECT {} FROM cvs WHERE id = ?", CV_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Insert a validated CV with its skills and projects in one transaction
    pub async fn create(&self, input: &CvInput) -> Result<Cv, CvStoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO cvs (first_name, last_name, email, phone, location, title, bio,
                             experience, education, portfolio_url, linkedin_url, github_url,
                             created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.location)
        .bind(&input.title)
        .bind(&input.bio)
        .bind(&input.experience)
        .bind(&input.education)
        .bind(&input.portfolio_url)
        .bind(&input.linkedin_url)
        .bind(&input.github_url)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| CvStoreError::from_write(e, &input.email))?;

        let cv_id = result.last_insert_rowid();
        Self::replace_skills(&mut tx, cv_id, &input.skills).await?;
        if let Some(projects) = &input.projects {
            Self::replace_projects(&mut tx, cv_id, projects).await?;
        }

        tx.commit().await?;
        app_log!(info, "Created CV {} for {}", cv_id, input.email);

        self.get(cv_id).await?.ok_or(CvStoreError::NotFound(cv_id))
    }

    /// Replace every field of an existing CV. Projects are only replaced when
    /// the input carries them.
    pub async fn update(&self, id: i64, input: &CvInput) -> Result<Cv, CvStoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE cvs
            SET first_name = ?, last_name = ?, email = ?, phone = ?, location = ?, title = ?,
                bio = ?, experience = ?, education = ?, portfolio_url = ?, linkedin_url = ?,
                github_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.location)
        .bind(&input.title)
        .bind(&input.bio)
        .bind(&input.experience)
        .bind(&input.education)
        .bind(&input.portfolio_url)
        .bind(&input.linkedin_url)
        .bind(&input.github_url)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| CvStoreError::from_write(e, &input.email))?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(CvStoreError::NotFound(id));
        }

        Self::replace_skills(&mut tx, id, &input.skills).await?;
        if let Some(projects) = &input.projects {
            Self::replace_projects(&mut tx, id, projects).await?;
        }

        tx.commit().await?;
        app_log!(info, "Updated CV {}", id);

        self.get(id).await?.ok_or(CvStoreError::NotFound(id))
    }

    /// Delete a CV; projects and skill links cascade
    pub async fn delete(&self, id: i64) -> Result<bool, CvStoreError> {
        let result = sqlx::query("DELETE FROM cvs WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            app_log!(info, "Deleted CV {}", id);
        }
        Ok(deleted)
    }

    async fn hydrate(&self, row: CvRow) -> Result<Cv, CvStoreError> {
        let skills = sqlx::query_scalar::<_, String>(
            r#"
            SELECT s.name
            FROM skills s
            JOIN cv_skills cs ON cs.skill_id = s.id
            WHERE cs.cv_id = ?
            ORDER BY s.name ASC
            "#,
        )
        .bind(row.id)
        .fetch_all(self.pool)
        .await?;

        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, title, description, technologies, url, start_date, end_date
            FROM projects
            WHERE cv_id = ?
            ORDER BY start_date DESC, id ASC
            "#,
        )
        .bind(row.id)
        .fetch_all(self.pool)
        .await?;

        Ok(row.into_cv(skills, projects))
    }

    async fn replace_skills(
        tx: &mut Transaction<'_, Sqlite>,
        cv_id: i64,
        skills: &[String],
    ) -> Result<(), CvStoreError> {
        sqlx::query("DELETE FROM cv_skills WHERE cv_id = ?")
            .bind(cv_id)
            .execute(&mut **tx)
            .await?;

        for name in skills {
            sqlx::query("INSERT INTO skills (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
                .bind(name)
                .execute(&mut **tx)
                .await?;

            sqlx::query(
                r#"
                INSERT OR IGNORE INTO cv_skills (cv_id, skill_id)
                SELECT ?, id FROM skills WHERE name = ?
                "#,
            )
            .bind(cv_id)
            .bind(name)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    async fn replace_projects(
        tx: &mut Transaction<'_, Sqlite>,
        cv_id: i64,
        projects: &[ProjectInput],
    ) -> Result<(), CvStoreError> {
        sqlx::query("DELETE FROM projects WHERE cv_id = ?")
            .bind(cv_id)
            .execute(&mut **tx)
            .await?;

        for project in projects {
            sqlx::query(
                r#"
                INSERT INTO projects (cv_id, title, description, technologies, url, start_date, end_date)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(cv_id)
            .bind(&project.title)
            .bind(&project.description)
            .bind(&project.technologies)
            .bind(&project.url)
            .bind(project.start_date)
            .bind(project.end_date)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}
