// src/types/cv_data.rs
//! CV records, their input payloads and field validation

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field name -> list of messages, the shape returned on 400 responses.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_PHONE_LEN: usize = 20;
pub const MAX_LOCATION_LEN: usize = 200;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_SKILL_LEN: usize = 100;
pub const MAX_TECHNOLOGIES_LEN: usize = 300;

const BLANK: &str = "This field may not be blank.";
const INVALID_URL: &str = "Enter a valid URL.";

// ===== Stored Records =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cv {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub title: String,
    pub bio: String,
    pub experience: String,
    pub education: String,
    pub portfolio_url: String,
    pub linkedin_url: String,
    pub github_url: String,
    pub skills: Vec<String>,
    pub projects: Vec<Project>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cv {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// `(label, url)` for each non-empty profile link
    pub fn links(&self) -> Vec<(&'static str, &str)> {
        [
            ("Portfolio", self.portfolio_url.as_str()),
            ("LinkedIn", self.linkedin_url.as_str()),
            ("GitHub", self.github_url.as_str()),
        ]
        .into_iter()
        .filter(|(_, url)| !url.is_empty())
        .collect()
    }
}

impl std::fmt::Display for Cv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.full_name(), self.title)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub technologies: String,
    pub url: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

// ===== Input Payloads =====

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CvInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub title: String,
    pub bio: String,
    pub experience: String,
    pub education: String,
    pub portfolio_url: String,
    pub linkedin_url: String,
    pub github_url: String,
    pub skills: Vec<String>,
    pub projects: Option<Vec<ProjectInput>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectInput {
    pub title: String,
    pub description: String,
    pub technologies: String,
    pub url: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Partial update: absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CvPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub portfolio_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub skills: Option<Vec<String>>,
    pub projects: Option<Vec<ProjectInput>>,
}

impl From<&Project> for ProjectInput {
    fn from(project: &Project) -> Self {
        Self {
            title: project.title.clone(),
            description: project.description.clone(),
            technologies: project.technologies.clone(),
            url: project.url.clone(),
            start_date: project.start_date,
            end_date: project.end_date,
        }
    }
}

impl From<&Cv> for CvInput {
    fn from(cv: &Cv) -> Self {
        Self {
            first_name: cv.first_name.clone(),
            last_name: cv.last_name.clone(),
            email: cv.email.clone(),
            phone: cv.phone.clone(),
            location: cv.location.clone(),
            title: cv.title.clone(),
            bio: cv.bio.clone(),
            experience: cv.experience.clone(),
            education: cv.education.clone(),
            portfolio_url: cv.portfolio_url.clone(),
            linkedin_url: cv.linkedin_url.clone(),
            github_url: cv.github_url.clone(),
            skills: cv.skills.clone(),
            projects: Some(cv.projects.iter().map(ProjectInput::from).collect()),
        }
    }
}

impl CvPatch {
    /// Overlay this patch on `base`
    pub fn apply(self, mut base: CvInput) -> CvInput {
        macro_rules! overlay {
            ($($field:ident),+) => {
                $(if let Some(value) = self.$field { base.$field = value; })+
            };
        }
        overlay!(
            first_name,
            last_name,
            email,
            phone,
            location,
            title,
            bio,
            experience,
            education,
            portfolio_url,
            linkedin_url,
            github_url,
            skills
        );
        if self.projects.is_some() {
            base.projects = self.projects;
        }
        base
    }
}

impl CvInput {
    /// Trim text fields and de-duplicate skill names
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.first_name,
            &mut self.last_name,
            &mut self.email,
            &mut self.phone,
            &mut self.location,
            &mut self.title,
            &mut self.bio,
            &mut self.experience,
            &mut self.education,
            &mut self.portfolio_url,
            &mut self.linkedin_url,
            &mut self.github_url,
        ] {
            *field = field.trim().to_string();
        }

        let mut skills: Vec<String> = self
            .skills
            .iter()
            .map(|s| s.trim().to_string())
            .collect();
        skills.sort();
        skills.dedup();
        self.skills = skills;

        if let Some(projects) = self.projects.as_mut() {
            for project in projects.iter_mut() {
                project.title = project.title.trim().to_string();
                project.description = project.description.trim().to_string();
                project.technologies = project.technologies.trim().to_string();
                project.url = project.url.trim().to_string();
            }
        }

        self
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        required(&mut errors, "first_name", &self.first_name, MAX_NAME_LEN);
        required(&mut errors, "last_name", &self.last_name, MAX_NAME_LEN);
        required(&mut errors, "email", &self.email, MAX_EMAIL_LEN);
        required(&mut errors, "title", &self.title, MAX_TITLE_LEN);
        required(&mut errors, "bio", &self.bio, usize::MAX);
        required(&mut errors, "experience", &self.experience, usize::MAX);
        required(&mut errors, "education", &self.education, usize::MAX);
        max_length(&mut errors, "phone", &self.phone, MAX_PHONE_LEN);
        max_length(&mut errors, "location", &self.location, MAX_LOCATION_LEN);

        if !self.email.is_empty() && !is_valid_email(&self.email) {
            push(&mut errors, "email", "Invalid email format");
        }

        if !self.phone.is_empty() && !is_valid_phone(&self.phone) {
            push(&mut errors, "phone", "Invalid phone number format");
        }

        for (field, value) in [
            ("portfolio_url", &self.portfolio_url),
            ("linkedin_url", &self.linkedin_url),
            ("github_url", &self.github_url),
        ] {
            if !value.is_empty() && !is_valid_url(value) {
                push(&mut errors, field, INVALID_URL);
            }
        }

        for skill in &self.skills {
            if skill.is_empty() {
                push(&mut errors, "skills", "Skill names may not be blank.");
            } else if skill.chars().count() > MAX_SKILL_LEN {
                push(
                    &mut errors,
                    "skills",
                    &format!("Skill '{}' exceeds {} characters.", skill, MAX_SKILL_LEN),
                );
            }
        }

        if let Some(projects) = &self.projects {
            for (idx, project) in projects.iter().enumerate() {
                project.validate_into(&mut errors, idx);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl ProjectInput {
    fn validate_into(&self, errors: &mut FieldErrors, idx: usize) {
        let key = |field: &str| format!("projects[{}].{}", idx, field);

        required(errors, &key("title"), &self.title, MAX_TITLE_LEN);
        required(errors, &key("description"), &self.description, usize::MAX);
        required(
            errors,
            &key("technologies"),
            &self.technologies,
            MAX_TECHNOLOGIES_LEN,
        );

        if !self.url.is_empty() && !is_valid_url(&self.url) {
            push(errors, &key("url"), INVALID_URL);
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                push(errors, &key("end_date"), "End date must not precede start date.");
            }
        }
    }
}

fn push(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

fn required(errors: &mut FieldErrors, field: &str, value: &str, max_chars: usize) {
    if value.trim().is_empty() {
        push(errors, field, BLANK);
    } else {
        max_length(errors, field, value, max_chars);
    }
}

fn max_length(errors: &mut FieldErrors, field: &str, value: &str, max_chars: usize) {
    if value.chars().count() > max_chars {
        push(
            errors,
            field,
            &format!("Ensure this field has no more than {} characters.", max_chars),
        );
    }
}

pub fn is_valid_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// Digits only once `+`, `-` and spaces are removed
pub fn is_valid_phone(value: &str) -> bool {
    let digits: String = value
        .chars()
        .filter(|c| !matches!(c, '+' | '-' | ' '))
        .collect();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

pub fn is_valid_url(value: &str) -> bool {
    match reqwest::Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> CvInput {
        CvInput {
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            email: "john.doe@example.com".to_string(),
            phone: "+1234567890".to_string(),
            location: "New York, NY".to_string(),
            title: "Software Developer".to_string(),
            bio: "Experienced developer with passion for clean code".to_string(),
            experience: "5+ years of software development experience".to_string(),
            education: "Bachelor's in Computer Science".to_string(),
            portfolio_url: "https://johndoe.dev".to_string(),
            linkedin_url: "https://linkedin.com/in/johndoe".to_string(),
            github_url: "https://github.com/johndoe".to_string(),
            skills: vec!["Rust".to_string(), "SQL".to_string()],
            projects: None,
        }
    }

    #[test]
    fn test_valid_input_passes() {
        assert!(valid_input().validate().is_ok());
    }

    #[test]
    fn test_missing_required_fields() {
        let input = CvInput {
            first_name: "John".to_string(),
            ..Default::default()
        };
        let errors = input.validate().unwrap_err();
        for field in ["last_name", "email", "title", "bio", "experience", "education"] {
            assert!(errors.contains_key(field), "expected error for {}", field);
        }
        assert!(!errors.contains_key("first_name"));
        assert!(!errors.contains_key("phone"));
    }

    #[test]
    fn test_email_and_phone_rules() {
        let mut input = valid_input();
        input.email = "invalid-email".to_string();
        input.phone = "12ab34".to_string();
        let errors = input.validate().unwrap_err();
        assert_eq!(errors["email"], vec!["Invalid email format".to_string()]);
        assert_eq!(errors["phone"], vec!["Invalid phone number format".to_string()]);

        assert!(is_valid_phone("+41 79-123 45 67"));
        assert!(!is_valid_phone("+-"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@b@c"));
    }

    #[test]
    fn test_blank_phone_is_allowed() {
        let mut input = valid_input();
        input.phone = String::new();
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_url_and_length_rules() {
        let mut input = valid_input();
        input.github_url = "github.com/johndoe".to_string();
        input.portfolio_url = "ftp://johndoe.dev".to_string();
        input.first_name = "x".repeat(101);
        let errors = input.validate().unwrap_err();
        assert!(errors.contains_key("github_url"));
        assert!(errors.contains_key("portfolio_url"));
        assert!(errors["first_name"][0].contains("100"));
    }

    #[test]
    fn test_project_validation() {
        let mut input = valid_input();
        input.projects = Some(vec![ProjectInput {
            title: "CV site".to_string(),
            description: String::new(),
            technologies: "Rust".to_string(),
            url: String::new(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        }]);
        let errors = input.validate().unwrap_err();
        assert!(errors.contains_key("projects[0].description"));
        assert!(errors.contains_key("projects[0].end_date"));
    }

    #[test]
    fn test_normalized_trims_and_dedups() {
        let mut input = valid_input();
        input.first_name = "  John ".to_string();
        input.skills = vec![" SQL".to_string(), "Rust".to_string(), "SQL ".to_string()];
        let input = input.normalized();
        assert_eq!(input.first_name, "John");
        assert_eq!(input.skills, vec!["Rust".to_string(), "SQL".to_string()]);
    }

    #[test]
    fn test_patch_overlays_only_present_fields() {
        let base = valid_input();
        let patch = CvPatch {
            title: Some("Senior Software Developer".to_string()),
            skills: Some(vec![]),
            ..Default::default()
        };
        let merged = patch.apply(base.clone());
        assert_eq!(merged.title, "Senior Software Developer");
        assert!(merged.skills.is_empty());
        assert_eq!(merged.email, base.email);
        assert_eq!(merged.projects, None);
    }
}
