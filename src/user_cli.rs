// src/user_cli.rs
use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

use crate::app_log;
use crate::auth::{AuthConfig, Principal};
use crate::core::{ConfigManager, Database, UserRepository};

#[derive(Parser)]
#[command(name = "user-manager")]
#[command(about = "Manage users of the CV service")]
pub struct UserCli {
    #[command(subcommand)]
    pub command: UserCommand,

    /// Defaults to the configured database path
    #[arg(long)]
    pub database_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Initialize the database
    Init,
    /// Add a new user
    Add {
        username: String,
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        staff: bool,
    },
    /// Delete a user; their request log rows are kept without a user
    Remove { username: String },
    /// Block a user from authenticating
    Deactivate { username: String },
    /// List all users
    List,
    /// Print a bearer token for a user
    Token { username: String },
    /// Import users from a CSV file (username,email,password,is_staff)
    Import { csv_file: PathBuf },
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct UserRow {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default, deserialize_with = "flag")]
    pub is_staff: bool,
}

fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    ))
}

/// Parse the import file; bad rows come back as messages
pub fn parse_user_csv(content: &str) -> Vec<std::result::Result<UserRow, String>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    reader
        .deserialize::<UserRow>()
        .map(|result| match result {
            Ok(row) if row.username.is_empty() || row.password.is_empty() => {
                Err(format!("missing username or password for '{}'", row.email))
            }
            Ok(row) => Ok(row),
            Err(e) => Err(e.to_string()),
        })
        .collect()
}

pub async fn handle_user_command(cli: UserCli) -> Result<()> {
    let config = ConfigManager::load()?;
    let database_path = cli
        .database_path
        .clone()
        .unwrap_or_else(|| config.paths.database_path.clone());

    let database = Database::new(&database_path).await?;
    let users = UserRepository::new(database.pool());

    match cli.command {
        UserCommand::Init => {
            app_log!(info, "✅ Database initialized at: {}", database_path.display());
            app_log!(info, "   Tables created: users, cvs, skills, projects, request_logs");
        }

        UserCommand::Add {
            username,
            email,
            password,
            staff,
        } => match users.create(&username, &email, &password, staff).await {
            Ok(user) => {
                app_log!(info, "✅ User created: {} (id {}, staff: {})", user.username, user.id, user.is_staff);
            }
            Err(e) if e.to_string().contains("UNIQUE constraint failed") => {
                app_log!(info, "❌ Error: username '{}' already exists", username);
            }
            Err(e) => {
                app_log!(error, "Failed to create user: {}", e);
            }
        },

        UserCommand::Remove { username } => match users.delete(&username).await? {
            true => app_log!(info, "✅ User removed: {}", username),
            false => app_log!(info, "❌ No user named: {}", username),
        },

        UserCommand::Deactivate { username } => match users.deactivate(&username).await? {
            true => app_log!(info, "✅ User deactivated: {}", username),
            false => app_log!(info, "❌ No user named: {}", username),
        },

        UserCommand::List => {
            let all = users.list().await?;
            if all.is_empty() {
                app_log!(info, "No users found.");
            } else {
                app_log!(
                    info,
                    "{:<5} {:<20} {:<30} {:<7} {:<7} {:<20}",
                    "ID", "Username", "Email", "Active", "Staff", "Created"
                );
                app_log!(info, "{}", "-".repeat(90));
                for user in all {
                    app_log!(
                        info,
                        "{:<5} {:<20} {:<30} {:<7} {:<7} {:<20}",
                        user.id,
                        user.username,
                        user.email,
                        user.is_active,
                        user.is_staff,
                        user.created_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }

        UserCommand::Token { username } => match users.find_by_username(&username).await? {
            Some(user) if user.is_active => {
                let auth = AuthConfig::from_settings(&config.auth);
                let token = auth.issue_token(&Principal::from(&user))?;
                println!("{}", token);
            }
            Some(_) => app_log!(info, "❌ User is deactivated: {}", username),
            None => app_log!(info, "❌ No user named: {}", username),
        },

        UserCommand::Import { csv_file } => {
            if !csv_file.exists() {
                app_log!(info, "❌ CSV file not found: {}", csv_file.display());
                return Ok(());
            }

            let content = tokio::fs::read_to_string(&csv_file).await?;
            let mut success_count = 0;
            let mut error_count = 0;

            for row in parse_user_csv(&content) {
                let row = match row {
                    Ok(row) => row,
                    Err(e) => {
                        error_count += 1;
                        app_log!(info, "⚠️  Skipping row: {}", e);
                        continue;
                    }
                };

                match users
                    .create(&row.username, &row.email, &row.password, row.is_staff)
                    .await
                {
                    Ok(_) => {
                        success_count += 1;
                        app_log!(info, "✅ Added: {}", row.username);
                    }
                    Err(e) => {
                        error_count += 1;
                        if e.to_string().contains("UNIQUE constraint failed") {
                            app_log!(info, "⚠️  Skipped (already exists): {}", row.username);
                        } else {
                            app_log!(info, "❌ Failed to add {}: {}", row.username, e);
                        }
                    }
                }
            }

            app_log!(info, "Import completed:");
            app_log!(info, "  ✅ Success: {}", success_count);
            app_log!(info, "  ❌ Errors:  {}", error_count);
        }
    }

    Ok(())
}
