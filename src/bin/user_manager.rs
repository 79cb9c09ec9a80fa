use anyhow::Result;
use clap::Parser;
use cv_manager::logging::init_tracing;
use cv_manager::user_cli::{handle_user_command, UserCli};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(None)?;
    handle_user_command(UserCli::parse()).await
}
