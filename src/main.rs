use anyhow::Result;
use cv_manager::app_log;
use cv_manager::logging::init_tracing;
use cv_manager::{core::ConfigManager, start_web_server};

#[rocket::main]
async fn main() -> Result<()> {
    // Loaded first: it names the log file
    let config = ConfigManager::load()?;
    init_tracing(config.paths.log_file.as_deref())?;

    app_log!(info, "Starting CV Desk API Server");
    app_log!(info, "Environment: {}", config.environment);
    app_log!(info, "Output: {}", config.paths.output_path.display());
    app_log!(info, "Outbox: {}", config.paths.outbox_path.display());
    app_log!(
        info,
        "Server: http://{}:{}",
        config.server.address,
        config.server.port
    );

    start_web_server(config).await
}
