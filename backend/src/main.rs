use std::path::PathBuf;

use anyhow::Context;
use finance_tracker_backend::config::AppConfig;
use finance_tracker_backend::logging;
use finance_tracker_backend::storage::DbConnection;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    logging::init(&config.logging);
    info!(config = ?config_path, "Setting up database");

    let db = DbConnection::connect(&config.database)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.name))?;
    info!(database = %config.database.name, "Database schema is ready");

    db.close().await;
    Ok(())
}
