pub mod app_config;
pub mod auth;
pub mod db;
pub mod error;
pub mod import;
pub mod ledger;
pub mod models;
pub mod money;
pub mod routes;
pub mod stats;

use std::path::Path;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::app_config::AppConfig;
use crate::routes::{create_router, AppState};

/// Logging goes through `RUST_LOG` when set, else the configured level.
pub fn init_logging(config: &AppConfig) {
    let _ = env_logger::Builder::new()
        .filter_level(config.log_filter())
        .parse_default_env()
        .try_init();
}

fn open_database(config: &AppConfig) -> anyhow::Result<db::Database> {
    let db_path = Path::new(&config.database.path);
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create database directory {:?}", dir))?;
    }
    log::info!("Database path: {:?}", db_path);

    match db::Database::new(&config.database.path) {
        Ok(database) => Ok(database),
        Err(e) => {
            let backups = db_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("backups");
            eprintln!("Database initialization failed: {}", e);
            eprintln!();
            eprintln!("This might be due to a failed migration or database corruption.");
            eprintln!();
            eprintln!("Your database backups are located at:");
            eprintln!("  {:?}", backups);
            eprintln!();
            eprintln!("Recovery steps:");
            eprintln!("  1. Stop the server");
            eprintln!("  2. Locate the most recent backup in the backups folder");
            eprintln!("  3. Replace {:?} with the backup", db_path);
            eprintln!("  4. Start the server again");
            Err(anyhow::anyhow!("Database initialization failed: {}", e))
        }
    }
}

/// Open the journal and serve the HTTP API until the process is stopped.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let database = open_database(&config)?;
    let addr = config.bind_address();
    let state = AppState::new(database, config);
    let app = create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    log::info!("Journal API listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
