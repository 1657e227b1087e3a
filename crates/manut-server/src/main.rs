//! Manut Server — authorization core entry point.

mod bootstrap;
mod config;

use manut_authz::{AuthorizationEvaluator, GrantStore, PermissionCatalog};
use manut_core::error::ManutError;
use manut_db::repository::{
    SurrealAuditLogRepository, SurrealGrantRepository, SurrealPermissionRepository,
};
use manut_db::{DbError, DbManager};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error(transparent)]
    Manut(#[from] ManutError),

    #[error("signal handling error: {0}")]
    Signal(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("manut=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();

    info!("Starting manut server...");

    if let Err(e) = run().await {
        error!(error = %e, "manut server failed");
        std::process::exit(1);
    }

    info!("manut server stopped.");
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::load()?;

    let manager = DbManager::connect(&config.db).await?;
    let db = manager.client().clone();
    manut_db::run_migrations(&db).await?;

    let store = GrantStore::new(
        PermissionCatalog::new(SurrealPermissionRepository::new(db.clone())),
        SurrealGrantRepository::new(db.clone()),
        SurrealAuditLogRepository::new(db.clone()),
        config.authz.clone(),
    );
    bootstrap::provision(&store, &config.bootstrap.administrators).await?;

    let evaluator = AuthorizationEvaluator::new(store);
    let modules = evaluator.store().catalog().list_modules().await?;
    info!(modules = modules.len(), "authorization core ready");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    Ok(())
}
