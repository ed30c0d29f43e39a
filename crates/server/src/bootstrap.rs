use std::sync::Arc;

use sqlgate_agent::QueryEngine;
use sqlgate_core::config::{AppConfig, ConfigError, LoadOptions};
use sqlgate_db::ExecutionError;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub engine: Arc<QueryEngine>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("query engine setup failed: {0:#}")]
    Engine(#[source] anyhow::Error),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] ExecutionError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        table = %config.schema.table,
        slow_path = config.llm.enabled,
        "starting application bootstrap"
    );

    let engine = QueryEngine::from_config(&config).map_err(BootstrapError::Engine)?;
    engine.connect().await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection pool established"
    );

    Ok(Application { config, engine: Arc::new(engine) })
}
