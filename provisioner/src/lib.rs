use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

pub mod api;
pub mod config;
pub mod errors;
pub mod graph;
pub mod metrics_defs;
pub mod provision;
#[cfg(test)]
mod testutils;

use api::AppState;
use config::{Config, Settings, ValidationError};
use graph::GraphClient;
use provision::Provisioner;

#[derive(thiserror::Error, Debug)]
pub enum ProvisionerRunError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ValidationError),
}

/// Builds the HTTP app from already loaded configuration.
pub fn build_app(config: &Config, settings: Settings) -> Router {
    let api_secret = settings.api_secret.clone();
    let graph = GraphClient::new(config.endpoints.clone(), Arc::new(settings));
    let provisioner = Provisioner::new(graph, config.polling.clone());

    api::router(AppState::new(provisioner, api_secret))
}

pub fn run(config: Config, settings: Settings) -> Result<(), ProvisionerRunError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(run_async(config, settings))
}

pub async fn run_async(config: Config, settings: Settings) -> Result<(), ProvisionerRunError> {
    config.validate()?;

    let app = build_app(&config, settings);

    let addr = format!("{}:{}", config.listener.host, config.listener.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Provisioner listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Provisioner stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        // Without a signal handler there is nothing to wait for; keep serving.
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::test_settings;

    #[tokio::test]
    async fn test_run_rejects_invalid_config() {
        let mut config = Config::default();
        config.listener.port = 0;

        let err = run_async(config, test_settings()).await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionerRunError::InvalidConfig(ValidationError::InvalidPort)
        ));
    }
}
