mod app;
mod config;
mod errors;
mod external;
mod logging;
mod models;
mod routes;
mod services;
mod state;
mod store;

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::external::yahoo::YahooProvider;
use crate::logging::{init_logging, LoggingConfig};
use crate::services::background_service::DiscoveryService;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    init_logging(LoggingConfig::from_env())?;

    let config = AppConfig::from_env()?;
    let provider = Arc::new(YahooProvider::new(config.yahoo_base_url.clone()));

    // A service that cannot initialize leaves the HTTP surface up in degraded mode.
    let discovery = match DiscoveryService::new(&config, provider) {
        Ok(service) => {
            service.start();
            Some(Arc::new(service))
        }
        Err(e) => {
            tracing::error!("Failed to initialize discovery service: {}", e);
            None
        }
    };

    let state = AppState {
        discovery: discovery.clone(),
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Stock discovery service listening at http://{}/", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(service) = discovery {
        service.stop().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
