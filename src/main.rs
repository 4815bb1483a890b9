mod alerts;
mod analytics;
mod api;
mod bus;
mod config;
mod error;
mod geo;
mod models;
mod observability;
mod routing;
mod state;
mod store;
mod tracker;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::routing::OsrmClient;
use crate::store::journal::JsonJournal;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let journal = Arc::new(JsonJournal::new(&config.data_path));
    let routing = Arc::new(OsrmClient::new(&config.routing_url));
    let app_state = state::AppState::new(&config, journal, routing)?;
    let shared_state = Arc::new(app_state);

    tokio::spawn(tracker::run_retention_sweeper(shared_state.tracker.clone()));

    let app = api::rest::router(shared_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
