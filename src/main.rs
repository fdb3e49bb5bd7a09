mod config;
mod error;
mod input;
mod lightx;
mod models;
mod pipeline;
mod poller;
mod routes;
#[cfg(test)]
mod test_support;

use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Settings;
use crate::lightx::LightxClient;
use crate::pipeline::Pipeline;
use crate::poller::TokioSleeper;
use crate::routes::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let settings = Settings::from_env();
    tracing::info!(
        api_base = %settings.api_base,
        attempts = settings.poll.max_attempts,
        interval = ?settings.poll.interval,
        "Using LightX API"
    );

    let vendor = Arc::new(LightxClient::new(settings.api_base.clone()));
    let pipeline = Pipeline::new(vendor, Arc::new(TokioSleeper), settings.poll);
    let app = router(AppState { pipeline: Arc::new(pipeline) });

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("👋 Shutting down");
}
