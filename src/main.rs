//! Relay server binary.
//!
//! Wires the configured transformation provider into the HTTP surface and
//! serves it until interrupted.

use stretch_relay::adapters::build_provider;
use stretch_relay::adapters::http::{router, AppState};
use stretch_relay::config::RelayConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() {
    let config = RelayConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run(config).await {
        error!(error = %e, "relay server stopped");
        std::process::exit(1);
    }
}

async fn run(config: RelayConfig) -> Result<(), BoxError> {
    tokio::fs::create_dir_all(&config.staging_dir).await?;

    let provider = build_provider(&config)?;
    let state = AppState::new(&config, provider);
    if let Some(dir) = &state.media_dir {
        tokio::fs::create_dir_all(dir).await?;
    }
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.addr, config.port)).await?;
    info!(
        addr = %listener.local_addr()?,
        environment = %config.environment,
        provider = ?config.provider,
        max_upload_bytes = config.max_upload_bytes,
        "video stretch relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("relay server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
