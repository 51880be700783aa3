mod bootstrap;
mod documents;
mod health;
mod principal;
pub mod api;

use std::future::IntoFuture;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use claimflow_core::config::{AppConfig, LoadOptions};
use tokio::net::TcpListener;

fn init_logging(config: &AppConfig) {
    use claimflow_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config).await?;

    let router = api::router(app.db_pool.clone(), &app.config.uploads.dir)
        .merge(health::router(app.db_pool.clone()));

    let address =
        format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        address = %address,
        "claimflow-server listening"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    serve_until_shutdown(listener, router, grace).await?;

    tracing::info!(event_name = "system.server.stopped", "claimflow-server stopped");
    Ok(())
}

/// Runs the server until Ctrl-C, then lets in-flight requests drain for at
/// most the configured grace period.
async fn serve_until_shutdown(
    listener: TcpListener,
    router: Router,
    grace: Duration,
) -> Result<()> {
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let mut drain_rx = shutdown_rx.clone();
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = drain_rx.changed().await;
    });
    let mut server = std::pin::pin!(server.into_future());

    tokio::select! {
        result = server.as_mut() => result?,
        _ = shutdown_rx.changed() => {
            tracing::info!(
                event_name = "system.server.stopping",
                grace_secs = grace.as_secs(),
                "shutdown signal received, draining connections"
            );
            match tokio::time::timeout(grace, server).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!(
                        event_name = "system.server.drain_timeout",
                        "open connections did not drain within the shutdown grace period"
                    );
                }
            }
        }
    }

    Ok(())
}
