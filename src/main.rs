use std::net::SocketAddr;

use airdrophunter_api::config::ApiConfig;
use airdrophunter_api::feed::spawn_auto_refresh;
use airdrophunter_api::http;
use airdrophunter_api::state::{AppState, Persistence};
use anyhow::{Context, Result};
use axum::Router;
use migration::MigratorTrait;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = ApiConfig::load().context("Failed to load configuration")?;
    let persistence = Persistence::connect(&config.database).await?;
    if let Some(database) = persistence.connection() {
        run_migrations(database).await?;
    }

    let app_state = AppState::new(&config, persistence);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let refresh_handle = match (
        app_state.cache.home_feed.clone(),
        config.cache.auto_refresh_interval(),
    ) {
        (Some(feed), Some(interval)) => Some(spawn_auto_refresh(feed, interval, shutdown_rx)),
        _ => None,
    };

    let listener = TcpListener::bind(config.server.address())
        .await
        .context("Failed to bind HTTP listener")?;
    let local_addr = listener
        .local_addr()
        .context("Failed to obtain listener address")?;
    info!("AirdropHunter API listening on {local_addr}");

    let router: Router = http::router(app_state);
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    );
    server
        .with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()))
        .await
        .context("HTTP server exited with error")?;

    shutdown_tx.send(true).ok();
    if let Some(handle) = refresh_handle {
        if let Err(join_err) = handle.await {
            error!("Feed refresh task join error: {join_err}");
        }
    }

    Ok(())
}

fn init_tracing() {
    let default_filter = "info";
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    assert!(!filter.is_empty(), "Tracing filter must not be empty");
    assert!(filter.len() < 256, "Tracing filter length exceeds bounds");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .compact()
        .init();
}

async fn run_migrations(database: &sea_orm::DatabaseConnection) -> Result<()> {
    migration::Migrator::up(database, None)
        .await
        .context("Database migrations failed")
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    shutdown_tx.send(true).ok();
    info!("Shutdown signal dispatched");
}
