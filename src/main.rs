use anyhow::{Context, Result};
use minetrack::api::{create_servers_router, ServersAppState};
use minetrack::config::MinetrackConfig;
use minetrack::probe::{KindProber, TcpProber};
use minetrack::refresh::{run_background_refresh, RefreshCoordinator};
use minetrack::registry::EntityRegistry;
use minetrack::snapshot::SnapshotReader;
use minetrack::status::StatusStore;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "minetrack=info".into()),
        )
        .init();

    info!("Minetrack starting...");

    let config = MinetrackConfig::from_env().context("Failed to load configuration")?;

    info!(
        bind = %config.http.bind,
        servers = config.servers.len(),
        max_age_ms = config.refresh.max_age_ms,
        probe_timeout_ms = config.refresh.probe_timeout_ms,
        "Configuration loaded"
    );

    let registry = Arc::new(
        EntityRegistry::new(config.entities()).context("Invalid server configuration")?,
    );

    let store = Arc::new(StatusStore::new(config.refresh.history_len));
    store
        .initialize(registry.list())
        .context("Failed to initialize status store")?;

    let prober = Arc::new(KindProber::new(Arc::new(TcpProber::new())));
    let coordinator = Arc::new(RefreshCoordinator::new(
        Arc::clone(&registry),
        Arc::clone(&store),
        prober,
        config.refresh.probe_timeout(),
    ));

    let background = tokio::spawn(run_background_refresh(
        Arc::clone(&coordinator),
        config.refresh.background_interval(),
        config.refresh.max_age(),
    ));

    let state = Arc::new(ServersAppState {
        registry,
        coordinator,
        reader: SnapshotReader::new(store),
        max_age: config.refresh.max_age(),
    });
    let router = create_servers_router(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.http.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.http.bind))?;
    info!(bind = %config.http.bind, "HTTP API listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    background.abort();
    info!("Minetrack stopped");

    Ok(())
}
