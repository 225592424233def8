//! berth host manager
//!
//! Serves host availability queries, drives host maintenance through the
//! cluster master's operator API and filters placement candidates.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use berth_host_manager::{
    agents::AgentMapCache,
    api,
    backend::{InMemoryBackend, MaintenanceBackend, OperatorClient},
    config::Config,
    queue::InMemoryMaintenanceQueue,
    registry::MaintenanceHostInfoMap,
    state::AppState,
    sync::HostSyncWorker,
    HostService,
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Prefer RUST_LOG, fall back to BERTH_LOG_LEVEL
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting berth host manager");
    info!(listen_addr = %config.listen_addr, "Configuration loaded");

    let backend: Arc<dyn MaintenanceBackend> = match &config.operator_url {
        Some(url) => {
            info!(operator_url = %url, "Using operator API backend");
            Arc::new(
                OperatorClient::new(url, config.operator_timeout)
                    .context("failed to build operator client")?,
            )
        }
        None => {
            warn!(
                agents = config.dev_agents.len(),
                "No BERTH_OPERATOR_URL set, using in-memory backend (dev mode)"
            );
            Arc::new(InMemoryBackend::with_agents(config.dev_agents.clone()))
        }
    };

    let service = Arc::new(HostService::new(
        Arc::new(MaintenanceHostInfoMap::new()),
        Arc::new(AgentMapCache::new()),
        backend,
        Arc::new(InMemoryMaintenanceQueue::new(
            config.maintenance_queue_capacity,
        )),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sync_worker = HostSyncWorker::new(
        Arc::clone(&service),
        config.agent_sync_interval,
        config.reload_maintenance_state,
    );
    let sync_handle = tokio::spawn({
        let shutdown_rx = shutdown_rx.clone();
        async move {
            sync_worker.run(shutdown_rx).await;
        }
    });

    let app = api::create_router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "Listening for connections");

    let mut server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut shutdown_rx = shutdown_rx;
                while !*shutdown_rx.borrow() {
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
    });

    let mut server_done = false;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = &mut server_handle => {
            server_done = true;
            match result {
                Ok(Ok(())) => info!("Server exited normally"),
                Ok(Err(e)) => error!(error = %e, "Server error"),
                Err(e) => error!(error = %e, "Server task panicked"),
            }
        }
    }

    let _ = shutdown_tx.send(true);

    info!("Waiting for workers to shut down...");
    let shutdown_timeout = Duration::from_secs(10);

    if !server_done && tokio::time::timeout(shutdown_timeout, server_handle).await.is_err() {
        warn!("HTTP server did not shut down in time");
    }

    if tokio::time::timeout(shutdown_timeout, sync_handle).await.is_err() {
        warn!("Host sync worker did not shut down in time");
    }

    info!("Host manager shutdown complete");
    Ok(())
}
