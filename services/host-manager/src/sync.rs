//! Background refresh of agent and maintenance state.
//!
//! Keeps the agent snapshot current and, when enabled, rebuilds the
//! maintenance registry from the backend so the process recovers its state
//! after a restart.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use crate::service::{HostService, HostServiceError};

/// Worker that periodically syncs host state from the backend.
pub struct HostSyncWorker {
    service: Arc<HostService>,
    interval: Duration,
    reload_maintenance_state: bool,
}

impl HostSyncWorker {
    pub fn new(
        service: Arc<HostService>,
        interval: Duration,
        reload_maintenance_state: bool,
    ) -> Self {
        Self {
            service,
            interval,
            reload_maintenance_state,
        }
    }

    /// Run until shutdown is signaled. Syncs once right away.
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            reload_maintenance_state = self.reload_maintenance_state,
            "Starting host sync worker"
        );

        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.sync_once().await {
                        error!(error = %e, "Host sync failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Host sync worker shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Run a single sync pass.
    pub async fn sync_once(&self) -> Result<(), HostServiceError> {
        let agents = self.service.refresh_agents().await?;
        debug!(agents, "Refreshed agent snapshot");

        if self.reload_maintenance_state {
            self.service.reload_from_backend().await?;
        }

        Ok(())
    }
}
