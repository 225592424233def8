//! Host maintenance lifecycle and host queries.
//!
//! [`HostService`] moves hosts through `Up -> Draining -> Down -> Up`:
//!
//! - `start_maintenance` posts an open-ended maintenance window for the hosts
//!   and marks them DRAINING, then notifies the maintenance queue.
//! - `mark_hosts_drained` takes DRAINING hosts down once their work is gone.
//! - `complete_maintenance` brings DOWN hosts back up.
//!
//! Every batch is validated before the backend is called; a batch that fails
//! validation has no side effects. The registry is only written after the
//! backend accepted the change.
//!
//! Transitions and [`HostService::reload_from_backend`] run one at a time
//! under a lifecycle lock held from validation through the registry write.
//! Queries do not take it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use berth_constraints::{Constraint, ConstraintError};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::agents::{AgentMap, AgentMapCache, InvalidAgentPid};
use crate::backend::{
    BackendError, MachineId, MaintenanceBackend, Unavailability, Window,
};
use crate::eligibility::{self, Candidate};
use crate::host::{HostInfo, HostState};
use crate::queue::{MaintenanceQueue, QueueError};
use crate::registry::{MaintenanceHostInfoMap, RegistryError};

/// Errors from host lifecycle operations.
#[derive(Debug, Error)]
pub enum HostServiceError {
    #[error("no hostnames given")]
    EmptyRequest,

    #[error("unknown host {hostname}")]
    UnknownHost { hostname: String },

    #[error("host {hostname} is not DOWN")]
    HostNotDown { hostname: String },

    #[error("host {hostname} is not DRAINING")]
    HostNotDraining { hostname: String },

    #[error(transparent)]
    InvalidAgentPid(#[from] InvalidAgentPid),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The hosts are DRAINING but the maintenance queue was not told.
    #[error("hosts {hostnames:?} are draining but could not be enqueued for rescheduling: {source}")]
    Notification {
        hostnames: Vec<String>,
        #[source]
        source: QueueError,
    },

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Constraint(#[from] ConstraintError),
}

impl HostServiceError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyRequest => "empty_request",
            Self::UnknownHost { .. } => "unknown_host",
            Self::HostNotDown { .. } => "host_not_down",
            Self::HostNotDraining { .. } => "host_not_draining",
            Self::InvalidAgentPid(_) => "invalid_agent_pid",
            Self::Backend(_) => "backend_error",
            Self::Notification { .. } => "maintenance_notification_failed",
            Self::Queue(_) => "maintenance_queue_error",
            Self::Registry(_) => "invalid_host_state",
            Self::Constraint(err) => err.code(),
        }
    }

    /// Whether the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

/// Drops repeated hostnames, keeping first occurrences in order.
fn dedup_hostnames(hostnames: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    hostnames
        .iter()
        .filter(|hostname| seen.insert(hostname.as_str()))
        .cloned()
        .collect()
}

fn machine_id(info: &HostInfo) -> MachineId {
    MachineId::new(info.hostname.clone(), info.ip.clone())
}

/// Host maintenance lifecycle manager.
pub struct HostService {
    registry: Arc<MaintenanceHostInfoMap>,
    agents: Arc<AgentMapCache>,
    backend: Arc<dyn MaintenanceBackend>,
    queue: Arc<dyn MaintenanceQueue>,
    lifecycle: Mutex<()>,
}

impl HostService {
    pub fn new(
        registry: Arc<MaintenanceHostInfoMap>,
        agents: Arc<AgentMapCache>,
        backend: Arc<dyn MaintenanceBackend>,
        queue: Arc<dyn MaintenanceQueue>,
    ) -> Self {
        Self {
            registry,
            agents,
            backend,
            queue,
            lifecycle: Mutex::new(()),
        }
    }

    /// Hosts in the requested states; no states means every state.
    ///
    /// UP hosts are the registered agents minus every host in maintenance,
    /// since the agent snapshot may lag behind the registry.
    #[instrument(skip(self))]
    pub async fn query_hosts(
        &self,
        states: &[HostState],
    ) -> Result<Vec<HostInfo>, HostServiceError> {
        let requested: HashSet<HostState> = if states.is_empty() {
            HostState::ALL.into_iter().collect()
        } else {
            states.iter().copied().collect()
        };

        let snapshot = self.registry.snapshot().await;
        let mut hosts = Vec::new();

        for state in HostState::ALL {
            if !requested.contains(&state) {
                continue;
            }
            match state {
                HostState::Up => {
                    let in_maintenance = snapshot.hostnames();
                    let mut up = Vec::new();
                    if let Some(agents) = self.agents.get().await {
                        for agent in agents.iter() {
                            if in_maintenance.contains(agent.hostname.as_str()) {
                                continue;
                            }
                            up.push(HostInfo::new(
                                agent.hostname.clone(),
                                agent.ip()?,
                                HostState::Up,
                            ));
                        }
                    }
                    up.sort_by(|a, b| a.hostname.cmp(&b.hostname));
                    hosts.extend(up);
                }
                HostState::Draining => hosts.extend(snapshot.draining.iter().cloned()),
                HostState::Down => hosts.extend(snapshot.down.iter().cloned()),
            }
        }

        Ok(hosts)
    }

    /// Put UP hosts into maintenance; they become DRAINING.
    ///
    /// Every host must be a registered agent. A failed queue notification is
    /// reported as [`HostServiceError::Notification`] but the hosts stay
    /// DRAINING.
    #[instrument(skip(self))]
    pub async fn start_maintenance(
        &self,
        hostnames: &[String],
    ) -> Result<Vec<HostInfo>, HostServiceError> {
        let hostnames = dedup_hostnames(hostnames);
        if hostnames.is_empty() {
            return Err(HostServiceError::EmptyRequest);
        }

        let lifecycle = self.lifecycle.lock().await;

        let agents = self.agents.get().await.unwrap_or_default();
        let mut infos = Vec::with_capacity(hostnames.len());
        for hostname in &hostnames {
            let agent = agents
                .get(hostname)
                .ok_or_else(|| HostServiceError::UnknownHost {
                    hostname: hostname.clone(),
                })?;
            infos.push(HostInfo::new(
                hostname.clone(),
                agent.ip()?,
                HostState::Draining,
            ));
        }

        let mut schedule = self.backend.get_maintenance_schedule().await?;
        schedule.windows.push(Window {
            machine_ids: infos.iter().map(machine_id).collect(),
            unavailability: Unavailability::starting_now(),
        });
        self.backend.update_maintenance_schedule(&schedule).await?;

        self.registry.add_host_infos(infos.clone()).await;
        drop(lifecycle);
        info!(hostnames = ?hostnames, "Hosts draining");

        if let Err(source) = self.queue.enqueue(&hostnames).await {
            warn!(hostnames = ?hostnames, error = %source, "Failed to enqueue draining hosts");
            return Err(HostServiceError::Notification { hostnames, source });
        }

        Ok(infos)
    }

    /// Take DRAINING hosts down once their work has been moved off.
    #[instrument(skip(self))]
    pub async fn mark_hosts_drained(
        &self,
        hostnames: &[String],
    ) -> Result<Vec<HostInfo>, HostServiceError> {
        let hostnames = dedup_hostnames(hostnames);
        if hostnames.is_empty() {
            return Err(HostServiceError::EmptyRequest);
        }

        let _lifecycle = self.lifecycle.lock().await;

        let draining: HashMap<String, HostInfo> = self
            .registry
            .draining_host_infos(&hostnames)
            .await
            .into_iter()
            .map(|info| (info.hostname.clone(), info))
            .collect();

        let mut machines = Vec::with_capacity(hostnames.len());
        for hostname in &hostnames {
            let info = draining
                .get(hostname)
                .ok_or_else(|| HostServiceError::HostNotDraining {
                    hostname: hostname.clone(),
                })?;
            machines.push(machine_id(info));
        }

        self.backend.start_maintenance(&machines).await?;
        self.registry
            .transition_hosts(&hostnames, HostState::Draining, HostState::Down)
            .await?;
        info!(hostnames = ?hostnames, "Hosts down");

        Ok(machines
            .into_iter()
            .map(|machine| HostInfo::new(machine.hostname, machine.ip, HostState::Down))
            .collect())
    }

    /// Bring DOWN hosts back up.
    ///
    /// Machine ids come from the registry entries, since a DOWN host may no
    /// longer be registered as an agent.
    #[instrument(skip(self))]
    pub async fn complete_maintenance(
        &self,
        hostnames: &[String],
    ) -> Result<Vec<String>, HostServiceError> {
        let hostnames = dedup_hostnames(hostnames);
        if hostnames.is_empty() {
            return Err(HostServiceError::EmptyRequest);
        }

        let _lifecycle = self.lifecycle.lock().await;

        let down: HashMap<String, HostInfo> = self
            .registry
            .down_host_infos(&hostnames)
            .await
            .into_iter()
            .map(|info| (info.hostname.clone(), info))
            .collect();

        let mut machines = Vec::with_capacity(hostnames.len());
        for hostname in &hostnames {
            let info = down
                .get(hostname)
                .ok_or_else(|| HostServiceError::HostNotDown {
                    hostname: hostname.clone(),
                })?;
            machines.push(machine_id(info));
        }

        self.backend.stop_maintenance(&machines).await?;
        self.registry.remove_host_infos(&hostnames).await;
        info!(hostnames = ?hostnames, "Hosts up");

        Ok(hostnames)
    }

    /// Hosts that started draining, in the order they were enqueued.
    ///
    /// Waits up to `timeout` for the first host, then takes whatever else is
    /// queued without waiting, up to `limit` hosts in total.
    #[instrument(skip(self))]
    pub async fn get_draining_hosts(
        &self,
        limit: usize,
        timeout: Duration,
    ) -> Result<Vec<String>, HostServiceError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let first = match self.queue.dequeue(timeout).await {
            Ok(hostname) => hostname,
            Err(QueueError::Timeout) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut hostnames = vec![first];
        while hostnames.len() < limit {
            match self.queue.try_dequeue().await {
                Some(hostname) => hostnames.push(hostname),
                None => break,
            }
        }

        Ok(hostnames)
    }

    /// Rebuild the registry from the backend's maintenance status.
    ///
    /// A machine reported both draining and down is recorded as down.
    #[instrument(skip(self))]
    pub async fn reload_from_backend(&self) -> Result<usize, HostServiceError> {
        let _lifecycle = self.lifecycle.lock().await;

        let status = self.backend.get_maintenance_status().await?;

        let mut hosts: HashMap<String, HostInfo> = HashMap::new();
        for machine in status.draining_machines {
            let info = HostInfo::new(machine.id.hostname, machine.id.ip, HostState::Draining);
            hosts.insert(info.hostname.clone(), info);
        }
        for machine in status.down_machines {
            let info = HostInfo::new(machine.hostname, machine.ip, HostState::Down);
            hosts.insert(info.hostname.clone(), info);
        }

        let count = hosts.len();
        self.registry.clear_and_fill(hosts.into_values().collect()).await;
        info!(hosts = count, "Reloaded maintenance state");

        Ok(count)
    }

    /// Replace the agent snapshot with the backend's registered agents.
    #[instrument(skip(self))]
    pub async fn refresh_agents(&self) -> Result<usize, HostServiceError> {
        let agents = AgentMap::new(self.backend.get_agents().await?);
        let count = agents.len();
        self.agents.replace(agents).await;
        Ok(count)
    }

    /// Whether an agent snapshot has been loaded.
    pub async fn agents_loaded(&self) -> bool {
        self.agents.is_loaded().await
    }

    /// Candidates the task may be placed on.
    #[instrument(skip(self, constraint, candidates), fields(candidates = candidates.len()))]
    pub async fn eligible_hosts(
        &self,
        constraint: Option<&Constraint>,
        candidates: &[Candidate],
    ) -> Result<Vec<String>, HostServiceError> {
        let maintenance = self.registry.snapshot().await;
        Ok(eligibility::filter_eligible(
            &maintenance,
            constraint,
            candidates,
        )?)
    }
}
