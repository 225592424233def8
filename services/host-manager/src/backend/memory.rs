//! In-process backend for development and tests.
//!
//! Models the master's maintenance primitives: machines listed in the
//! schedule are draining, `start_maintenance` takes scheduled machines down,
//! `stop_maintenance` brings down machines back up and drops them from the
//! schedule.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use super::{
    BackendError, DrainingMachine, MachineId, MaintenanceBackend, MaintenanceStatus, Schedule,
};
use crate::agents::AgentInfo;

/// A call received by [`InMemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    GetMaintenanceSchedule,
    UpdateMaintenanceSchedule(Schedule),
    StartMaintenance(Vec<MachineId>),
    StopMaintenance(Vec<MachineId>),
    GetMaintenanceStatus,
    GetAgents,
}

#[derive(Debug, Default)]
struct BackendState {
    agents: Vec<AgentInfo>,
    schedule: Schedule,
    down: BTreeSet<(String, String)>,
    calls: Vec<BackendCall>,
}

/// In-memory maintenance backend.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<BackendState>,

    /// Whether every call should fail.
    failing: AtomicBool,
}

fn key(machine: &MachineId) -> (String, String) {
    (machine.hostname.clone(), machine.ip.clone())
}

impl InMemoryBackend {
    /// Create an empty backend with no registered agents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend with the given registered agents.
    pub fn with_agents(agents: impl IntoIterator<Item = AgentInfo>) -> Self {
        let mut backend = Self::new();
        backend.state.get_mut().agents = agents.into_iter().collect();
        backend
    }

    /// Replace the registered agents.
    pub async fn set_agents(&self, agents: impl IntoIterator<Item = AgentInfo>) {
        self.state.lock().await.agents = agents.into_iter().collect();
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Calls received so far, oldest first.
    pub async fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().await.calls.clone()
    }

    /// Current schedule.
    pub async fn schedule(&self) -> Schedule {
        self.state.lock().await.schedule.clone()
    }

    async fn record(
        &self,
        call: BackendCall,
    ) -> Result<MutexGuard<'_, BackendState>, BackendError> {
        let mut state = self.state.lock().await;
        state.calls.push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(
                "in-memory backend configured to fail".to_string(),
            ));
        }
        Ok(state)
    }
}

#[async_trait]
impl MaintenanceBackend for InMemoryBackend {
    async fn get_maintenance_schedule(&self) -> Result<Schedule, BackendError> {
        let state = self.record(BackendCall::GetMaintenanceSchedule).await?;
        Ok(state.schedule.clone())
    }

    async fn update_maintenance_schedule(&self, schedule: &Schedule) -> Result<(), BackendError> {
        let mut state = self
            .record(BackendCall::UpdateMaintenanceSchedule(schedule.clone()))
            .await?;

        let scheduled: BTreeSet<_> = schedule.machine_ids().map(key).collect();
        if let Some(machine) = state.down.iter().find(|m| !scheduled.contains(*m)) {
            return Err(BackendError::Unavailable(format!(
                "machine {} is down and must stay scheduled",
                machine.0
            )));
        }

        info!(
            windows = schedule.windows.len(),
            machines = scheduled.len(),
            "[MOCK] Updated maintenance schedule"
        );
        state.schedule = schedule.clone();
        Ok(())
    }

    async fn start_maintenance(&self, machines: &[MachineId]) -> Result<(), BackendError> {
        let mut state = self
            .record(BackendCall::StartMaintenance(machines.to_vec()))
            .await?;

        let scheduled: BTreeSet<_> = state.schedule.machine_ids().map(key).collect();
        if let Some(machine) = machines.iter().find(|m| !scheduled.contains(&key(m))) {
            return Err(BackendError::Unavailable(format!(
                "machine {} is not scheduled for maintenance",
                machine.hostname
            )));
        }

        info!(machines = machines.len(), "[MOCK] Machines down");
        state.down.extend(machines.iter().map(key));
        Ok(())
    }

    async fn stop_maintenance(&self, machines: &[MachineId]) -> Result<(), BackendError> {
        let mut state = self
            .record(BackendCall::StopMaintenance(machines.to_vec()))
            .await?;

        if let Some(machine) = machines.iter().find(|m| !state.down.contains(&key(m))) {
            return Err(BackendError::Unavailable(format!(
                "machine {} is not down",
                machine.hostname
            )));
        }

        let stopped: BTreeSet<_> = machines.iter().map(key).collect();
        for machine in &stopped {
            state.down.remove(machine);
        }
        for window in &mut state.schedule.windows {
            window
                .machine_ids
                .retain(|machine| !stopped.contains(&key(machine)));
        }
        state
            .schedule
            .windows
            .retain(|window| !window.machine_ids.is_empty());

        info!(machines = machines.len(), "[MOCK] Machines up");
        Ok(())
    }

    async fn get_maintenance_status(&self) -> Result<MaintenanceStatus, BackendError> {
        let state = self.record(BackendCall::GetMaintenanceStatus).await?;

        let mut draining_machines = Vec::new();
        let mut down_machines = Vec::new();
        let mut seen = BTreeSet::new();
        for machine in state.schedule.machine_ids() {
            if !seen.insert(key(machine)) {
                continue;
            }
            if state.down.contains(&key(machine)) {
                down_machines.push(machine.clone());
            } else {
                draining_machines.push(DrainingMachine { id: machine.clone() });
            }
        }

        Ok(MaintenanceStatus {
            draining_machines,
            down_machines,
        })
    }

    async fn get_agents(&self) -> Result<Vec<AgentInfo>, BackendError> {
        let state = self.record(BackendCall::GetAgents).await?;
        Ok(state.agents.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Unavailability, Window};

    fn window(machines: &[(&str, &str)]) -> Window {
        Window {
            machine_ids: machines
                .iter()
                .map(|(hostname, ip)| MachineId::new(*hostname, *ip))
                .collect(),
            unavailability: Unavailability::starting_now(),
        }
    }

    #[tokio::test]
    async fn test_maintenance_primitives() {
        let backend = InMemoryBackend::new();
        let h1 = MachineId::new("h1", "10.0.0.1");
        let h2 = MachineId::new("h2", "10.0.0.2");

        backend
            .update_maintenance_schedule(&Schedule {
                windows: vec![window(&[("h1", "10.0.0.1"), ("h2", "10.0.0.2")])],
            })
            .await
            .unwrap();

        let status = backend.get_maintenance_status().await.unwrap();
        assert_eq!(status.draining_machines.len(), 2);
        assert!(status.down_machines.is_empty());

        backend.start_maintenance(&[h1.clone()]).await.unwrap();
        let status = backend.get_maintenance_status().await.unwrap();
        assert_eq!(status.draining_machines, vec![DrainingMachine { id: h2 }]);
        assert_eq!(status.down_machines, vec![h1.clone()]);

        backend.stop_maintenance(&[h1]).await.unwrap();
        let status = backend.get_maintenance_status().await.unwrap();
        assert_eq!(status.draining_machines.len(), 1);
        assert!(status.down_machines.is_empty());
        assert_eq!(backend.schedule().await.windows.len(), 1);
    }

    #[tokio::test]
    async fn test_start_requires_schedule() {
        let backend = InMemoryBackend::new();
        let err = backend
            .start_maintenance(&[MachineId::new("h1", "10.0.0.1")])
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_stop_requires_down() {
        let backend = InMemoryBackend::new();
        backend
            .update_maintenance_schedule(&Schedule {
                windows: vec![window(&[("h1", "10.0.0.1")])],
            })
            .await
            .unwrap();

        let err = backend
            .stop_maintenance(&[MachineId::new("h1", "10.0.0.1")])
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_failing_records_call() {
        let backend =
            InMemoryBackend::with_agents([AgentInfo::new("h1", "slave(1)@10.0.0.1:5051")]);
        backend.set_failing(true);

        assert!(backend.get_agents().await.is_err());
        assert_eq!(backend.calls().await, vec![BackendCall::GetAgents]);

        backend.set_failing(false);
        assert_eq!(backend.get_agents().await.unwrap().len(), 1);
    }
}
