//! Orchestration backend.
//!
//! The backend is the cluster master that actually drains machines and stops
//! sending offers for them. The host manager talks to it through
//! [`MaintenanceBackend`]:
//! - [`OperatorClient`]: JSON client for the master's operator API
//! - [`InMemoryBackend`]: in-process backend for development and tests
//!
//! Calls are plain request/response; retries belong to the callers above the
//! host manager.

mod memory;
mod operator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agents::AgentInfo;

pub use memory::{BackendCall, InMemoryBackend};
pub use operator::OperatorClient;

/// Errors from the orchestration backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request could not be sent or the response not read.
    #[error("operator request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("operator returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("failed to decode operator response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The backend refused the call.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Identifies a machine to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MachineId {
    pub hostname: String,
    pub ip: String,
}

impl MachineId {
    pub fn new(hostname: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ip: ip.into(),
        }
    }
}

/// Point in time, nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInfo {
    pub nanoseconds: i64,
}

/// Length of time in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationInfo {
    pub nanoseconds: i64,
}

/// When machines stop being available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unavailability {
    pub start: TimeInfo,

    /// `None` means the unavailability lasts until maintenance is stopped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationInfo>,
}

impl Unavailability {
    /// Open-ended unavailability starting now.
    pub fn starting_now() -> Self {
        let nanoseconds = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(i64::MAX);
        Self {
            start: TimeInfo { nanoseconds },
            duration: None,
        }
    }
}

/// A set of machines and the time they become unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub machine_ids: Vec<MachineId>,
    pub unavailability: Unavailability,
}

/// The backend's maintenance schedule; one document for the whole cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default)]
    pub windows: Vec<Window>,
}

impl Schedule {
    /// Every machine mentioned by any window.
    pub fn machine_ids(&self) -> impl Iterator<Item = &MachineId> {
        self.windows.iter().flat_map(|window| window.machine_ids.iter())
    }
}

/// A machine the backend is draining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainingMachine {
    pub id: MachineId,
}

/// Machines the backend considers draining or down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceStatus {
    #[serde(default)]
    pub draining_machines: Vec<DrainingMachine>,
    #[serde(default)]
    pub down_machines: Vec<MachineId>,
}

/// Maintenance operations of the orchestration backend.
#[async_trait]
pub trait MaintenanceBackend: Send + Sync {
    /// Fetch the current maintenance schedule.
    async fn get_maintenance_schedule(&self) -> Result<Schedule, BackendError>;

    /// Replace the maintenance schedule.
    async fn update_maintenance_schedule(&self, schedule: &Schedule) -> Result<(), BackendError>;

    /// Take drained machines down.
    async fn start_maintenance(&self, machines: &[MachineId]) -> Result<(), BackendError>;

    /// Bring machines back up and drop them from the schedule.
    async fn stop_maintenance(&self, machines: &[MachineId]) -> Result<(), BackendError>;

    /// Machines currently draining or down.
    async fn get_maintenance_status(&self) -> Result<MaintenanceStatus, BackendError>;

    /// Agents currently registered with the master.
    async fn get_agents(&self) -> Result<Vec<AgentInfo>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_ended_window_omits_duration() {
        let window = Window {
            machine_ids: vec![MachineId::new("h1", "10.0.0.1")],
            unavailability: Unavailability {
                start: TimeInfo { nanoseconds: 42 },
                duration: None,
            },
        };

        let json = serde_json::to_value(&window).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "machine_ids": [{ "hostname": "h1", "ip": "10.0.0.1" }],
                "unavailability": { "start": { "nanoseconds": 42 } }
            })
        );
    }

    #[test]
    fn test_starting_now_is_recent() {
        let before = chrono::Utc::now().timestamp_nanos_opt().unwrap();
        let unavailability = Unavailability::starting_now();
        assert!(unavailability.start.nanoseconds >= before);
        assert!(unavailability.duration.is_none());
    }
}
