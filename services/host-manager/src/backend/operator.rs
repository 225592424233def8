//! Client for the master's operator API.
//!
//! Every call is a `POST {base}/api/v1` with a JSON body tagged by call type,
//! e.g. `{"type": "GET_MAINTENANCE_SCHEDULE"}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{BackendError, MachineId, MaintenanceBackend, MaintenanceStatus, Schedule};
use crate::agents::AgentInfo;

/// Operator API client.
pub struct OperatorClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OperatorClient {
    /// Create a new operator client for the master at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/v1", base_url.trim_end_matches('/')),
        })
    }

    async fn call(&self, call: &Call<'_>) -> Result<reqwest::Response, BackendError> {
        debug!(endpoint = %self.endpoint, call = call.name(), "Calling operator API");

        let response = self.client.post(&self.endpoint).json(call).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, call = call.name(), "Operator call failed");
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn call_json<T: DeserializeOwned>(&self, call: &Call<'_>) -> Result<T, BackendError> {
        let bytes = self.call(call).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl MaintenanceBackend for OperatorClient {
    async fn get_maintenance_schedule(&self) -> Result<Schedule, BackendError> {
        let response: GetMaintenanceScheduleResponse =
            self.call_json(&Call::GetMaintenanceSchedule).await?;
        Ok(response.get_maintenance_schedule.schedule)
    }

    async fn update_maintenance_schedule(&self, schedule: &Schedule) -> Result<(), BackendError> {
        self.call(&Call::UpdateMaintenanceSchedule {
            update_maintenance_schedule: ScheduleBody { schedule },
        })
        .await?;
        Ok(())
    }

    async fn start_maintenance(&self, machines: &[MachineId]) -> Result<(), BackendError> {
        self.call(&Call::StartMaintenance {
            start_maintenance: MachinesBody { machines },
        })
        .await?;
        Ok(())
    }

    async fn stop_maintenance(&self, machines: &[MachineId]) -> Result<(), BackendError> {
        self.call(&Call::StopMaintenance {
            stop_maintenance: MachinesBody { machines },
        })
        .await?;
        Ok(())
    }

    async fn get_maintenance_status(&self) -> Result<MaintenanceStatus, BackendError> {
        let response: GetMaintenanceStatusResponse =
            self.call_json(&Call::GetMaintenanceStatus).await?;
        Ok(response.get_maintenance_status.status)
    }

    async fn get_agents(&self) -> Result<Vec<AgentInfo>, BackendError> {
        let response: GetAgentsResponse = self.call_json(&Call::GetAgents).await?;
        Ok(response
            .get_agents
            .agents
            .into_iter()
            .map(|agent| AgentInfo::new(agent.agent_info.hostname, agent.pid))
            .collect())
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
enum Call<'a> {
    GetMaintenanceSchedule,
    UpdateMaintenanceSchedule {
        update_maintenance_schedule: ScheduleBody<'a>,
    },
    StartMaintenance {
        start_maintenance: MachinesBody<'a>,
    },
    StopMaintenance {
        stop_maintenance: MachinesBody<'a>,
    },
    GetMaintenanceStatus,
    GetAgents,
}

impl Call<'_> {
    fn name(&self) -> &'static str {
        match self {
            Call::GetMaintenanceSchedule => "GET_MAINTENANCE_SCHEDULE",
            Call::UpdateMaintenanceSchedule { .. } => "UPDATE_MAINTENANCE_SCHEDULE",
            Call::StartMaintenance { .. } => "START_MAINTENANCE",
            Call::StopMaintenance { .. } => "STOP_MAINTENANCE",
            Call::GetMaintenanceStatus => "GET_MAINTENANCE_STATUS",
            Call::GetAgents => "GET_AGENTS",
        }
    }
}

#[derive(Debug, Serialize)]
struct ScheduleBody<'a> {
    schedule: &'a Schedule,
}

#[derive(Debug, Serialize)]
struct MachinesBody<'a> {
    machines: &'a [MachineId],
}

#[derive(Debug, Deserialize)]
struct GetMaintenanceScheduleResponse {
    get_maintenance_schedule: ScheduleEnvelope,
}

#[derive(Debug, Deserialize)]
struct ScheduleEnvelope {
    #[serde(default)]
    schedule: Schedule,
}

#[derive(Debug, Deserialize)]
struct GetMaintenanceStatusResponse {
    get_maintenance_status: StatusEnvelope,
}

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    #[serde(default)]
    status: MaintenanceStatus,
}

#[derive(Debug, Deserialize)]
struct GetAgentsResponse {
    get_agents: AgentsEnvelope,
}

#[derive(Debug, Deserialize)]
struct AgentsEnvelope {
    #[serde(default)]
    agents: Vec<RegisteredAgent>,
}

#[derive(Debug, Deserialize)]
struct RegisteredAgent {
    agent_info: RegisteredAgentInfo,
    pid: String,
}

#[derive(Debug, Deserialize)]
struct RegisteredAgentInfo {
    hostname: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::backend::{TimeInfo, Unavailability, Window};

    fn client(server: &MockServer) -> OperatorClient {
        OperatorClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_maintenance_schedule() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1"))
            .and(body_json(json!({ "type": "GET_MAINTENANCE_SCHEDULE" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "GET_MAINTENANCE_SCHEDULE",
                "get_maintenance_schedule": {
                    "schedule": {
                        "windows": [{
                            "machine_ids": [{ "hostname": "h1", "ip": "10.0.0.1" }],
                            "unavailability": { "start": { "nanoseconds": 7 } }
                        }]
                    }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let schedule = client(&server).get_maintenance_schedule().await.unwrap();
        assert_eq!(schedule.windows.len(), 1);
        assert_eq!(
            schedule.windows[0].machine_ids,
            vec![MachineId::new("h1", "10.0.0.1")]
        );
    }

    #[tokio::test]
    async fn test_empty_schedule_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "GET_MAINTENANCE_SCHEDULE",
                "get_maintenance_schedule": {}
            })))
            .mount(&server)
            .await;

        let schedule = client(&server).get_maintenance_schedule().await.unwrap();
        assert!(schedule.windows.is_empty());
    }

    #[tokio::test]
    async fn test_update_schedule_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1"))
            .and(body_json(json!({
                "type": "UPDATE_MAINTENANCE_SCHEDULE",
                "update_maintenance_schedule": {
                    "schedule": {
                        "windows": [{
                            "machine_ids": [{ "hostname": "h1", "ip": "10.0.0.1" }],
                            "unavailability": { "start": { "nanoseconds": 7 } }
                        }]
                    }
                }
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let schedule = Schedule {
            windows: vec![Window {
                machine_ids: vec![MachineId::new("h1", "10.0.0.1")],
                unavailability: Unavailability {
                    start: TimeInfo { nanoseconds: 7 },
                    duration: None,
                },
            }],
        };
        client(&server)
            .update_maintenance_schedule(&schedule)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_maintenance_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1"))
            .and(body_json(json!({
                "type": "STOP_MAINTENANCE",
                "stop_maintenance": {
                    "machines": [{ "hostname": "h2", "ip": "10.0.0.2" }]
                }
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .stop_maintenance(&[MachineId::new("h2", "10.0.0.2")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_agents() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1"))
            .and(body_json(json!({ "type": "GET_AGENTS" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "GET_AGENTS",
                "get_agents": {
                    "agents": [{
                        "agent_info": { "hostname": "h1", "port": 5051 },
                        "pid": "slave(1)@10.0.0.1:5051",
                        "active": true
                    }]
                }
            })))
            .mount(&server)
            .await;

        let agents = client(&server).get_agents().await.unwrap();
        assert_eq!(
            agents,
            vec![AgentInfo::new("h1", "slave(1)@10.0.0.1:5051")]
        );
    }

    #[tokio::test]
    async fn test_get_maintenance_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "GET_MAINTENANCE_STATUS",
                "get_maintenance_status": {
                    "status": {
                        "draining_machines": [{ "id": { "hostname": "h1", "ip": "10.0.0.1" } }],
                        "down_machines": [{ "hostname": "h2", "ip": "10.0.0.2" }]
                    }
                }
            })))
            .mount(&server)
            .await;

        let status = client(&server).get_maintenance_status().await.unwrap();
        assert_eq!(status.draining_machines[0].id.hostname, "h1");
        assert_eq!(status.down_machines[0].hostname, "h2");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1"))
            .respond_with(ResponseTemplate::new(503).set_body_string("not leading"))
            .mount(&server)
            .await;

        let err = client(&server)
            .start_maintenance(&[MachineId::new("h1", "10.0.0.1")])
            .await
            .unwrap_err();
        match err {
            BackendError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "not leading");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let err = client(&server).get_agents().await.unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
    }
}
