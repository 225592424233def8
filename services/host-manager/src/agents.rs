//! Snapshot of agents registered with the cluster master.
//!
//! The snapshot is refreshed on its own interval by the sync worker and can
//! lag behind maintenance state: a host that just started draining may still
//! be listed here.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// An agent as reported by the master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub hostname: String,
    /// Process id in `name(n)@ip:port` form, e.g. `slave(1)@10.0.0.1:5051`.
    pub pid: String,
}

impl AgentInfo {
    pub fn new(hostname: impl Into<String>, pid: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            pid: pid.into(),
        }
    }

    /// IP address the agent process listens on.
    pub fn ip(&self) -> Result<String, InvalidAgentPid> {
        parse_agent_pid(&self.pid).map(|(ip, _)| ip)
    }
}

/// The agent pid is not of the form `name@ip:port`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid agent pid '{0}'")]
pub struct InvalidAgentPid(pub String);

/// Split an agent pid into its IP and port.
pub fn parse_agent_pid(pid: &str) -> Result<(String, u16), InvalidAgentPid> {
    let invalid = || InvalidAgentPid(pid.to_string());

    let (_, address) = pid.split_once('@').ok_or_else(invalid)?;
    let (ip, port) = address.rsplit_once(':').ok_or_else(invalid)?;
    if ip.is_empty() {
        return Err(invalid());
    }
    let port = port.parse::<u16>().map_err(|_| invalid())?;

    Ok((ip.to_string(), port))
}

/// Registered agents keyed by hostname.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentMap {
    registered_agents: HashMap<String, AgentInfo>,
}

impl AgentMap {
    pub fn new(agents: impl IntoIterator<Item = AgentInfo>) -> Self {
        Self {
            registered_agents: agents
                .into_iter()
                .map(|agent| (agent.hostname.clone(), agent))
                .collect(),
        }
    }

    pub fn get(&self, hostname: &str) -> Option<&AgentInfo> {
        self.registered_agents.get(hostname)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentInfo> {
        self.registered_agents.values()
    }

    pub fn len(&self) -> usize {
        self.registered_agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered_agents.is_empty()
    }
}

/// Holder of the latest agent snapshot.
#[derive(Debug, Default)]
pub struct AgentMapCache {
    current: RwLock<Option<Arc<AgentMap>>>,
}

impl AgentMapCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest snapshot, if one has been loaded.
    pub async fn get(&self) -> Option<Arc<AgentMap>> {
        self.current.read().await.clone()
    }

    /// Swap in a fresh snapshot.
    pub async fn replace(&self, agents: AgentMap) {
        *self.current.write().await = Some(Arc::new(agents));
    }

    pub async fn is_loaded(&self) -> bool {
        self.current.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("slave(1)@10.0.0.1:5051", "10.0.0.1", 5051)]
    #[case("agent(12)@host-7.example.com:5051", "host-7.example.com", 5051)]
    fn test_parse_agent_pid(#[case] pid: &str, #[case] ip: &str, #[case] port: u16) {
        assert_eq!(parse_agent_pid(pid), Ok((ip.to_string(), port)));
    }

    #[rstest]
    #[case("10.0.0.1:5051")]
    #[case("slave(1)@10.0.0.1")]
    #[case("slave(1)@:5051")]
    #[case("slave(1)@10.0.0.1:http")]
    fn test_parse_agent_pid_rejects(#[case] pid: &str) {
        assert_eq!(parse_agent_pid(pid), Err(InvalidAgentPid(pid.to_string())));
    }

    #[tokio::test]
    async fn test_cache_replace() {
        let cache = AgentMapCache::new();
        assert!(!cache.is_loaded().await);
        assert!(cache.get().await.is_none());

        cache
            .replace(AgentMap::new([AgentInfo::new("h1", "slave(1)@10.0.0.1:5051")]))
            .await;

        let agents = cache.get().await.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents.get("h1").unwrap().ip().unwrap(), "10.0.0.1");
    }
}
