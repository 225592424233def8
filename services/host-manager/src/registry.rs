//! Registry of hosts in maintenance.
//!
//! One map keyed by hostname holds every host that is DRAINING or DOWN; the
//! state lives on the entry, so a host can never be in both sets. Hosts
//! without an entry are UP. Every batch operation runs under a single lock
//! acquisition, so readers never see half of a batch.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::host::{HostInfo, HostState};

/// Errors from checked registry transitions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The host has no maintenance entry.
    #[error("host {hostname} is not in maintenance")]
    NotFound { hostname: String },

    /// The host is in a different state than the transition expects.
    #[error("host {hostname} is {actual}, expected {expected}")]
    InvalidHostState {
        hostname: String,
        expected: HostState,
        actual: HostState,
    },
}

/// Consistent view of the registry taken under one read lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSnapshot {
    pub draining: Vec<HostInfo>,
    pub down: Vec<HostInfo>,
}

impl HostSnapshot {
    /// Hostnames that are DRAINING or DOWN.
    pub fn hostnames(&self) -> HashSet<&str> {
        self.draining
            .iter()
            .chain(self.down.iter())
            .map(|info| info.hostname.as_str())
            .collect()
    }
}

/// Shared DRAINING/DOWN host registry.
#[derive(Debug, Default)]
pub struct MaintenanceHostInfoMap {
    hosts: RwLock<HashMap<String, HostInfo>>,
}

impl MaintenanceHostInfoMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// DRAINING hosts, restricted to `filter` unless it is empty.
    pub async fn draining_host_infos(&self, filter: &[String]) -> Vec<HostInfo> {
        self.host_infos_in(HostState::Draining, filter).await
    }

    /// DOWN hosts, restricted to `filter` unless it is empty.
    pub async fn down_host_infos(&self, filter: &[String]) -> Vec<HostInfo> {
        self.host_infos_in(HostState::Down, filter).await
    }

    async fn host_infos_in(&self, state: HostState, filter: &[String]) -> Vec<HostInfo> {
        let hosts = self.hosts.read().await;
        let mut infos: Vec<HostInfo> = if filter.is_empty() {
            hosts
                .values()
                .filter(|info| info.state == state)
                .cloned()
                .collect()
        } else {
            filter
                .iter()
                .filter_map(|hostname| hosts.get(hostname))
                .filter(|info| info.state == state)
                .cloned()
                .collect()
        };
        infos.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        infos.dedup_by(|a, b| a.hostname == b.hostname);
        infos
    }

    /// Current entry for `hostname`, if it is in maintenance.
    pub async fn get(&self, hostname: &str) -> Option<HostInfo> {
        self.hosts.read().await.get(hostname).cloned()
    }

    /// DRAINING and DOWN hosts as of one instant, sorted by hostname.
    pub async fn snapshot(&self) -> HostSnapshot {
        let hosts = self.hosts.read().await;
        let mut snapshot = HostSnapshot::default();
        for info in hosts.values() {
            match info.state {
                HostState::Draining => snapshot.draining.push(info.clone()),
                HostState::Down => snapshot.down.push(info.clone()),
                HostState::Up => {}
            }
        }
        snapshot.draining.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        snapshot.down.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        snapshot
    }

    /// Upsert a batch of entries.
    ///
    /// An entry whose state is `Up` removes the host instead.
    pub async fn add_host_infos(&self, infos: Vec<HostInfo>) {
        let mut hosts = self.hosts.write().await;
        for info in infos {
            debug!(hostname = %info.hostname, state = %info.state, "Updating host entry");
            if info.state == HostState::Up {
                hosts.remove(&info.hostname);
            } else {
                hosts.insert(info.hostname.clone(), info);
            }
        }
    }

    /// Drop a batch of hosts; they are UP afterwards.
    pub async fn remove_host_infos(&self, hostnames: &[String]) {
        let mut hosts = self.hosts.write().await;
        for hostname in hostnames {
            if hosts.remove(hostname).is_some() {
                debug!(hostname = %hostname, "Removed host entry");
            }
        }
    }

    /// Move every host in the batch from `from` to `to`.
    ///
    /// Only hosts with an entry can move; moving to `Up` drops the entry.
    /// Nothing changes unless every host is currently in `from`.
    pub async fn transition_hosts(
        &self,
        hostnames: &[String],
        from: HostState,
        to: HostState,
    ) -> Result<(), RegistryError> {
        let mut hosts = self.hosts.write().await;

        for hostname in hostnames {
            let Some(info) = hosts.get(hostname) else {
                return Err(RegistryError::NotFound {
                    hostname: hostname.clone(),
                });
            };
            let actual = info.state;
            if actual != from {
                return Err(RegistryError::InvalidHostState {
                    hostname: hostname.clone(),
                    expected: from,
                    actual,
                });
            }
        }

        for hostname in hostnames {
            if to == HostState::Up {
                hosts.remove(hostname);
            } else if let Some(info) = hosts.get_mut(hostname) {
                info.state = to;
            }
        }

        Ok(())
    }

    /// Replace the whole registry.
    pub async fn clear_and_fill(&self, infos: Vec<HostInfo>) {
        let mut hosts = self.hosts.write().await;
        hosts.clear();
        for info in infos {
            if info.state != HostState::Up {
                hosts.insert(info.hostname.clone(), info);
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.hosts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.hosts.read().await.is_empty()
    }
}
