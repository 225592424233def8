use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::agents::{parse_agent_pid, AgentInfo};

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub dev_mode: bool,

    /// Operator API of the cluster master; `None` selects the in-memory backend.
    pub operator_url: Option<String>,
    pub operator_timeout: Duration,

    pub agent_sync_interval: Duration,
    pub reload_maintenance_state: bool,
    pub maintenance_queue_capacity: usize,

    /// Agents registered with the in-memory backend in dev mode.
    pub dev_agents: Vec<AgentInfo>,
}

fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Parse `hostname=pid` entries separated by commas.
fn parse_dev_agents(value: &str) -> Result<Vec<AgentInfo>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> Result<AgentInfo> {
            let Some((hostname, pid)) = entry.split_once('=') else {
                bail!("BERTH_DEV_AGENTS entry '{entry}' must be hostname=pid");
            };
            let (hostname, pid) = (hostname.trim(), pid.trim());
            if hostname.is_empty() {
                bail!("BERTH_DEV_AGENTS entry '{entry}' has no hostname");
            }
            parse_agent_pid(pid)
                .with_context(|| format!("BERTH_DEV_AGENTS entry for {hostname}"))?;
            Ok(AgentInfo::new(hostname, pid))
        })
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let listen_addr = var("BERTH_LISTEN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".to_string())
            .parse()
            .context("BERTH_LISTEN_ADDR must be a socket address")?;

        let log_level = var("BERTH_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let dev_mode = var("BERTH_DEV").map(|v| flag(&v)).unwrap_or(false);

        let operator_url = var("BERTH_OPERATOR_URL").filter(|url| !url.trim().is_empty());
        if operator_url.is_none() && !dev_mode {
            bail!("BERTH_OPERATOR_URL is required unless BERTH_DEV=1");
        }

        let operator_timeout_ms: u64 = var("BERTH_OPERATOR_TIMEOUT_MS")
            .unwrap_or_else(|| "10000".to_string())
            .parse()
            .context("BERTH_OPERATOR_TIMEOUT_MS must be a number of milliseconds")?;

        let agent_sync_interval_secs: u64 = var("BERTH_AGENT_SYNC_INTERVAL_SECS")
            .unwrap_or_else(|| "15".to_string())
            .parse()
            .context("BERTH_AGENT_SYNC_INTERVAL_SECS must be a number of seconds")?;
        if agent_sync_interval_secs == 0 {
            bail!("BERTH_AGENT_SYNC_INTERVAL_SECS must be greater than zero");
        }

        let reload_maintenance_state = var("BERTH_RELOAD_MAINTENANCE_STATE")
            .map(|v| flag(&v))
            .unwrap_or(true);

        let maintenance_queue_capacity = var("BERTH_MAINTENANCE_QUEUE_CAPACITY")
            .unwrap_or_else(|| "10000".to_string())
            .parse()
            .context("BERTH_MAINTENANCE_QUEUE_CAPACITY must be a number")?;

        let dev_agents = match var("BERTH_DEV_AGENTS") {
            Some(value) => parse_dev_agents(&value)?,
            None => Vec::new(),
        };

        Ok(Self {
            listen_addr,
            log_level,
            dev_mode,
            operator_url,
            operator_timeout: Duration::from_millis(operator_timeout_ms),
            agent_sync_interval: Duration::from_secs(agent_sync_interval_secs),
            reload_maintenance_state,
            maintenance_queue_capacity,
            dev_agents,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_in_dev_mode() {
        let config = config(&[("BERTH_DEV", "1")]).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.log_level, "info");
        assert!(config.operator_url.is_none());
        assert_eq!(config.operator_timeout, Duration::from_secs(10));
        assert_eq!(config.agent_sync_interval, Duration::from_secs(15));
        assert!(config.reload_maintenance_state);
        assert_eq!(config.maintenance_queue_capacity, 10000);
        assert!(config.dev_agents.is_empty());
    }

    #[test]
    fn test_dev_agents_parsed() {
        let config = config(&[
            ("BERTH_DEV", "1"),
            (
                "BERTH_DEV_AGENTS",
                "h1=slave(1)@10.0.0.1:5051, h2=slave(1)@10.0.0.2:5051,",
            ),
        ])
        .unwrap();
        assert_eq!(
            config.dev_agents,
            vec![
                AgentInfo::new("h1", "slave(1)@10.0.0.1:5051"),
                AgentInfo::new("h2", "slave(1)@10.0.0.2:5051"),
            ]
        );
        assert_eq!(config.dev_agents[1].ip().unwrap(), "10.0.0.2");
    }

    #[test]
    fn test_invalid_dev_agents_rejected() {
        for value in ["h1", "=slave(1)@10.0.0.1:5051", "h1=10.0.0.1"] {
            assert!(
                config(&[("BERTH_DEV", "1"), ("BERTH_DEV_AGENTS", value)]).is_err(),
                "{value}"
            );
        }
    }

    #[test]
    fn test_operator_url_required_outside_dev() {
        assert!(config(&[]).is_err());

        let config = config(&[
            ("BERTH_OPERATOR_URL", "http://master:5050"),
            ("BERTH_RELOAD_MAINTENANCE_STATE", "false"),
        ])
        .unwrap();
        assert_eq!(config.operator_url.as_deref(), Some("http://master:5050"));
        assert!(!config.reload_maintenance_state);
        assert!(!config.dev_mode);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config(&[("BERTH_DEV", "1"), ("BERTH_LISTEN_ADDR", "nope")]).is_err());
        assert!(config(&[("BERTH_DEV", "1"), ("BERTH_AGENT_SYNC_INTERVAL_SECS", "0")]).is_err());
        assert!(config(&[("BERTH_DEV", "1"), ("BERTH_OPERATOR_TIMEOUT_MS", "-1")]).is_err());
    }
}
