//! Host descriptors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operational state of a host.
///
/// Hosts move `Up -> Draining -> Down -> Up`. A host that the registry does
/// not know about is `Up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostState {
    /// Accepting placements.
    Up,
    /// Running work is being rescheduled; no new placements.
    Draining,
    /// In maintenance.
    Down,
}

impl HostState {
    /// Every state, in lifecycle order.
    pub const ALL: [HostState; 3] = [Self::Up, Self::Draining, Self::Down];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Draining => "draining",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid host state '{0}': expected one of up, draining, down")]
pub struct ParseHostStateError(pub String);

impl FromStr for HostState {
    type Err = ParseHostStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "draining" => Ok(Self::Draining),
            "down" => Ok(Self::Down),
            _ => Err(ParseHostStateError(s.to_string())),
        }
    }
}

/// A host and its current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: String,
    pub ip: String,
    pub state: HostState,
}

impl HostInfo {
    pub fn new(hostname: impl Into<String>, ip: impl Into<String>, state: HostState) -> Self {
        Self {
            hostname: hostname.into(),
            ip: ip.into(),
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_state() {
        assert_eq!("up".parse::<HostState>(), Ok(HostState::Up));
        assert_eq!(" DRAINING ".parse::<HostState>(), Ok(HostState::Draining));
        assert_eq!("down".parse::<HostState>(), Ok(HostState::Down));
        assert!("drained".parse::<HostState>().is_err());
    }

    #[test]
    fn test_host_info_json() {
        let info = HostInfo::new("host-1", "10.0.0.1", HostState::Draining);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "hostname": "host-1", "ip": "10.0.0.1", "state": "draining" })
        );
    }
}
