//! Host query and maintenance endpoints.
//!
//! - `GET  /v1/hosts?states=up,draining`
//! - `POST /v1/hosts/maintenance/start`: UP -> DRAINING
//! - `POST /v1/hosts/maintenance/drained`: DRAINING -> DOWN
//! - `POST /v1/hosts/maintenance/complete`: DOWN -> UP
//! - `GET  /v1/hosts/draining?limit=&timeout_ms=`: hosts that started draining

use std::time::Duration;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::host::{HostInfo, HostState};
use crate::state::AppState;

const DEFAULT_DRAINING_LIMIT: usize = 100;
const MAX_DRAINING_TIMEOUT: Duration = Duration::from_secs(30);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_hosts))
        .route("/draining", get(get_draining_hosts))
        .route("/maintenance/start", post(start_maintenance))
        .route("/maintenance/drained", post(mark_hosts_drained))
        .route("/maintenance/complete", post(complete_maintenance))
}

#[derive(Debug, Deserialize)]
pub struct ListHostsQuery {
    /// Comma-separated host states; absent or empty means all states.
    #[serde(default)]
    pub states: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DrainingHostsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct HostnamesRequest {
    pub hostnames: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HostsResponse {
    pub hosts: Vec<HostInfo>,
}

#[derive(Debug, Serialize)]
pub struct HostnamesResponse {
    pub hostnames: Vec<String>,
}

fn parse_states(states: Option<&str>) -> Result<Vec<HostState>, ApiError> {
    states
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|state| !state.is_empty())
        .map(|state| {
            state
                .parse::<HostState>()
                .map_err(|err| ApiError::bad_request("invalid_host_state", err.to_string()))
        })
        .collect()
}

async fn list_hosts(
    State(state): State<AppState>,
    Query(query): Query<ListHostsQuery>,
) -> Result<Json<HostsResponse>, ApiError> {
    let states = parse_states(query.states.as_deref())?;
    let hosts = state.hosts().query_hosts(&states).await?;
    Ok(Json(HostsResponse { hosts }))
}

async fn start_maintenance(
    State(state): State<AppState>,
    Json(request): Json<HostnamesRequest>,
) -> Result<Json<HostsResponse>, ApiError> {
    let hosts = state.hosts().start_maintenance(&request.hostnames).await?;
    Ok(Json(HostsResponse { hosts }))
}

async fn mark_hosts_drained(
    State(state): State<AppState>,
    Json(request): Json<HostnamesRequest>,
) -> Result<Json<HostsResponse>, ApiError> {
    let hosts = state.hosts().mark_hosts_drained(&request.hostnames).await?;
    Ok(Json(HostsResponse { hosts }))
}

async fn complete_maintenance(
    State(state): State<AppState>,
    Json(request): Json<HostnamesRequest>,
) -> Result<Json<HostnamesResponse>, ApiError> {
    let hostnames = state
        .hosts()
        .complete_maintenance(&request.hostnames)
        .await?;
    Ok(Json(HostnamesResponse { hostnames }))
}

async fn get_draining_hosts(
    State(state): State<AppState>,
    Query(query): Query<DrainingHostsQuery>,
) -> Result<Json<HostnamesResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_DRAINING_LIMIT);
    let timeout = Duration::from_millis(query.timeout_ms.unwrap_or(0)).min(MAX_DRAINING_TIMEOUT);

    let hostnames = state.hosts().get_draining_hosts(limit, timeout).await?;
    Ok(Json(HostnamesResponse { hostnames }))
}
