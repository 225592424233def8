//! Placement eligibility endpoint.

use axum::{extract::State, routing::post, Json, Router};
use berth_constraints::Constraint;
use serde::Deserialize;

use super::hosts::HostnamesResponse;
use crate::api::error::ApiError;
use crate::eligibility::Candidate;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/eligible-hosts", post(eligible_hosts))
}

#[derive(Debug, Deserialize)]
pub struct EligibleHostsRequest {
    /// Task constraint; absent means unconstrained.
    #[serde(default)]
    pub constraint: Option<Constraint>,
    pub candidates: Vec<Candidate>,
}

async fn eligible_hosts(
    State(state): State<AppState>,
    Json(request): Json<EligibleHostsRequest>,
) -> Result<Json<HostnamesResponse>, ApiError> {
    let hostnames = state
        .hosts()
        .eligible_hosts(request.constraint.as_ref(), &request.candidates)
        .await?;
    Ok(Json(HostnamesResponse { hostnames }))
}
