//! Health check endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

const SERVICE_NAME: &str = "host-manager";

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status: "ok" or "degraded".
    pub status: String,
    pub service: String,
    pub version: String,
    /// Current timestamp (ISO 8601).
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentHealth>,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub agent_snapshot: ComponentStatus,
}

#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    /// Status: "ok" or "unavailable".
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/livez", get(healthz))
}

fn response(status: &str, components: Option<ComponentHealth>) -> HealthResponse {
    HealthResponse {
        status: status.to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        components,
    }
}

/// Liveness: the process is serving requests.
async fn healthz() -> impl IntoResponse {
    Json(response("ok", None))
}

/// Readiness: an agent snapshot has been loaded, so UP hosts can be reported.
async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let loaded = state.hosts().agents_loaded().await;

    let components = ComponentHealth {
        agent_snapshot: ComponentStatus {
            status: if loaded { "ok" } else { "unavailable" }.to_string(),
            message: (!loaded).then(|| "agent snapshot not loaded yet".to_string()),
        },
    };

    if loaded {
        (StatusCode::OK, Json(response("ok", Some(components))))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(response("degraded", Some(components))),
        )
    }
}
