//! HTTP API handlers and routing.

pub mod error;
mod health;
mod v1;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .nest("/v1", v1::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::agents::AgentMapCache;
    use crate::backend::InMemoryBackend;
    use crate::queue::InMemoryMaintenanceQueue;
    use crate::registry::MaintenanceHostInfoMap;
    use crate::service::HostService;

    fn router() -> Router {
        let service = HostService::new(
            Arc::new(MaintenanceHostInfoMap::new()),
            Arc::new(AgentMapCache::new()),
            Arc::new(InMemoryBackend::new()),
            Arc::new(InMemoryMaintenanceQueue::new(10)),
        );
        create_router(AppState::new(Arc::new(service)))
    }

    #[tokio::test]
    async fn test_health_routes_mounted_at_root() {
        let response = router()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = router()
            .oneshot(Request::get("/v1/nodes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let response = router()
            .oneshot(
                Request::post("/v1/hosts/maintenance/start")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"hosts": "h1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
