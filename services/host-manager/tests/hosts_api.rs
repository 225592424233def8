use std::sync::Arc;

use berth_host_manager::{
    agents::{AgentInfo, AgentMapCache},
    api,
    backend::InMemoryBackend,
    queue::InMemoryMaintenanceQueue,
    registry::MaintenanceHostInfoMap,
    state::AppState,
    HostService,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

struct ApiFixture {
    base_url: String,
    client: reqwest::Client,
    service: Arc<HostService>,
}

impl ApiFixture {
    async fn start(agents: Vec<AgentInfo>) -> Self {
        let service = Arc::new(HostService::new(
            Arc::new(MaintenanceHostInfoMap::new()),
            Arc::new(AgentMapCache::new()),
            Arc::new(InMemoryBackend::with_agents(agents)),
            Arc::new(InMemoryMaintenanceQueue::new(100)),
        ));

        let app = api::create_router(AppState::new(Arc::clone(&service)));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            service,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn fleet() -> Vec<AgentInfo> {
    vec![
        AgentInfo::new("h1", "slave(1)@10.0.0.1:5051"),
        AgentInfo::new("h2", "slave(1)@10.0.0.2:5051"),
    ]
}

#[tokio::test]
async fn test_health_endpoints() {
    let api = ApiFixture::start(fleet()).await;

    for path in ["/healthz", "/livez"] {
        let resp = api.client.get(api.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "host-manager");
    }
}

#[tokio::test]
async fn test_readyz_waits_for_agent_snapshot() {
    let api = ApiFixture::start(fleet()).await;

    let resp = api.client.get(api.url("/readyz")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    api.service.refresh_agents().await.unwrap();

    let resp = api.client.get(api.url("/readyz")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["components"]["agent_snapshot"]["status"], "ok");
}

#[tokio::test]
async fn test_list_hosts() {
    let api = ApiFixture::start(fleet()).await;
    api.service.refresh_agents().await.unwrap();

    let resp = api.client.get(api.url("/v1/hosts")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "hosts": [
                { "hostname": "h1", "ip": "10.0.0.1", "state": "up" },
                { "hostname": "h2", "ip": "10.0.0.2", "state": "up" }
            ]
        })
    );

    let resp = api
        .client
        .get(api.url("/v1/hosts?states=draining,down"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "hosts": [] }));
}

#[tokio::test]
async fn test_list_hosts_rejects_unknown_state() {
    let api = ApiFixture::start(fleet()).await;

    let resp = api
        .client
        .get(api.url("/v1/hosts?states=sideways"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.headers()["content-type"],
        "application/problem+json"
    );
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "invalid_host_state");
}

#[tokio::test]
async fn test_start_maintenance_unknown_host() {
    let api = ApiFixture::start(fleet()).await;
    api.service.refresh_agents().await.unwrap();

    let resp = api
        .client
        .post(api.url("/v1/hosts/maintenance/start"))
        .json(&json!({ "hostnames": ["h9"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "unknown_host");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_empty_batch_rejected() {
    let api = ApiFixture::start(fleet()).await;

    let resp = api
        .client
        .post(api.url("/v1/hosts/maintenance/complete"))
        .json(&json!({ "hostnames": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "empty_request");
}

#[tokio::test]
async fn test_eligible_hosts() {
    let api = ApiFixture::start(fleet()).await;

    let resp = api
        .client
        .post(api.url("/v1/placement/eligible-hosts"))
        .json(&json!({
            "constraint": {
                "type": "and",
                "constraints": [
                    {
                        "type": "label",
                        "kind": "host",
                        "label": { "key": "zone", "value": "west" },
                        "condition": "equal",
                        "requirement": 1
                    },
                    {
                        "type": "label",
                        "kind": "task",
                        "label": { "key": "job", "value": "web" },
                        "condition": "less_than",
                        "requirement": 2
                    }
                ]
            },
            "candidates": [
                { "hostname": "h1", "labels": [{ "key": "zone", "value": "west" }] },
                { "hostname": "h2", "labels": [{ "key": "zone", "value": "east" }] },
                { "hostname": "h3" }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "hostnames": ["h1"] }));
}

#[tokio::test]
async fn test_eligible_hosts_unknown_condition() {
    let api = ApiFixture::start(fleet()).await;

    let resp = api
        .client
        .post(api.url("/v1/placement/eligible-hosts"))
        .json(&json!({
            "constraint": {
                "type": "label",
                "kind": "host",
                "label": { "key": "zone", "value": "west" },
                "condition": "roughly",
                "requirement": 1
            },
            "candidates": [{ "hostname": "h1" }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "unknown_label_condition");
}
