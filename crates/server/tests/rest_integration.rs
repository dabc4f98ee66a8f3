use std::time::Instant;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use klaxon_server::assemble::build_pipeline;
use klaxon_server::config::load_from_str;
use klaxon_server::rest::{router, AppState};

const CONFIG: &str = r#"
notify_timeout_secs: 5
receivers:
  - name: ops
    repeat_interval_secs: 300
    integrations:
      - type: webhook
        url: https://hooks.example.com/notify
  - name: quiet
    active: false
    integrations: []
"#;

fn app() -> axum::Router {
    let config = load_from_str(CONFIG).unwrap();
    let (dispatcher, receivers, metrics) = build_pipeline(&config);
    router(AppState {
        dispatcher,
        receivers,
        metrics,
        started_at: Instant::now(),
    })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn healthz_returns_ok() {
    let resp = app().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn status_reports_receiver_count() {
    let resp = app().oneshot(get("/v1/status")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let status: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status["receivers"], 2);
    assert!(status["version"].is_string());
}

#[tokio::test]
async fn receivers_listing_includes_integrations() {
    let resp = app().oneshot(get("/v1/receivers")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let receivers: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(receivers.len(), 2);

    let ops = receivers.iter().find(|r| r["name"] == "ops").unwrap();
    assert_eq!(ops["active"], true);
    assert_eq!(ops["integrations"][0]["name"], "webhook");
    assert_eq!(ops["integrations"][0]["idx"], 0);
    assert!(ops["integrations"][0]["last_attempt"].is_null());

    let quiet = receivers.iter().find(|r| r["name"] == "quiet").unwrap();
    assert_eq!(quiet["active"], false);
}

#[tokio::test]
async fn metrics_exposition_served() {
    let resp = app().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains(r#"klaxon_notifications_total{integration="webhook"} 0"#));
}

#[tokio::test]
async fn post_alerts_accepted_for_known_receiver() {
    let body = r#"{
        "receiver": "quiet",
        "group_labels": {"alertname": "Cpu"},
        "alerts": [{
            "labels": {"alertname": "Cpu"},
            "starts_at": "2024-05-01T00:00:00Z",
            "phase": "active",
            "rule_uid": "r-1"
        }]
    }"#;
    let resp = app().oneshot(post_json("/v1/alerts", body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn post_alerts_unknown_receiver_is_404() {
    let body = r#"{
        "receiver": "nobody",
        "alerts": [{
            "labels": {"alertname": "Cpu"},
            "starts_at": "2024-05-01T00:00:00Z"
        }]
    }"#;
    let resp = app().oneshot(post_json("/v1/alerts", body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_alerts_empty_batch_is_400() {
    let body = r#"{"receiver": "ops", "alerts": []}"#;
    let resp = app().oneshot(post_json("/v1/alerts", body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
