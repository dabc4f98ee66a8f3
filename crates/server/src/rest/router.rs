use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;

use klaxon_core::metrics::NotifyMetrics;
use klaxon_core::pipeline::Receiver;

use super::{alerts, health, metrics, receivers, status};
use crate::dispatch::Dispatcher;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub receivers: Arc<Vec<Receiver>>,
    pub metrics: Arc<NotifyMetrics>,
    pub started_at: Instant,
}

pub fn router(state: AppState) -> Router {
    let metrics_state = state.metrics.clone();
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/metrics", get(metrics::metrics).with_state(metrics_state))
        .route("/v1/status", get(status::status))
        .route("/v1/receivers", get(receivers::list_receivers))
        .route("/v1/alerts", post(alerts::post_alerts))
        .with_state(state)
}
