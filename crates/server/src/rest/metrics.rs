use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use klaxon_core::metrics::{render_prometheus, NotifyMetrics};

pub async fn metrics(State(m): State<Arc<NotifyMetrics>>) -> impl IntoResponse {
    let body = render_prometheus(&m);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
