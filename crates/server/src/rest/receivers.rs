use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct ReceiverStatus {
    pub name: String,
    pub active: bool,
    pub integrations: Vec<IntegrationStatus>,
}

#[derive(Serialize)]
pub struct IntegrationStatus {
    pub name: String,
    pub idx: u32,
    pub send_resolved: bool,
    pub last_attempt: Option<AttemptStatus>,
}

#[derive(Serialize)]
pub struct AttemptStatus {
    pub at: DateTime<Utc>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

pub async fn list_receivers(State(state): State<AppState>) -> Json<Vec<ReceiverStatus>> {
    let out = state
        .receivers
        .iter()
        .map(|r| ReceiverStatus {
            name: r.group_name().to_string(),
            active: r.active(),
            integrations: r
                .integrations()
                .iter()
                .map(|i| IntegrationStatus {
                    name: i.name().to_string(),
                    idx: i.index(),
                    send_resolved: i.send_resolved(),
                    last_attempt: i.last_report().map(|report| AttemptStatus {
                        at: report.at,
                        duration_ms: report.duration.as_millis() as u64,
                        error: report.error,
                    }),
                })
                .collect(),
        })
        .collect();
    Json(out)
}
