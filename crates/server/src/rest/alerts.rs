use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use klaxon_core::alert::{Alert, LabelSet};

use super::AppState;

#[derive(Deserialize)]
pub struct PostAlertsRequest {
    pub receiver: String,
    #[serde(default)]
    pub group_key: Option<String>,
    #[serde(default)]
    pub group_labels: LabelSet,
    pub alerts: Vec<Alert>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Group keys default to the canonical rendering of the group labels when
/// the producer does not supply one.
fn group_key_from_labels(labels: &LabelSet) -> String {
    let pairs: Vec<String> = labels
        .iter()
        .map(|(name, value)| format!("{name}=\"{value}\""))
        .collect();
    format!("{{{}}}", pairs.join(","))
}

pub async fn post_alerts(
    State(state): State<AppState>,
    Json(body): Json<PostAlertsRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let PostAlertsRequest {
        receiver,
        group_key,
        group_labels,
        alerts,
    } = body;

    if alerts.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "alerts must not be empty"));
    }
    if !state.dispatcher.has_receiver(&receiver) {
        return Err(error(
            StatusCode::NOT_FOUND,
            format!("unknown receiver {receiver}"),
        ));
    }

    let group_key = group_key.unwrap_or_else(|| group_key_from_labels(&group_labels));
    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        // Outcome is logged by the dispatcher; ingestion already answered.
        let _ = dispatcher
            .dispatch(&receiver, group_key, group_labels, alerts)
            .await;
    });

    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_key_rendering_is_stable() {
        let labels: LabelSet = [
            ("env".to_string(), "prod".to_string()),
            ("alertname".to_string(), "Cpu".to_string()),
        ]
        .into();
        assert_eq!(
            group_key_from_labels(&labels),
            r#"{alertname="Cpu",env="prod"}"#
        );
        assert_eq!(group_key_from_labels(&LabelSet::new()), "{}");
    }
}
