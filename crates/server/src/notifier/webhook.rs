use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use klaxon_core::alert::{Alert, LabelSet};
use klaxon_core::error::{FailureReason, NotifyError};
use klaxon_core::pipeline::{ExecEnv, Notifier, ResolvedSender};

use super::signer::sign_payload;
use super::{classify_status, classify_transport};

pub struct WebhookNotifier {
    url: String,
    secret: Option<Vec<u8>>,
    send_resolved: bool,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(url: String, secret: Option<Vec<u8>>, send_resolved: bool) -> Self {
        Self {
            url,
            secret,
            send_resolved,
            client: Client::new(),
        }
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    receiver: &'a str,
    group_key: &'a str,
    group_labels: &'a LabelSet,
    status: &'a str,
    alerts: &'a [Alert],
}

fn group_status(alerts: &[Alert]) -> &'static str {
    if alerts.iter().any(|a| !a.resolved()) {
        "firing"
    } else {
        "resolved"
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, env: &ExecEnv, alerts: &[Alert]) -> Result<(), NotifyError> {
        let empty = LabelSet::new();
        let payload = WebhookPayload {
            receiver: env.receiver().unwrap_or_default(),
            group_key: env.group_key().unwrap_or_default(),
            group_labels: env.group_labels().unwrap_or(&empty),
            status: group_status(alerts),
            alerts,
        };
        let body = serde_json::to_vec(&payload)
            .map_err(|e| NotifyError::permanent(e.to_string()).with_reason(FailureReason::Client))?;

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json");
        if let Some(secret) = &self.secret {
            request = request.header("X-Klaxon-Signature", sign_payload(secret, &body));
        }

        let response = request.body(body).send().await.map_err(classify_transport)?;
        classify_status(response.status())
    }
}

impl ResolvedSender for WebhookNotifier {
    fn send_resolved(&self) -> bool {
        self.send_resolved
    }
}
