use async_trait::async_trait;
use reqwest::Client;

use klaxon_core::alert::Alert;
use klaxon_core::error::NotifyError;
use klaxon_core::pipeline::{ExecEnv, Notifier, ResolvedSender};

use super::{classify_status, classify_transport};

pub struct SlackNotifier {
    webhook_url: String,
    send_resolved: bool,
    client: Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: String, send_resolved: bool) -> Self {
        Self {
            webhook_url,
            send_resolved,
            client: Client::new(),
        }
    }

    fn build_payload(&self, env: &ExecEnv, alerts: &[Alert]) -> serde_json::Value {
        let firing = alerts.iter().filter(|a| !a.resolved()).count();
        let color = if firing > 0 { "#d32f2f" } else { "#36a64f" };
        let title = if firing > 0 {
            format!("[FIRING:{firing}] {}", env.receiver().unwrap_or_default())
        } else {
            format!("[RESOLVED] {}", env.receiver().unwrap_or_default())
        };

        let lines: Vec<String> = alerts
            .iter()
            .map(|a| {
                let labels: Vec<String> =
                    a.labels.iter().map(|(k, v)| format!("{k}={v}")).collect();
                format!("{} {{{}}}", a.status_str(), labels.join(", "))
            })
            .collect();

        serde_json::json!({
            "attachments": [{
                "color": color,
                "title": title,
                "text": lines.join("\n"),
                "footer": env.group_key().unwrap_or_default(),
            }]
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, env: &ExecEnv, alerts: &[Alert]) -> Result<(), NotifyError> {
        let payload = self.build_payload(env, alerts);
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(classify_transport)?;
        classify_status(response.status())
    }
}

impl ResolvedSender for SlackNotifier {
    fn send_resolved(&self) -> bool {
        self.send_resolved
    }
}
