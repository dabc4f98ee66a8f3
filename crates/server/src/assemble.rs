use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use klaxon_core::kv::{KvStore, MemoryKv};
use klaxon_core::metrics::NotifyMetrics;
use klaxon_core::pipeline::{Integration, PipelineBuilder, Receiver};

use crate::config::{Config, IntegrationConfig, ReceiverConfig};
use crate::dispatch::{Dispatcher, RouteSettings};
use crate::mute::{ConfigSilencer, NoopInhibitor};
use crate::notifier::{SlackNotifier, WebhookNotifier};
use crate::window::build_interval_table;

/// Builds the full notification machinery from a loaded config.
pub fn build_pipeline(
    config: &Config,
) -> (Arc<Dispatcher>, Arc<Vec<Receiver>>, Arc<NotifyMetrics>) {
    let builder = PipelineBuilder::new();
    let receivers: Arc<Vec<Receiver>> =
        Arc::new(config.receivers.iter().map(build_receiver).collect());

    let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
    let routing = Arc::new(builder.build(
        kv,
        &receivers,
        Arc::new(NoopInhibitor),
        Arc::new(ConfigSilencer::from_config(&config.silences)),
        Arc::new(build_interval_table(&config.time_intervals)),
    ));

    let routes: HashMap<String, RouteSettings> = config
        .receivers
        .iter()
        .map(|r| {
            (
                r.name.clone(),
                RouteSettings {
                    repeat_interval: Duration::from_secs(r.repeat_interval_secs),
                    mute_time_intervals: r.mute_time_intervals.clone(),
                    active_time_intervals: r.active_time_intervals.clone(),
                },
            )
        })
        .collect();

    let dispatcher = Arc::new(Dispatcher::new(
        routing,
        routes,
        Duration::from_secs(config.notify_timeout_secs),
    ));

    (dispatcher, receivers, builder.metrics())
}

fn build_receiver(cfg: &ReceiverConfig) -> Receiver {
    // idx counts integrations of the same type within the receiver, so two
    // webhooks become webhook[0] and webhook[1].
    let mut counters: HashMap<String, u32> = HashMap::new();
    let mut next_idx = |name: &str| {
        let slot = counters.entry(name.to_string()).or_insert(0);
        let idx = *slot;
        *slot += 1;
        idx
    };

    let integrations = cfg
        .integrations
        .iter()
        .map(|icfg| match icfg {
            IntegrationConfig::Webhook {
                url,
                secret,
                send_resolved,
            } => {
                let notifier = Arc::new(WebhookNotifier::new(
                    url.clone(),
                    secret.as_ref().map(|s| s.as_bytes().to_vec()),
                    *send_resolved,
                ));
                Arc::new(Integration::new(
                    notifier.clone(),
                    notifier,
                    "webhook",
                    next_idx("webhook"),
                ))
            }
            IntegrationConfig::Slack {
                webhook_url,
                send_resolved,
            } => {
                let notifier = Arc::new(SlackNotifier::new(webhook_url.clone(), *send_resolved));
                Arc::new(Integration::new(
                    notifier.clone(),
                    notifier,
                    "slack",
                    next_idx("slack"),
                ))
            }
        })
        .collect();

    Receiver::new(cfg.name.clone(), cfg.active, integrations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_from_str;

    const CONFIG: &str = r#"
notify_timeout_secs: 5
receivers:
  - name: ops
    repeat_interval_secs: 300
    integrations:
      - type: webhook
        url: https://hooks.example.com/a
      - type: webhook
        url: https://hooks.example.com/b
      - type: slack
        webhook_url: https://hooks.slack.com/services/T/B/x
  - name: dev
    active: false
    integrations: []
"#;

    #[test]
    fn builds_receivers_with_per_type_indices() {
        let cfg = load_from_str(CONFIG).unwrap();
        let (_, receivers, _) = build_pipeline(&cfg);

        assert_eq!(receivers.len(), 2);
        let ops = &receivers[0];
        assert_eq!(ops.group_name(), "ops");
        assert!(ops.active());
        let ids: Vec<String> = ops.integrations().iter().map(|i| i.to_string()).collect();
        assert_eq!(ids, vec!["webhook[0]", "webhook[1]", "slack[0]"]);
        assert!(!receivers[1].active());
    }

    #[test]
    fn dispatcher_knows_configured_receivers() {
        let cfg = load_from_str(CONFIG).unwrap();
        let (dispatcher, _, _) = build_pipeline(&cfg);
        assert!(dispatcher.has_receiver("ops"));
        assert!(dispatcher.has_receiver("dev"));
        assert!(!dispatcher.has_receiver("unknown"));
        // Short configured timeout is clamped up.
        assert_eq!(dispatcher.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn configured_integrations_preregistered_in_metrics() {
        let cfg = load_from_str(CONFIG).unwrap();
        let (_, _, metrics) = build_pipeline(&cfg);
        assert_eq!(metrics.integration("webhook").unwrap().notifications_val(), 0);
        assert_eq!(metrics.integration("slack").unwrap().notifications_val(), 0);
    }
}
