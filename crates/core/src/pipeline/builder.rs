use std::collections::HashMap;
use std::sync::Arc;

use crate::kv::KvStore;
use crate::metrics::NotifyMetrics;

use super::clear::ClearStateStage;
use super::dedup::{DedupStage, ReceiverKey};
use super::integration::{Integration, Muter};
use super::mute::MuteStage;
use super::retry::RetryStage;
use super::stage::{FanoutStage, MultiStage, RoutingStage, Stage};
use super::time::{IntervalTable, TimeActiveStage, TimeMuteStage};

/// Integration names whose metric series exist from process start.
pub const KNOWN_INTEGRATIONS: &[&str] = &[
    "discord",
    "email",
    "msteams",
    "opsgenie",
    "pagerduty",
    "pushover",
    "slack",
    "sns",
    "telegram",
    "victorops",
    "webex",
    "webhook",
    "wechat",
];

/// A named destination with its ordered integrations. Replaced wholesale on
/// config reload.
pub struct Receiver {
    group_name: String,
    active: bool,
    integrations: Vec<Arc<Integration>>,
}

impl Receiver {
    pub fn new(
        group_name: impl Into<String>,
        active: bool,
        integrations: Vec<Arc<Integration>>,
    ) -> Self {
        Self {
            group_name: group_name.into(),
            active,
            integrations,
        }
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn integrations(&self) -> &[Arc<Integration>] {
        &self.integrations
    }
}

/// Stateless factory assembling the per-receiver pipelines:
///
/// `MultiStage{ mute(inhibit), time-active, time-mute, mute(silence),
/// Fanout[ per-integration MultiStage{ dedup, retry, clear-state } ] }`
pub struct PipelineBuilder {
    metrics: Arc<NotifyMetrics>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(NotifyMetrics::new(KNOWN_INTEGRATIONS.iter().copied())),
        }
    }

    pub fn metrics(&self) -> Arc<NotifyMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn build(
        &self,
        kv: Arc<dyn KvStore>,
        receivers: &[Receiver],
        inhibitor: Arc<dyn Muter>,
        silencer: Arc<dyn Muter>,
        times: Arc<IntervalTable>,
    ) -> RoutingStage {
        let inhibit: Arc<dyn Stage> = Arc::new(MuteStage::new(inhibitor));
        let time_active: Arc<dyn Stage> = Arc::new(TimeActiveStage::new(Arc::clone(&times)));
        let time_mute: Arc<dyn Stage> = Arc::new(TimeMuteStage::new(times));
        let silence: Arc<dyn Stage> = Arc::new(MuteStage::new(silencer));

        let mut routes: HashMap<String, Arc<dyn Stage>> = HashMap::with_capacity(receivers.len());
        for receiver in receivers {
            let mut fanout: Vec<Arc<dyn Stage>> = Vec::with_capacity(receiver.integrations.len());
            for integration in &receiver.integrations {
                self.metrics.ensure_integration(integration.name());
                let recv = ReceiverKey {
                    group_name: receiver.group_name.clone(),
                    integration: integration.name().to_string(),
                    idx: integration.index(),
                };
                fanout.push(Arc::new(MultiStage::new(vec![
                    Arc::new(DedupStage::new(Arc::clone(&kv), recv.clone())),
                    Arc::new(RetryStage::new(
                        Arc::clone(integration),
                        receiver.group_name.clone(),
                        self.metrics(),
                    )),
                    Arc::new(ClearStateStage::new(Arc::clone(&kv), recv)),
                ])));
            }

            routes.insert(
                receiver.group_name.clone(),
                Arc::new(MultiStage::new(vec![
                    Arc::clone(&inhibit),
                    Arc::clone(&time_active),
                    Arc::clone(&time_mute),
                    Arc::clone(&silence),
                    Arc::new(FanoutStage::new(fanout)),
                ])),
            );
        }

        RoutingStage::new(routes)
    }
}
