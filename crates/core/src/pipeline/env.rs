use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::alert::LabelSet;

/// Per-execution environment threaded through the stages. The dispatcher
/// fills in the receiver/group fields; DedupStage adds the firing/resolved
/// hash lists and the rule uid for the stages behind it. Fan-out hands each
/// child its own clone.
#[derive(Debug, Clone, Default)]
pub struct ExecEnv {
    receiver: Option<String>,
    group_key: Option<String>,
    group_labels: Option<LabelSet>,
    repeat_interval: Option<Duration>,
    now: Option<DateTime<Utc>>,
    mute_time_intervals: Option<Vec<String>>,
    active_time_intervals: Option<Vec<String>>,
    firing_alerts: Option<Vec<u64>>,
    resolved_alerts: Option<Vec<u64>>,
    rule_uid: Option<String>,
    cancel: CancellationToken,
}

impl ExecEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }

    pub fn with_group_key(mut self, group_key: impl Into<String>) -> Self {
        self.group_key = Some(group_key.into());
        self
    }

    pub fn with_group_labels(mut self, labels: LabelSet) -> Self {
        self.group_labels = Some(labels);
        self
    }

    pub fn with_repeat_interval(mut self, interval: Duration) -> Self {
        self.repeat_interval = Some(interval);
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn with_mute_time_intervals(mut self, names: Vec<String>) -> Self {
        self.mute_time_intervals = Some(names);
        self
    }

    pub fn with_active_time_intervals(mut self, names: Vec<String>) -> Self {
        self.active_time_intervals = Some(names);
        self
    }

    pub fn with_firing_alerts(mut self, hashes: Vec<u64>) -> Self {
        self.firing_alerts = Some(hashes);
        self
    }

    pub fn with_resolved_alerts(mut self, hashes: Vec<u64>) -> Self {
        self.resolved_alerts = Some(hashes);
        self
    }

    pub fn with_rule_uid(mut self, uid: impl Into<String>) -> Self {
        self.rule_uid = Some(uid.into());
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn receiver(&self) -> Option<&str> {
        self.receiver.as_deref()
    }

    pub fn group_key(&self) -> Option<&str> {
        self.group_key.as_deref()
    }

    pub fn group_labels(&self) -> Option<&LabelSet> {
        self.group_labels.as_ref()
    }

    pub fn repeat_interval(&self) -> Option<Duration> {
        self.repeat_interval
    }

    pub fn now(&self) -> Option<DateTime<Utc>> {
        self.now
    }

    pub fn mute_time_intervals(&self) -> Option<&[String]> {
        self.mute_time_intervals.as_deref()
    }

    pub fn active_time_intervals(&self) -> Option<&[String]> {
        self.active_time_intervals.as_deref()
    }

    pub fn firing_alerts(&self) -> Option<&[u64]> {
        self.firing_alerts.as_deref()
    }

    pub fn resolved_alerts(&self) -> Option<&[u64]> {
        self.resolved_alerts.as_deref()
    }

    pub fn rule_uid(&self) -> Option<&str> {
        self.rule_uid.as_deref()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_default_to_unset() {
        let env = ExecEnv::new();
        assert!(env.receiver().is_none());
        assert!(env.group_key().is_none());
        assert!(env.repeat_interval().is_none());
        assert!(env.firing_alerts().is_none());
        assert!(!env.cancel_token().is_cancelled());
    }

    #[test]
    fn setters_populate_fields() {
        let env = ExecEnv::new()
            .with_receiver("ops")
            .with_group_key("g1")
            .with_repeat_interval(Duration::from_secs(300))
            .with_mute_time_intervals(vec!["weekend".into()])
            .with_firing_alerts(vec![1, 2])
            .with_rule_uid("rule-9");

        assert_eq!(env.receiver(), Some("ops"));
        assert_eq!(env.group_key(), Some("g1"));
        assert_eq!(env.repeat_interval(), Some(Duration::from_secs(300)));
        assert_eq!(env.mute_time_intervals(), Some(&["weekend".to_string()][..]));
        assert_eq!(env.firing_alerts(), Some(&[1u64, 2][..]));
        assert_eq!(env.rule_uid(), Some("rule-9"));
    }

    #[test]
    fn clones_share_cancellation() {
        let env = ExecEnv::new();
        let child = env.clone();
        env.cancel_token().cancel();
        assert!(child.cancel_token().is_cancelled());
    }
}
