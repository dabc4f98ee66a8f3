use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use klaxon_core::alert::{Alert, LabelSet};
use klaxon_core::error::PipelineError;
use klaxon_core::pipeline::{ExecEnv, RoutingStage, Stage, MIN_TIMEOUT};

/// Per-receiver route settings the dispatcher stamps into every execution
/// environment.
#[derive(Debug, Clone)]
pub struct RouteSettings {
    pub repeat_interval: Duration,
    pub mute_time_intervals: Vec<String>,
    pub active_time_intervals: Vec<String>,
}

/// Executes the routing stage for one alert group under a bounded timeout.
/// Grouping itself happens upstream; the dispatcher only seeds the
/// environment and enforces cancellation.
pub struct Dispatcher {
    routing: Arc<RoutingStage>,
    routes: HashMap<String, RouteSettings>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        routing: Arc<RoutingStage>,
        routes: HashMap<String, RouteSettings>,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            routing,
            routes,
            timeout: notify_timeout.max(MIN_TIMEOUT),
        }
    }

    pub fn has_receiver(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn dispatch(
        &self,
        receiver: &str,
        group_key: String,
        group_labels: LabelSet,
        alerts: Vec<Alert>,
    ) -> Result<(), PipelineError> {
        let route = self
            .routes
            .get(receiver)
            .ok_or_else(|| PipelineError::UnknownReceiver {
                receiver: receiver.to_string(),
                group_key: group_key.clone(),
            })?;

        let cancel = CancellationToken::new();
        let watchdog = {
            let cancel = cancel.clone();
            let timeout = self.timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                cancel.cancel();
            })
        };

        let env = ExecEnv::new()
            .with_receiver(receiver)
            .with_group_key(group_key.clone())
            .with_group_labels(group_labels)
            .with_repeat_interval(route.repeat_interval)
            .with_now(Utc::now())
            .with_mute_time_intervals(route.mute_time_intervals.clone())
            .with_active_time_intervals(route.active_time_intervals.clone())
            .with_cancel_token(cancel);

        let result = self.routing.exec(env, alerts).await;
        watchdog.abort();

        match result {
            Ok(_) => {
                tracing::info!(receiver, group_key = %group_key, "notification pipeline completed");
                Ok(())
            }
            Err(err) => {
                tracing::error!(receiver, group_key = %group_key, error = %err, "notification pipeline failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use klaxon_core::error::NotifyError;
    use klaxon_core::kv::MemoryKv;
    use klaxon_core::pipeline::{
        Integration, Muter, Notifier, PipelineBuilder, Receiver, ResolvedSender,
    };
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingNotifier {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn notify(&self, _env: &ExecEnv, _alerts: &[Alert]) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct SendAll;

    impl ResolvedSender for SendAll {
        fn send_resolved(&self) -> bool {
            true
        }
    }

    struct NeverMutes;

    impl Muter for NeverMutes {
        fn mutes(&self, _labels: &LabelSet) -> bool {
            false
        }
    }

    fn dispatcher(notifier: Arc<CountingNotifier>) -> Dispatcher {
        let builder = PipelineBuilder::new();
        let receivers = vec![Receiver::new(
            "ops",
            true,
            vec![Arc::new(Integration::new(
                notifier,
                Arc::new(SendAll),
                "webhook",
                0,
            ))],
        )];
        let routing = Arc::new(builder.build(
            Arc::new(MemoryKv::new()),
            &receivers,
            Arc::new(NeverMutes),
            Arc::new(NeverMutes),
            Arc::new(Default::default()),
        ));

        let mut routes = HashMap::new();
        routes.insert(
            "ops".to_string(),
            RouteSettings {
                repeat_interval: Duration::from_secs(300),
                mute_time_intervals: Vec::new(),
                active_time_intervals: Vec::new(),
            },
        );
        Dispatcher::new(routing, routes, Duration::from_secs(30))
    }

    fn alert() -> Alert {
        Alert {
            labels: [("alertname".to_string(), "Cpu".to_string())].into(),
            starts_at: Utc::now(),
            ends_at: None,
            phase: "active".into(),
            rule_uid: "r-1".into(),
            sent_count: 0,
        }
    }

    #[tokio::test]
    async fn dispatch_runs_pipeline() {
        let notifier = Arc::new(CountingNotifier {
            calls: AtomicU32::new(0),
        });
        let d = dispatcher(notifier.clone());

        d.dispatch("ops", "g1".into(), LabelSet::new(), vec![alert()])
            .await
            .unwrap();
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dispatch_rejects_unknown_receiver() {
        let notifier = Arc::new(CountingNotifier {
            calls: AtomicU32::new(0),
        });
        let d = dispatcher(notifier);

        let err = d
            .dispatch("dev", "g1".into(), LabelSet::new(), vec![alert()])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "stage for receiver [dev] group [g1] missing");
    }

    #[tokio::test]
    async fn timeout_clamped_to_minimum() {
        let builder = PipelineBuilder::new();
        let routing = Arc::new(builder.build(
            Arc::new(MemoryKv::new()),
            &[],
            Arc::new(NeverMutes),
            Arc::new(NeverMutes),
            Arc::new(Default::default()),
        ));
        let d = Dispatcher::new(routing, HashMap::new(), Duration::from_secs(1));
        assert_eq!(d.timeout(), MIN_TIMEOUT);
    }
}
