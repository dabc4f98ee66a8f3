use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::alert::{Alert, LabelSet};
use crate::error::NotifyError;

use super::ExecEnv;

/// One transport. Implementations decide retryability and failure reason
/// through the returned `NotifyError`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, env: &ExecEnv, alerts: &[Alert]) -> Result<(), NotifyError>;
}

/// Static policy: should resolved notifications be sent at all.
pub trait ResolvedSender: Send + Sync {
    fn send_resolved(&self) -> bool;
}

/// Predicate deciding whether an alert is suppressed. Backed by the
/// inhibitor in one pipeline position and by the silencer in another.
pub trait Muter: Send + Sync {
    fn mutes(&self, labels: &LabelSet) -> bool;
}

/// Outcome of the most recent notify attempt, kept for introspection.
#[derive(Debug, Clone)]
pub struct AttemptReport {
    pub at: DateTime<Utc>,
    pub duration: Duration,
    pub error: Option<String>,
}

/// A notifier bound to a receiver, uniquely identified by `(name, idx)`
/// within it.
pub struct Integration {
    notifier: Arc<dyn Notifier>,
    rs: Arc<dyn ResolvedSender>,
    name: String,
    idx: u32,
    last_attempt: RwLock<Option<AttemptReport>>,
}

impl Integration {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        rs: Arc<dyn ResolvedSender>,
        name: impl Into<String>,
        idx: u32,
    ) -> Self {
        Self {
            notifier,
            rs,
            name: name.into(),
            idx,
            last_attempt: RwLock::new(None),
        }
    }

    pub async fn notify(&self, env: &ExecEnv, alerts: &[Alert]) -> Result<(), NotifyError> {
        self.notifier.notify(env, alerts).await
    }

    pub fn send_resolved(&self) -> bool {
        self.rs.send_resolved()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> u32 {
        self.idx
    }

    pub fn report(&self, at: DateTime<Utc>, duration: Duration, error: Option<&NotifyError>) {
        if let Ok(mut slot) = self.last_attempt.write() {
            *slot = Some(AttemptReport {
                at,
                duration,
                error: error.map(|e| e.to_string()),
            });
        }
    }

    pub fn last_report(&self) -> Option<AttemptReport> {
        self.last_attempt.read().ok().and_then(|slot| slot.clone())
    }
}

impl std::fmt::Display for Integration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.name, self.idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopNotifier;

    #[async_trait]
    impl Notifier for NoopNotifier {
        async fn notify(&self, _env: &ExecEnv, _alerts: &[Alert]) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    struct SendAll;

    impl ResolvedSender for SendAll {
        fn send_resolved(&self) -> bool {
            true
        }
    }

    fn integration() -> Integration {
        Integration::new(Arc::new(NoopNotifier), Arc::new(SendAll), "webhook", 0)
    }

    #[test]
    fn display_includes_index() {
        assert_eq!(integration().to_string(), "webhook[0]");
    }

    #[test]
    fn report_overwrites_last_attempt() {
        let i = integration();
        assert!(i.last_report().is_none());

        i.report(Utc::now(), Duration::from_millis(12), None);
        let first = i.last_report().unwrap();
        assert!(first.error.is_none());

        let err = NotifyError::retryable("boom");
        i.report(Utc::now(), Duration::from_millis(30), Some(&err));
        let second = i.last_report().unwrap();
        assert_eq!(second.error.as_deref(), Some("boom"));
        assert_eq!(second.duration, Duration::from_millis(30));
    }
}
