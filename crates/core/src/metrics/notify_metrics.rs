use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::FailureReason;

pub const LATENCY_BUCKETS: [f64; 5] = [1.0, 5.0, 10.0, 15.0, 20.0];

#[derive(Debug)]
pub struct IntegrationMetrics {
    notifications: AtomicU64,
    requests: AtomicU64,
    requests_failed: AtomicU64,
    failed_by_reason: [AtomicU64; FailureReason::ALL.len()],
    latency_buckets: [AtomicU64; LATENCY_BUCKETS.len()],
    latency_sum_us: AtomicU64,
    latency_count: AtomicU64,
}

impl IntegrationMetrics {
    fn new() -> Self {
        Self {
            notifications: AtomicU64::new(0),
            requests: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            failed_by_reason: Default::default(),
            latency_buckets: Default::default(),
            latency_sum_us: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
        }
    }

    pub fn notifications_val(&self) -> u64 {
        self.notifications.load(Ordering::Relaxed)
    }

    pub fn requests_val(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn requests_failed_val(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    pub fn failed_val(&self, reason: FailureReason) -> u64 {
        self.failed_by_reason[reason.index()].load(Ordering::Relaxed)
    }

    pub fn latency_bucket_val(&self, idx: usize) -> u64 {
        self.latency_buckets[idx].load(Ordering::Relaxed)
    }

    pub fn latency_vals(&self) -> (u64, u64) {
        (
            self.latency_sum_us.load(Ordering::Relaxed),
            self.latency_count.load(Ordering::Relaxed),
        )
    }

    fn observe_latency(&self, seconds: f64) {
        for (i, bound) in LATENCY_BUCKETS.iter().enumerate() {
            if seconds <= *bound {
                self.latency_buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
        self.latency_sum_us
            .fetch_add((seconds * 1_000_000.0) as u64, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Notification counters and latencies, one slot per integration name.
/// Slots for known integrations are created up front so every series renders
/// zero before the first notification; unknown names register lazily.
#[derive(Debug, Default)]
pub struct NotifyMetrics {
    integrations: DashMap<String, Arc<IntegrationMetrics>>,
}

impl NotifyMetrics {
    pub fn new<'a>(known: impl IntoIterator<Item = &'a str>) -> Self {
        let metrics = Self {
            integrations: DashMap::new(),
        };
        let unique: BTreeSet<&str> = known.into_iter().collect();
        for name in unique {
            metrics.ensure_integration(name);
        }
        metrics
    }

    pub fn ensure_integration(&self, name: &str) {
        self.integrations
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(IntegrationMetrics::new()));
    }

    fn slot(&self, name: &str) -> Arc<IntegrationMetrics> {
        Arc::clone(
            self.integrations
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(IntegrationMetrics::new()))
                .value(),
        )
    }

    pub fn integration(&self, name: &str) -> Option<Arc<IntegrationMetrics>> {
        self.integrations.get(name).map(|e| Arc::clone(e.value()))
    }

    pub fn integration_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.integrations.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn inc_notifications(&self, name: &str) {
        self.slot(name).notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_notifications_failed(&self, name: &str, reason: FailureReason) {
        self.slot(name).failed_by_reason[reason.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_requests(&self, name: &str) {
        self.slot(name).requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_requests_failed(&self, name: &str) {
        self.slot(name).requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, name: &str, seconds: f64) {
        self.slot(name).observe_latency(seconds);
    }
}
