mod exposition;
mod notify_metrics;

pub use exposition::render_prometheus;
pub use notify_metrics::{IntegrationMetrics, NotifyMetrics, LATENCY_BUCKETS};
