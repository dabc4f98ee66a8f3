use std::fmt::Write;

use crate::error::FailureReason;

use super::notify_metrics::{NotifyMetrics, LATENCY_BUCKETS};

/// Renders all notification series in the Prometheus text format.
pub fn render_prometheus(m: &NotifyMetrics) -> String {
    let mut out = String::with_capacity(4096);
    let names = m.integration_names();

    let _ = writeln!(out, "# TYPE klaxon_notifications_total counter");
    for name in &names {
        if let Some(im) = m.integration(name) {
            let _ = writeln!(
                out,
                "klaxon_notifications_total{{integration=\"{name}\"}} {}",
                im.notifications_val()
            );
        }
    }

    let _ = writeln!(out, "# TYPE klaxon_notifications_failed_total counter");
    for name in &names {
        if let Some(im) = m.integration(name) {
            for reason in FailureReason::ALL {
                let _ = writeln!(
                    out,
                    "klaxon_notifications_failed_total{{integration=\"{name}\",reason=\"{}\"}} {}",
                    reason.as_str(),
                    im.failed_val(reason)
                );
            }
        }
    }

    let _ = writeln!(out, "# TYPE klaxon_notification_requests_total counter");
    for name in &names {
        if let Some(im) = m.integration(name) {
            let _ = writeln!(
                out,
                "klaxon_notification_requests_total{{integration=\"{name}\"}} {}",
                im.requests_val()
            );
        }
    }

    let _ = writeln!(out, "# TYPE klaxon_notification_requests_failed_total counter");
    for name in &names {
        if let Some(im) = m.integration(name) {
            let _ = writeln!(
                out,
                "klaxon_notification_requests_failed_total{{integration=\"{name}\"}} {}",
                im.requests_failed_val()
            );
        }
    }

    let _ = writeln!(out, "# TYPE klaxon_notification_latency_seconds histogram");
    for name in &names {
        if let Some(im) = m.integration(name) {
            for (i, bound) in LATENCY_BUCKETS.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "klaxon_notification_latency_seconds_bucket{{integration=\"{name}\",le=\"{bound}\"}} {}",
                    im.latency_bucket_val(i)
                );
            }
            let (sum_us, count) = im.latency_vals();
            let _ = writeln!(
                out,
                "klaxon_notification_latency_seconds_bucket{{integration=\"{name}\",le=\"+Inf\"}} {count}"
            );
            let _ = writeln!(
                out,
                "klaxon_notification_latency_seconds_sum{{integration=\"{name}\"}} {:.6}",
                sum_us as f64 / 1_000_000.0
            );
            let _ = writeln!(
                out,
                "klaxon_notification_latency_seconds_count{{integration=\"{name}\"}} {count}"
            );
        }
    }

    out
}
