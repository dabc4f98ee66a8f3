use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;

use crate::alert::Alert;
use crate::error::{NotifyError, PipelineError};
use crate::metrics::NotifyMetrics;

use super::integration::Integration;
use super::stage::{Stage, StageOutput};
use super::ExecEnv;

/// Exponential backoff between notify attempts. `max_delay` caps the raw
/// delay before jitter is applied; attempts are unbounded, the loop stops
/// through cancellation or an unrecoverable error.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub factor: f64,
    pub max_delay: Duration,
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            factor: 1.5,
            max_delay: Duration::from_secs(60),
            jitter: 0.5,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let raw = self.initial.as_secs_f64() * self.factor.powi(attempt.min(256) as i32);
        let capped = raw.min(self.max_delay.as_secs_f64());
        apply_jitter(Duration::from_secs_f64(capped), self.jitter)
    }
}

fn apply_jitter(base: Duration, factor: f64) -> Duration {
    if factor <= 0.0 {
        return base;
    }
    let ms = base.as_millis() as f64;
    let jitter_range = ms * factor;
    let random_offset = simple_random_f64() * jitter_range * 2.0 - jitter_range;
    let jittered = (ms + random_offset).max(0.0);
    Duration::from_millis(jittered as u64)
}

fn simple_random_f64() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 10000) as f64 / 10000.0
}

/// Calls one integration until it succeeds, fails unrecoverably, or the
/// execution is cancelled. Cancellation is checked before every attempt so
/// a timed-out execution cannot produce a spurious extra call.
pub struct RetryStage {
    integration: Arc<Integration>,
    group_name: String,
    metrics: Arc<NotifyMetrics>,
    policy: RetryPolicy,
}

impl RetryStage {
    pub fn new(
        integration: Arc<Integration>,
        group_name: impl Into<String>,
        metrics: Arc<NotifyMetrics>,
    ) -> Self {
        Self {
            integration,
            group_name: group_name.into(),
            metrics,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn canceled_error(&self, attempts: u32, last_err: Option<NotifyError>) -> PipelineError {
        PipelineError::Notify {
            context: format!(
                "{}/{}: notify retry canceled after {} attempts",
                self.group_name, self.integration, attempts
            ),
            source: last_err.unwrap_or_else(|| NotifyError::retryable("context canceled")),
        }
    }

    async fn run(&self, env: ExecEnv, alerts: Vec<Alert>) -> Result<StageOutput, PipelineError> {
        let to_send: Vec<Alert> = if !self.integration.send_resolved() {
            let firing = env
                .firing_alerts()
                .ok_or(PipelineError::FiringAlertsMissing)?;
            // Nothing fired: report the resolved alerts as handled so the
            // downstream bookkeeping still sees them.
            if firing.is_empty() {
                return Ok((env, alerts));
            }
            alerts.iter().filter(|a| !a.resolved()).cloned().collect()
        } else {
            alerts.clone()
        };

        let name = self.integration.name().to_string();
        let group_key = env.group_key().unwrap_or_default().to_string();
        let mut attempt: u32 = 0;
        let mut last_err: Option<NotifyError> = None;

        loop {
            attempt += 1;

            // Non-blocking check first, so a finished deadline wins over a
            // ready tick.
            if env.cancel_token().is_cancelled() {
                return Err(self.canceled_error(attempt, last_err));
            }

            let delay = if attempt == 1 {
                Duration::ZERO
            } else {
                self.policy.delay_for_attempt(attempt - 2)
            };
            tokio::select! {
                _ = env.cancel_token().cancelled() => {
                    return Err(self.canceled_error(attempt, last_err));
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let at = Utc::now();
            let started = Instant::now();
            let result = tokio::select! {
                _ = env.cancel_token().cancelled() => {
                    return Err(self.canceled_error(attempt, last_err));
                }
                r = self.integration.notify(&env, &to_send) => r,
            };
            let duration = started.elapsed();

            self.metrics.observe_latency(&name, duration.as_secs_f64());
            self.metrics.inc_requests(&name);
            self.integration.report(at, duration, result.as_ref().err());

            match result {
                Ok(()) => {
                    if attempt <= 1 {
                        tracing::debug!(
                            receiver = %self.group_name,
                            integration = %self.integration,
                            group_key = %group_key,
                            attempts = attempt,
                            "notify success"
                        );
                    } else {
                        tracing::info!(
                            receiver = %self.group_name,
                            integration = %self.integration,
                            group_key = %group_key,
                            attempts = attempt,
                            "notify success"
                        );
                    }
                    return Ok((env, alerts));
                }
                Err(err) => {
                    self.metrics.inc_requests_failed(&name);
                    if !err.retryable {
                        return Err(PipelineError::Notify {
                            context: format!(
                                "{}/{}: notify retry canceled due to unrecoverable error after {} attempts",
                                self.group_name, self.integration, attempt
                            ),
                            source: err,
                        });
                    }
                    // Log once per distinct error, not once per tick.
                    let repeated = last_err
                        .as_ref()
                        .is_some_and(|prev| prev.message == err.message);
                    if !env.cancel_token().is_cancelled() && !repeated {
                        tracing::warn!(
                            receiver = %self.group_name,
                            integration = %self.integration,
                            group_key = %group_key,
                            attempts = attempt,
                            error = %err,
                            "notify attempt failed, will retry later"
                        );
                    }
                    last_err = Some(err);
                }
            }
        }
    }
}

#[async_trait]
impl Stage for RetryStage {
    async fn exec(&self, env: ExecEnv, alerts: Vec<Alert>) -> Result<StageOutput, PipelineError> {
        self.metrics.inc_notifications(self.integration.name());
        match self.run(env, alerts).await {
            Ok(out) => Ok(out),
            Err(err) => {
                self.metrics
                    .inc_notifications_failed(self.integration.name(), err.failure_reason());
                Err(err)
            }
        }
    }
}
