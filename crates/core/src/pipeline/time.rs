use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::alert::Alert;
use crate::error::PipelineError;

use super::stage::{Stage, StageOutput};
use super::ExecEnv;

/// One time-window predicate from the configuration calendar.
pub trait TimeInterval: Send + Sync {
    fn contains_time(&self, now: DateTime<Utc>) -> bool;
}

/// Named interval lists, immutable between config reloads.
pub type IntervalTable = HashMap<String, Vec<Box<dyn TimeInterval>>>;

fn in_time_intervals(
    now: DateTime<Utc>,
    times: &IntervalTable,
    names: &[String],
) -> Result<bool, PipelineError> {
    for name in names {
        let windows = times
            .get(name)
            .ok_or_else(|| PipelineError::UnknownTimeInterval { name: name.clone() })?;
        if windows.iter().any(|w| w.contains_time(now)) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Drops the whole batch while the current time is inside one of the
/// route's mute windows.
pub struct TimeMuteStage {
    times: Arc<IntervalTable>,
}

impl TimeMuteStage {
    pub fn new(times: Arc<IntervalTable>) -> Self {
        Self { times }
    }
}

#[async_trait]
impl Stage for TimeMuteStage {
    async fn exec(&self, env: ExecEnv, alerts: Vec<Alert>) -> Result<StageOutput, PipelineError> {
        let names = match env.mute_time_intervals() {
            Some(names) => names.to_vec(),
            None => return Ok((env, alerts)),
        };
        let now = env.now().ok_or(PipelineError::NowMissing)?;

        if in_time_intervals(now, &self.times, &names)? {
            tracing::debug!(receiver = env.receiver().unwrap_or_default(), "notifications not sent, route is within mute time");
            return Ok((env, Vec::new()));
        }
        Ok((env, alerts))
    }
}

/// Drops the whole batch while the current time is outside all of the
/// route's active windows. No configured windows means always active.
pub struct TimeActiveStage {
    times: Arc<IntervalTable>,
}

impl TimeActiveStage {
    pub fn new(times: Arc<IntervalTable>) -> Self {
        Self { times }
    }
}

#[async_trait]
impl Stage for TimeActiveStage {
    async fn exec(&self, env: ExecEnv, alerts: Vec<Alert>) -> Result<StageOutput, PipelineError> {
        let names = match env.active_time_intervals() {
            Some(names) if !names.is_empty() => names.to_vec(),
            _ => return Ok((env, alerts)),
        };
        let now = env.now().ok_or(PipelineError::NowMissing)?;

        if !in_time_intervals(now, &self.times, &names)? {
            tracing::debug!(receiver = env.receiver().unwrap_or_default(), "notifications not sent, route is not within active time");
            return Ok((env, Vec::new()));
        }
        Ok((env, alerts))
    }
}
