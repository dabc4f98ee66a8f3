mod builder;
mod clear;
mod dedup;
mod env;
mod integration;
mod mute;
mod retry;
mod stage;
mod time;

pub use builder::{PipelineBuilder, Receiver, KNOWN_INTEGRATIONS};
pub use clear::ClearStateStage;
pub use dedup::{state_key, DedupStage, ReceiverKey, ALERT_SENT_PREFIX};
pub use env::ExecEnv;
pub use integration::{AttemptReport, Integration, Muter, Notifier, ResolvedSender};
pub use mute::MuteStage;
pub use retry::{RetryPolicy, RetryStage};
pub use stage::{FanoutStage, MultiStage, RoutingStage, Stage, StageOutput};
pub use time::{IntervalTable, TimeActiveStage, TimeInterval, TimeMuteStage};

use std::time::Duration;

/// Minimum timeout imposed on a pipeline execution by the dispatcher.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(10);
