use std::sync::Arc;

use async_trait::async_trait;

use crate::alert::Alert;
use crate::error::PipelineError;

use super::integration::Muter;
use super::stage::{Stage, StageOutput};
use super::ExecEnv;

/// Drops every alert the muter suppresses. The stage is oblivious to what
/// backs the predicate; the builder wires it up once with the inhibitor and
/// once with the silencer.
pub struct MuteStage {
    muter: Arc<dyn Muter>,
}

impl MuteStage {
    pub fn new(muter: Arc<dyn Muter>) -> Self {
        Self { muter }
    }
}

#[async_trait]
impl Stage for MuteStage {
    async fn exec(&self, env: ExecEnv, alerts: Vec<Alert>) -> Result<StageOutput, PipelineError> {
        let filtered = alerts
            .into_iter()
            .filter(|a| !self.muter.mutes(&a.labels))
            .collect();
        Ok((env, filtered))
    }
}
