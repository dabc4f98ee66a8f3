use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::alert::Alert;
use crate::error::PipelineError;

use super::ExecEnv;

pub type StageOutput = (ExecEnv, Vec<Alert>);

/// One unit of the pipeline. Stages take the environment and a batch of
/// alerts and hand back a possibly augmented environment and a possibly
/// filtered batch.
#[async_trait]
pub trait Stage: Send + Sync {
    async fn exec(&self, env: ExecEnv, alerts: Vec<Alert>) -> Result<StageOutput, PipelineError>;
}

/// Runs stages left to right. Short-circuits once the working batch is
/// empty; the first stage error terminates the run.
pub struct MultiStage {
    stages: Vec<Arc<dyn Stage>>,
}

impl MultiStage {
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self { stages }
    }
}

#[async_trait]
impl Stage for MultiStage {
    async fn exec(
        &self,
        mut env: ExecEnv,
        mut alerts: Vec<Alert>,
    ) -> Result<StageOutput, PipelineError> {
        for stage in &self.stages {
            if alerts.is_empty() {
                return Ok((env, Vec::new()));
            }
            (env, alerts) = stage.exec(env, alerts).await?;
        }
        Ok((env, alerts))
    }
}

/// Runs substages concurrently over the same input and waits for all of
/// them. Failures are aggregated so a failing integration never masks a
/// succeeding one.
pub struct FanoutStage {
    stages: Vec<Arc<dyn Stage>>,
}

impl FanoutStage {
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self { stages }
    }
}

#[async_trait]
impl Stage for FanoutStage {
    async fn exec(&self, env: ExecEnv, alerts: Vec<Alert>) -> Result<StageOutput, PipelineError> {
        let mut handles = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let stage = Arc::clone(stage);
            let env = env.clone();
            let alerts = alerts.clone();
            handles.push(tokio::spawn(async move { stage.exec(env, alerts).await }));
        }

        let mut errors = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => errors.push(err),
                Err(err) => errors.push(PipelineError::Internal(format!(
                    "pipeline task failed: {err}"
                ))),
            }
        }

        if errors.is_empty() {
            Ok((env, Vec::new()))
        } else {
            Err(PipelineError::Fanout(errors))
        }
    }
}

/// Dispatches to the per-receiver pipeline named by the environment.
pub struct RoutingStage {
    routes: HashMap<String, Arc<dyn Stage>>,
}

impl RoutingStage {
    pub fn new(routes: HashMap<String, Arc<dyn Stage>>) -> Self {
        Self { routes }
    }

    pub fn has_receiver(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn receiver_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.routes.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl Stage for RoutingStage {
    async fn exec(&self, env: ExecEnv, alerts: Vec<Alert>) -> Result<StageOutput, PipelineError> {
        let receiver = env
            .receiver()
            .ok_or(PipelineError::ReceiverMissing)?
            .to_string();
        let stage = self
            .routes
            .get(&receiver)
            .ok_or_else(|| PipelineError::UnknownReceiver {
                receiver: receiver.clone(),
                group_key: env.group_key().unwrap_or_default().to_string(),
            })?;
        stage.exec(env, alerts).await
    }
}
