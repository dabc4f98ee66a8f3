use std::sync::Arc;

use async_trait::async_trait;

use crate::alert::{hash_alert, Alert};
use crate::error::PipelineError;
use crate::kv::KvStore;

use super::stage::{Stage, StageOutput};
use super::ExecEnv;

pub const ALERT_SENT_PREFIX: &str = "alert-sent-";

/// Identifies one integration of one receiver inside the shared store.
#[derive(Debug, Clone)]
pub struct ReceiverKey {
    pub group_name: String,
    pub integration: String,
    pub idx: u32,
}

impl std::fmt::Display for ReceiverKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group_name, self.integration, self.idx)
    }
}

/// State key marking that an alert was delivered within the current repeat
/// window: `<groupKey>:<groupName>:<integration>:<idx>:<hash>`.
pub fn state_key(group_key: &str, recv: &ReceiverKey, hash: u64) -> String {
    format!("{group_key}:{recv}:{hash}")
}

fn sent_key(skey: &str) -> String {
    format!("{ALERT_SENT_PREFIX}{skey}")
}

/// Decides per alert whether the integration actually needs to be called.
/// Firing alerts claim a state key with the repeat-interval TTL through an
/// atomic set-if-absent; resolved alerts pass only while their firing
/// counterpart's key still exists. Store failures skip the affected alert
/// and never fail the batch.
pub struct DedupStage {
    kv: Arc<dyn KvStore>,
    recv: ReceiverKey,
}

impl DedupStage {
    pub fn new(kv: Arc<dyn KvStore>, recv: ReceiverKey) -> Self {
        Self { kv, recv }
    }
}

#[async_trait]
impl Stage for DedupStage {
    async fn exec(
        &self,
        mut env: ExecEnv,
        alerts: Vec<Alert>,
    ) -> Result<StageOutput, PipelineError> {
        let group_key = env
            .group_key()
            .ok_or(PipelineError::GroupKeyMissing)?
            .to_string();
        let repeat_interval = env
            .repeat_interval()
            .ok_or(PipelineError::RepeatIntervalMissing)?;

        let mut firing = Vec::new();
        let mut resolved = Vec::new();
        let mut needs_update = Vec::new();

        for mut alert in alerts {
            let hash = hash_alert(&alert);
            let skey = state_key(&group_key, &self.recv, hash);
            let rule_uid = alert.rule_uid.clone();

            if alert.resolved() {
                resolved.push(hash);
                let exists = match self.kv.exists(&skey).await {
                    Ok(v) => v,
                    Err(err) => {
                        tracing::error!(state_key = %skey, error = %err, "exists check on state key failed");
                        continue;
                    }
                };
                // Only alerts whose firing notification went out get a
                // resolved one.
                if exists {
                    if let Ok(Some(count)) = self.kv.get(&sent_key(&skey)).await {
                        if let Ok(count) = count.parse::<i64>() {
                            alert.sent_count = count;
                        }
                    }
                    needs_update.push(alert);
                }
            } else {
                match self.kv.get(&skey).await {
                    Ok(Some(prev)) if !prev.is_empty() && prev != alert.phase => {
                        // A phase transition invalidates the dedup window.
                        let _ = self.kv.del(std::slice::from_ref(&skey)).await;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::error!(state_key = %skey, error = %err, "reading phase from state key failed");
                    }
                }

                let created = match self
                    .kv
                    .set_if_absent(&skey, &alert.phase, repeat_interval)
                    .await
                {
                    Ok(v) => v,
                    Err(err) => {
                        tracing::error!(state_key = %skey, error = %err, "claiming state key failed");
                        continue;
                    }
                };
                if created {
                    firing.push(hash);
                    if let Ok(count) = self.kv.incr(&sent_key(&skey)).await {
                        alert.sent_count = count;
                    }
                    needs_update.push(alert);
                }
            }

            env = env.with_rule_uid(rule_uid);
        }

        env = env
            .with_firing_alerts(firing)
            .with_resolved_alerts(resolved);
        Ok((env, needs_update))
    }
}
