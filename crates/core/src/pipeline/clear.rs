use std::sync::Arc;

use async_trait::async_trait;

use crate::alert::Alert;
use crate::error::PipelineError;
use crate::kv::KvStore;

use super::dedup::{state_key, ReceiverKey, ALERT_SENT_PREFIX};
use super::stage::{Stage, StageOutput};
use super::ExecEnv;

/// Post-delivery bookkeeping. Every state key a rule has claimed is indexed
/// under the rule uid so resolving the rule can clean up in bulk; resolved
/// alerts delete their keys and drop out of the index. Runs after
/// RetryStage, so only delivered alerts reach it.
pub struct ClearStateStage {
    kv: Arc<dyn KvStore>,
    recv: ReceiverKey,
}

impl ClearStateStage {
    pub fn new(kv: Arc<dyn KvStore>, recv: ReceiverKey) -> Self {
        Self { kv, recv }
    }

    fn keys_for(&self, group_key: &str, hashes: &[u64]) -> Vec<String> {
        let mut keys = Vec::new();
        for hash in hashes {
            let skey = state_key(group_key, &self.recv, *hash);
            keys.push(format!("{ALERT_SENT_PREFIX}{skey}"));
            keys.push(skey);
        }
        keys
    }
}

#[async_trait]
impl Stage for ClearStateStage {
    async fn exec(&self, env: ExecEnv, alerts: Vec<Alert>) -> Result<StageOutput, PipelineError> {
        let group_key = env
            .group_key()
            .ok_or(PipelineError::GroupKeyMissing)?
            .to_string();
        let Some(rule_uid) = env.rule_uid().map(str::to_string) else {
            return Ok((env, alerts));
        };

        let firing = env.firing_alerts().map(<[u64]>::to_vec).unwrap_or_default();
        if !firing.is_empty() {
            let keys = self.keys_for(&group_key, &firing);
            if let Err(err) = self.kv.sadd(&rule_uid, &keys).await {
                tracing::error!(rule_uid = %rule_uid, error = %err, "indexing state keys under rule failed");
            }
        }

        let resolved = env
            .resolved_alerts()
            .map(<[u64]>::to_vec)
            .unwrap_or_default();
        if !resolved.is_empty() {
            let keys = self.keys_for(&group_key, &resolved);
            if let Err(err) = self.kv.del(&keys).await {
                tracing::error!(rule_uid = %rule_uid, error = %err, "deleting state keys failed");
            }
            if let Err(err) = self.kv.srem(&rule_uid, &keys).await {
                tracing::error!(rule_uid = %rule_uid, error = %err, "removing state keys from rule index failed");
            }
        }

        Ok((env, alerts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;
    use chrono::Utc;
    use std::time::Duration;

    fn recv() -> ReceiverKey {
        ReceiverKey {
            group_name: "ops".into(),
            integration: "webhook".into(),
            idx: 0,
        }
    }

    fn alert() -> Alert {
        Alert {
            labels: [("alertname".to_string(), "Cpu".to_string())].into(),
            starts_at: Utc::now(),
            ends_at: None,
            phase: "active".into(),
            rule_uid: "rule-1".into(),
            sent_count: 0,
        }
    }

    #[tokio::test]
    async fn firing_hashes_indexed_under_rule() {
        let kv = Arc::new(MemoryKv::new());
        let stage = ClearStateStage::new(kv.clone(), recv());

        let env = ExecEnv::new()
            .with_group_key("g1")
            .with_rule_uid("rule-1")
            .with_firing_alerts(vec![7])
            .with_resolved_alerts(Vec::new());
        stage.exec(env, vec![alert()]).await.unwrap();

        let skey = state_key("g1", &recv(), 7);
        let members = kv.members("rule-1");
        assert!(members.contains(&skey));
        assert!(members.contains(&format!("{ALERT_SENT_PREFIX}{skey}")));
    }

    #[tokio::test]
    async fn resolved_hashes_deleted_and_deindexed() {
        let kv = Arc::new(MemoryKv::new());
        let skey = state_key("g1", &recv(), 7);
        let sent = format!("{ALERT_SENT_PREFIX}{skey}");
        kv.set_if_absent(&skey, "active", Duration::ZERO).await.unwrap();
        kv.set_if_absent(&sent, "3", Duration::ZERO).await.unwrap();
        kv.sadd("rule-1", &[skey.clone(), sent.clone()]).await.unwrap();

        let stage = ClearStateStage::new(kv.clone(), recv());
        let env = ExecEnv::new()
            .with_group_key("g1")
            .with_rule_uid("rule-1")
            .with_firing_alerts(Vec::new())
            .with_resolved_alerts(vec![7]);
        stage.exec(env, vec![alert()]).await.unwrap();

        assert!(!kv.exists(&skey).await.unwrap());
        assert!(!kv.exists(&sent).await.unwrap());
        assert!(kv.members("rule-1").is_empty());
    }

    #[tokio::test]
    async fn no_rule_uid_is_a_noop() {
        let kv = Arc::new(MemoryKv::new());
        let stage = ClearStateStage::new(kv.clone(), recv());

        let env = ExecEnv::new()
            .with_group_key("g1")
            .with_firing_alerts(vec![7]);
        let (_, out) = stage.exec(env, vec![alert()]).await.unwrap();
        assert_eq!(out.len(), 1);
        assert!(kv.members("rule-1").is_empty());
    }

    #[tokio::test]
    async fn missing_group_key_is_hard_error() {
        let stage = ClearStateStage::new(Arc::new(MemoryKv::new()), recv());
        let err = stage
            .exec(ExecEnv::new().with_rule_uid("rule-1"), vec![alert()])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::GroupKeyMissing));
    }

    #[tokio::test]
    async fn built_key_lists_have_no_empty_members() {
        let stage = ClearStateStage::new(Arc::new(MemoryKv::new()), recv());
        let keys = stage.keys_for("g1", &[1, 2]);
        assert_eq!(keys.len(), 4);
        assert!(keys.iter().all(|k| !k.is_empty()));
    }
}
