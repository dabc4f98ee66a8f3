mod fingerprint;

pub use fingerprint::hash_alert;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label names and values, iterated in name order.
pub type LabelSet = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Firing,
    Resolved,
}

/// An alert as handed to the pipeline by the producer. The pipeline only
/// ever mutates `sent_count`; everything else is read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub labels: LabelSet,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    /// Opaque lifecycle phase assigned by the producer. A phase change
    /// invalidates the deduplication window for the alert.
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub rule_uid: String,
    #[serde(default)]
    pub sent_count: i64,
}

impl Alert {
    pub fn resolved(&self) -> bool {
        self.ends_at.is_some_and(|t| t <= Utc::now())
    }

    pub fn status(&self) -> AlertStatus {
        if self.resolved() {
            AlertStatus::Resolved
        } else {
            AlertStatus::Firing
        }
    }

    pub fn status_str(&self) -> &'static str {
        match self.status() {
            AlertStatus::Firing => "firing",
            AlertStatus::Resolved => "resolved",
        }
    }
}
