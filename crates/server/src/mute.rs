use std::collections::BTreeMap;

use klaxon_core::alert::LabelSet;
use klaxon_core::pipeline::Muter;

use crate::config::SilenceConfig;

/// Mutes an alert when every matcher of at least one configured silence
/// equals the alert's labels.
pub struct ConfigSilencer {
    silences: Vec<BTreeMap<String, String>>,
}

impl ConfigSilencer {
    pub fn from_config(silences: &[SilenceConfig]) -> Self {
        Self {
            silences: silences.iter().map(|s| s.matchers.clone()).collect(),
        }
    }
}

impl Muter for ConfigSilencer {
    fn mutes(&self, labels: &LabelSet) -> bool {
        self.silences.iter().any(|matchers| {
            !matchers.is_empty()
                && matchers
                    .iter()
                    .all(|(name, value)| labels.get(name) == Some(value))
        })
    }
}

/// Stand-in for the external inhibition engine: inhibits nothing.
pub struct NoopInhibitor;

impl Muter for NoopInhibitor {
    fn mutes(&self, _labels: &LabelSet) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> LabelSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn silencer(matchers: &[(&str, &str)]) -> ConfigSilencer {
        ConfigSilencer::from_config(&[SilenceConfig {
            matchers: matchers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }])
    }

    #[test]
    fn mutes_when_all_matchers_equal() {
        let s = silencer(&[("alertname", "Disk"), ("host", "h1")]);
        assert!(s.mutes(&labels(&[("alertname", "Disk"), ("host", "h1"), ("env", "prod")])));
    }

    #[test]
    fn partial_match_does_not_mute() {
        let s = silencer(&[("alertname", "Disk"), ("host", "h1")]);
        assert!(!s.mutes(&labels(&[("alertname", "Disk"), ("host", "h2")])));
    }

    #[test]
    fn empty_matcher_set_never_mutes() {
        let s = silencer(&[]);
        assert!(!s.mutes(&labels(&[("alertname", "Disk")])));
    }

    #[test]
    fn any_silence_suffices() {
        let s = ConfigSilencer::from_config(&[
            SilenceConfig {
                matchers: [("host".to_string(), "h9".to_string())].into(),
            },
            SilenceConfig {
                matchers: [("alertname".to_string(), "Disk".to_string())].into(),
            },
        ]);
        assert!(s.mutes(&labels(&[("alertname", "Disk"), ("host", "h1")])));
    }

    #[test]
    fn noop_inhibitor_passes_everything() {
        assert!(!NoopInhibitor.mutes(&labels(&[("alertname", "Disk")])));
    }
}
