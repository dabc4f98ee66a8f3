use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;

#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    Validation(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Parse(e) => write!(f, "parse: {e}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_yaml::Error> for LoadError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Parse(e)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_notify_timeout_secs")]
    pub notify_timeout_secs: u64,
    #[serde(default)]
    pub time_intervals: Vec<TimeIntervalConfig>,
    #[serde(default)]
    pub silences: Vec<SilenceConfig>,
    pub receivers: Vec<ReceiverConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeIntervalConfig {
    pub name: String,
    pub windows: Vec<HourWindowConfig>,
}

/// Daily window in UTC hours, `start_hour` inclusive, `end_hour` exclusive.
/// `start_hour > end_hour` wraps past midnight.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HourWindowConfig {
    pub start_hour: u32,
    pub end_hour: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SilenceConfig {
    pub matchers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiverConfig {
    pub name: String,
    #[serde(default = "yes")]
    pub active: bool,
    #[serde(default = "default_repeat_interval_secs")]
    pub repeat_interval_secs: u64,
    #[serde(default)]
    pub mute_time_intervals: Vec<String>,
    #[serde(default)]
    pub active_time_intervals: Vec<String>,
    pub integrations: Vec<IntegrationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegrationConfig {
    Webhook {
        url: String,
        #[serde(default)]
        secret: Option<String>,
        #[serde(default = "yes")]
        send_resolved: bool,
    },
    Slack {
        webhook_url: String,
        #[serde(default)]
        send_resolved: bool,
    },
}

fn default_listen_addr() -> String {
    "0.0.0.0:9093".to_string()
}

fn default_notify_timeout_secs() -> u64 {
    30
}

fn default_repeat_interval_secs() -> u64 {
    4 * 60 * 60
}

fn yes() -> bool {
    true
}

pub fn load_from_file(path: &Path) -> Result<Config, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    load_from_str(&contents)
}

pub fn load_from_str(yaml: &str) -> Result<Config, LoadError> {
    let cfg: Config = serde_yaml::from_str(yaml)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &Config) -> Result<(), LoadError> {
    if cfg.receivers.is_empty() {
        return Err(LoadError::Validation("at least one receiver is required".into()));
    }

    let mut names = HashSet::new();
    let intervals: HashSet<&str> = cfg.time_intervals.iter().map(|t| t.name.as_str()).collect();

    for ti in &cfg.time_intervals {
        for w in &ti.windows {
            if w.start_hour > 23 || w.end_hour > 23 {
                return Err(LoadError::Validation(format!(
                    "time_intervals.{}: hours must be within 0..=23",
                    ti.name
                )));
            }
        }
    }

    for r in &cfg.receivers {
        if r.name.is_empty() {
            return Err(LoadError::Validation("receivers.name must not be empty".into()));
        }
        if !names.insert(r.name.as_str()) {
            return Err(LoadError::Validation(format!(
                "receivers.{}: duplicate receiver name",
                r.name
            )));
        }
        if r.repeat_interval_secs == 0 {
            return Err(LoadError::Validation(format!(
                "receivers.{}: repeat_interval_secs must be > 0",
                r.name
            )));
        }
        for name in r.mute_time_intervals.iter().chain(&r.active_time_intervals) {
            if !intervals.contains(name.as_str()) {
                return Err(LoadError::Validation(format!(
                    "receivers.{}: unknown time interval {name}",
                    r.name
                )));
            }
        }
        for integration in &r.integrations {
            let url = match integration {
                IntegrationConfig::Webhook { url, .. } => url,
                IntegrationConfig::Slack { webhook_url, .. } => webhook_url,
            };
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(LoadError::Validation(format!(
                    "receivers.{}: url must start with http:// or https://",
                    r.name
                )));
            }
        }
    }

    Ok(())
}
