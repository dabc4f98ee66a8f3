use chrono::{DateTime, Timelike, Utc};

use klaxon_core::pipeline::{IntervalTable, TimeInterval};

use crate::config::TimeIntervalConfig;

/// Daily UTC window, start inclusive, end exclusive. Wraps past midnight
/// when `start_hour > end_hour`; `start_hour == end_hour` is empty.
pub struct HourWindow {
    start_hour: u32,
    end_hour: u32,
}

impl HourWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }
}

impl TimeInterval for HourWindow {
    fn contains_time(&self, now: DateTime<Utc>) -> bool {
        let hour = now.hour();
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

pub fn build_interval_table(configs: &[TimeIntervalConfig]) -> IntervalTable {
    let mut table = IntervalTable::new();
    for cfg in configs {
        let windows = cfg
            .windows
            .iter()
            .map(|w| Box::new(HourWindow::new(w.start_hour, w.end_hour)) as Box<dyn TimeInterval>)
            .collect();
        table.insert(cfg.name.clone(), windows);
    }
    table
}
