//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use pv_monitor::config::PlantConfig;
use pv_monitor::monitor::Monitor;
use pv_monitor::plant::{Inverter, Plant, PvString};
use pv_monitor::sim::types::{MetricKind, Reading};

/// Monitor over the two-inverter dashboard preset.
pub fn dashboard_monitor() -> Monitor {
    Monitor::from_config(&PlantConfig::dashboard()).expect("dashboard preset should build")
}

/// Two 30 kW inverters with two strings each; `inv2` online per `second_online`.
pub fn two_inverter_plant(second_online: bool) -> Plant {
    let strings = |prefix: &str| {
        vec![
            PvString::new(format!("{prefix}-A"), 595.0, 14.5).expect("valid string"),
            PvString::new(format!("{prefix}-B"), 594.0, 14.3).expect("valid string"),
        ]
    };
    let inv1 = Inverter::new("inv1", "Inverter 01", 30.0, strings("ST1")).expect("valid inverter");
    let inv2 = Inverter::new("inv2", "Inverter 02", 30.0, strings("ST2"))
        .expect("valid inverter")
        .with_online(second_online);
    Plant::new("Test Plant", vec![inv1, inv2]).expect("valid plant")
}

/// Midnight at the start of `date`.
pub fn midnight(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .expect("valid date")
        .and_time(NaiveTime::MIN)
}

/// 24 hourly power readings for one day, `kw(hour)` each.
pub fn hourly_power(start: NaiveDateTime, kw: impl Fn(i64) -> f64) -> Vec<Reading> {
    (0..24)
        .map(|h| Reading::new(start + Duration::hours(h), MetricKind::Power, kw(h)))
        .collect()
}
