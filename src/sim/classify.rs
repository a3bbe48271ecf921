//! Threshold classification for gauges and raw readings.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::{MetricKind, Reading};

/// Display tier of a classified value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Normal,
    Warning,
    Critical,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
        })
    }
}

/// Warning and critical levels; both boundaries belong to the upper tier.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
}

impl Thresholds {
    pub const fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::new(70.0, 90.0)
    }
}

/// Classifies a value: below `warning` is normal, from `warning` up to
/// (but excluding) `critical` is a warning, `critical` and above is critical.
///
/// Total over all inputs; NaN compares false everywhere and lands in
/// [`Status::Normal`].
///
/// # Examples
///
/// ```
/// use pv_monitor::sim::classify::{Status, Thresholds, classify};
///
/// let t = Thresholds::new(70.0, 90.0);
/// assert_eq!(classify(70.0, t), Status::Warning);
/// assert_eq!(classify(89.999, t), Status::Warning);
/// assert_eq!(classify(90.0, t), Status::Critical);
/// assert_eq!(classify(-5.0, t), Status::Normal);
/// ```
pub fn classify(value: f64, thresholds: Thresholds) -> Status {
    if value >= thresholds.critical {
        Status::Critical
    } else if value >= thresholds.warning {
        Status::Warning
    } else {
        Status::Normal
    }
}

/// Gauge fill percentage, `value / max * 100` clamped to `[0, 100]`.
///
/// A non-positive `max` yields 0.
pub fn gauge_percent(value: f64, max: f64) -> f64 {
    if max <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    (value / max * 100.0).clamp(0.0, 100.0)
}

/// Installed thresholds per metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSet {
    /// Performance shortfall, in percent below expected generation.
    pub performance: Thresholds,
    /// Inverter load gauge, in percent of rated output.
    pub load: Thresholds,
    /// Equipment temperature (°C).
    pub temperature: Thresholds,
    /// Inverter AC voltage (V).
    pub voltage: Thresholds,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            performance: Thresholds::new(5.0, 15.0),
            load: Thresholds::default(),
            temperature: Thresholds::new(55.0, 65.0),
            voltage: Thresholds::new(395.0, 400.0),
        }
    }
}

impl ThresholdSet {
    /// Thresholds installed for a raw metric, if any.
    pub fn for_metric(&self, kind: MetricKind) -> Option<Thresholds> {
        match kind {
            MetricKind::Temperature => Some(self.temperature),
            MetricKind::Voltage => Some(self.voltage),
            _ => None,
        }
    }

    /// Classifies a reading; `None` when its metric has no thresholds.
    pub fn classify_reading(&self, reading: &Reading) -> Option<Status> {
        self.for_metric(reading.kind)
            .map(|t| classify(reading.value, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    const T: Thresholds = Thresholds::new(70.0, 90.0);

    #[test]
    fn boundaries_belong_to_upper_tier() {
        assert_eq!(classify(69.999, T), Status::Normal);
        assert_eq!(classify(70.0, T), Status::Warning);
        assert_eq!(classify(89.999, T), Status::Warning);
        assert_eq!(classify(90.0, T), Status::Critical);
    }

    #[test]
    fn total_over_out_of_scale_values() {
        assert_eq!(classify(-5.0, T), Status::Normal);
        assert_eq!(classify(250.0, T), Status::Critical);
        assert_eq!(classify(f64::INFINITY, T), Status::Critical);
        assert_eq!(classify(f64::NEG_INFINITY, T), Status::Normal);
        assert_eq!(classify(f64::NAN, T), Status::Normal);
    }

    #[test]
    fn gauge_clamps() {
        assert_eq!(gauge_percent(150.0, 100.0), 100.0);
        assert_eq!(gauge_percent(-3.0, 100.0), 0.0);
        assert_eq!(gauge_percent(27.5, 55.0), 50.0);
        assert_eq!(gauge_percent(10.0, 0.0), 0.0);
    }

    #[test]
    fn readings_without_thresholds_are_unclassified() {
        let set = ThresholdSet::default();
        let at = NaiveDateTime::default();
        let hot = Reading::new(at, MetricKind::Temperature, 66.0);
        let power = Reading::new(at, MetricKind::Power, 20.0);
        assert_eq!(set.classify_reading(&hot), Some(Status::Critical));
        assert_eq!(set.classify_reading(&power), None);
    }
}
