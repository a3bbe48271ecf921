//! Monthly generation targets and their comparison against actuals.

use std::f64::consts::PI;

use chrono::{Datelike, Month, NaiveDate};
use serde::Serialize;

use crate::error::ModelError;
use crate::sim::kpi::{PerformanceRatio, compute_ratio};
use crate::sim::types::{Bucket, Granularity};

/// Twelve editable monthly generation targets (kWh).
///
/// Defaults follow `round(2000 + 1000 cos(2π i / 12))` for month index `i`,
/// peaking in January.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyProjections {
    targets_kwh: [f64; 12],
}

impl Default for MonthlyProjections {
    fn default() -> Self {
        let mut targets_kwh = [0.0; 12];
        for (i, target) in targets_kwh.iter_mut().enumerate() {
            *target = (2000.0 + (i as f64 / 12.0 * 2.0 * PI).cos() * 1000.0).round();
        }
        Self { targets_kwh }
    }
}

/// Target vs actual for one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionRow {
    pub month: u32,
    pub name: &'static str,
    pub target_kwh: f64,
    /// Present only for months that have already closed.
    pub actual_kwh: Option<f64>,
    pub attainment: Option<PerformanceRatio>,
}

impl MonthlyProjections {
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] if `month` is outside 1-12.
    pub fn target(&self, month: u32) -> Result<f64, ModelError> {
        Ok(self.targets_kwh[month_index(month)?])
    }

    /// Replaces one month's target.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] if `month` is outside 1-12 or the
    /// value is negative or not finite.
    pub fn set_target(&mut self, month: u32, kwh: f64) -> Result<(), ModelError> {
        let idx = month_index(month)?;
        if !kwh.is_finite() || kwh < 0.0 {
            return Err(ModelError::invalid(format!(
                "target for month {month} must be finite and >= 0, got {kwh}"
            )));
        }
        self.targets_kwh[idx] = kwh;
        Ok(())
    }

    /// Sum of all twelve targets.
    pub fn annual_target_kwh(&self) -> f64 {
        self.targets_kwh.iter().sum()
    }

    /// Pairs each month's target with the actual from annual buckets.
    ///
    /// Months before `as_of` carry their actual and attainment; the current
    /// and later months of the `as_of` year carry neither.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] unless `annual` holds 12 monthly
    /// buckets of one year.
    pub fn compare(
        &self,
        annual: &[Bucket],
        as_of: NaiveDate,
    ) -> Result<Vec<ProjectionRow>, ModelError> {
        if annual.len() != 12 || annual.iter().any(|b| b.granularity != Granularity::Monthly) {
            return Err(ModelError::invalid(
                "projection comparison needs 12 monthly buckets",
            ));
        }

        annual
            .iter()
            .zip(self.targets_kwh)
            .enumerate()
            .map(|(i, (bucket, target_kwh))| {
                let start = bucket.start.date();
                let month = i as u32 + 1;
                if start.month() != month {
                    return Err(ModelError::invalid(format!(
                        "bucket {i} starts in month {}, expected {month}",
                        start.month()
                    )));
                }
                let closed = start.year() < as_of.year()
                    || (start.year() == as_of.year() && month < as_of.month());
                let actual_kwh = closed.then_some(bucket.actual_kwh);
                Ok(ProjectionRow {
                    month,
                    name: month_name(month),
                    target_kwh,
                    actual_kwh,
                    attainment: actual_kwh.map(|a| compute_ratio(a, target_kwh)),
                })
            })
            .collect()
    }
}

fn month_index(month: u32) -> Result<usize, ModelError> {
    if (1..=12).contains(&month) {
        Ok(month as usize - 1)
    } else {
        Err(ModelError::invalid(format!("month {month} is outside 1-12")))
    }
}

fn month_name(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map_or("?", |m| m.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveTime};

    fn annual(year: i32) -> Vec<Bucket> {
        (1..=12)
            .map(|m| {
                let start = NaiveDate::from_ymd_opt(year, m, 1)
                    .expect("valid month")
                    .and_time(NaiveTime::MIN);
                Bucket::new(
                    Granularity::Monthly,
                    start,
                    start + Duration::days(28),
                    1500.0,
                    2000.0,
                )
                .expect("valid bucket")
            })
            .collect()
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn default_targets_follow_cosine() {
        let p = MonthlyProjections::default();
        assert_eq!(p.target(1), Ok(3000.0));
        assert_eq!(p.target(4), Ok(2000.0));
        assert_eq!(p.target(7), Ok(1000.0));
        assert_eq!(p.target(2), Ok(2866.0));
        // The cosine terms cancel over a full year.
        assert_eq!(p.annual_target_kwh(), 24000.0);
    }

    #[test]
    fn set_target_validates() {
        let mut p = MonthlyProjections::default();
        p.set_target(5, 2500.0).expect("valid target");
        assert_eq!(p.target(5), Ok(2500.0));
        assert!(p.set_target(5, -1.0).is_err());
        assert!(p.set_target(5, f64::NAN).is_err());
        assert!(p.set_target(13, 10.0).is_err());
        assert_eq!(p.target(5), Ok(2500.0));
        // May's default of 1500 kWh replaced by 2500 kWh.
        assert_eq!(p.annual_target_kwh(), 25000.0);
    }

    #[test]
    fn compare_only_fills_closed_months() {
        let p = MonthlyProjections::default();
        let rows = p.compare(&annual(2025), date(2025, 5, 20)).expect("12 monthly buckets");
        assert_eq!(rows.len(), 12);
        assert!(rows[..4].iter().all(|r| r.actual_kwh == Some(1500.0)));
        assert!(rows[4..].iter().all(|r| r.actual_kwh.is_none()));
        assert_eq!(rows[0].attainment.and_then(|a| a.rounded()), Some(50));
        assert_eq!(rows[4].name, "May");
    }

    #[test]
    fn compare_past_year_fills_everything() {
        let p = MonthlyProjections::default();
        let rows = p.compare(&annual(2025), date(2026, 1, 1)).expect("12 monthly buckets");
        assert!(rows.iter().all(|r| r.actual_kwh.is_some()));
    }

    #[test]
    fn compare_rejects_partial_year() {
        let p = MonthlyProjections::default();
        assert!(p.compare(&annual(2025)[..6], date(2025, 5, 1)).is_err());
    }
}
