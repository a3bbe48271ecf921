//! Performance ratios, availability and the monthly performance report.

use std::fmt;

use chrono::{Datelike, Month, NaiveDate};
use serde::Serialize;

use crate::error::ModelError;

use super::classify::{Status, Thresholds, classify};
use super::types::{Bucket, Granularity};

/// Actual over expected energy, or N/A when nothing was expected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PerformanceRatio {
    /// Full-precision percentage.
    Percent(f64),
    NotApplicable,
}

impl PerformanceRatio {
    pub fn percent(&self) -> Option<f64> {
        match self {
            Self::Percent(p) => Some(*p),
            Self::NotApplicable => None,
        }
    }

    /// Percentage rounded to the nearest whole percent for display.
    pub fn rounded(&self) -> Option<i64> {
        self.percent().map(|p| p.round() as i64)
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, Self::Percent(_))
    }
}

impl fmt::Display for PerformanceRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rounded() {
            Some(p) => write!(f, "{p}%"),
            None => f.write_str("N/A"),
        }
    }
}

/// Computes `actual / expected * 100`.
///
/// An `expected` of zero (or anything not strictly positive and finite)
/// yields [`PerformanceRatio::NotApplicable`] instead of a division.
///
/// # Examples
///
/// ```
/// use pv_monitor::sim::kpi::{PerformanceRatio, compute_ratio};
///
/// assert_eq!(compute_ratio(90.0, 200.0), PerformanceRatio::Percent(45.0));
/// assert_eq!(compute_ratio(10.0, 0.0), PerformanceRatio::NotApplicable);
/// ```
pub fn compute_ratio(actual: f64, expected: f64) -> PerformanceRatio {
    if expected > 0.0 && expected.is_finite() && actual.is_finite() {
        PerformanceRatio::Percent(actual / expected * 100.0)
    } else {
        PerformanceRatio::NotApplicable
    }
}

/// Ratio of a bucket plus its display tier. Never stored; always derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceMetric {
    pub ratio: PerformanceRatio,
    /// `None` when the ratio is N/A.
    pub status: Option<Status>,
}

impl PerformanceMetric {
    /// Derives the ratio of `bucket` and classifies its shortfall
    /// `100 - ratio` against `thresholds`.
    ///
    /// With the default performance thresholds (5, 15) a ratio of 95 % or
    /// more is normal, 85 % up to 95 % a warning and below 85 % critical.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use pv_monitor::sim::classify::{Status, ThresholdSet};
    /// use pv_monitor::sim::kpi::PerformanceMetric;
    /// use pv_monitor::sim::types::{Bucket, Granularity};
    ///
    /// let start = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    /// let end = start + chrono::Duration::days(1);
    /// let day = Bucket::new(Granularity::Daily, start, end, 98.0, 100.0).unwrap();
    /// let metric = PerformanceMetric::from_bucket(&day, ThresholdSet::default().performance);
    /// assert_eq!(metric.status, Some(Status::Normal));
    /// ```
    pub fn from_bucket(bucket: &Bucket, thresholds: Thresholds) -> Self {
        let ratio = compute_ratio(bucket.actual_kwh, bucket.expected_kwh);
        Self {
            ratio,
            status: ratio.percent().map(|p| classify(100.0 - p, thresholds)),
        }
    }
}

impl fmt::Display for PerformanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({status})", self.ratio),
            None => write!(f, "{}", self.ratio),
        }
    }
}

/// Share of daylight hours in which the equipment produced energy.
///
/// Daylight hours are hourly buckets with a positive expected value.
/// N/A when the slice holds no daylight hour.
pub fn operation_percent(hourly: &[Bucket]) -> PerformanceRatio {
    let daylight = hourly.iter().filter(|b| b.expected_kwh > 0.0).count();
    let producing = hourly
        .iter()
        .filter(|b| b.expected_kwh > 0.0 && b.actual_kwh > 0.0)
        .count();
    compute_ratio(producing as f64, daylight as f64)
}

/// One day of the monthly performance report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub date: NaiveDate,
    pub performance: PerformanceRatio,
    pub expected_kwh: f64,
    pub actual_kwh: f64,
    /// Representative plant irradiance of the day (W/m²).
    pub irradiance_w_m2: f64,
}

/// Totals row of the monthly report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_expected_kwh: f64,
    pub total_actual_kwh: f64,
    pub performance: PerformanceRatio,
    pub mean_irradiance_w_m2: f64,
}

/// Daily performance table for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthReport {
    pub year: i32,
    pub month: u32,
    pub rows: Vec<ReportRow>,
    pub summary: ReportSummary,
}

impl MonthReport {
    /// Builds a report from the month's daily buckets and one irradiance
    /// value per day.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] if the slices differ in length
    /// or a bucket is not a daily bucket of `year`-`month`.
    pub fn from_buckets(
        year: i32,
        month: u32,
        daily: &[Bucket],
        irradiance_w_m2: &[f64],
    ) -> Result<Self, ModelError> {
        if daily.len() != irradiance_w_m2.len() {
            return Err(ModelError::invalid(format!(
                "{} daily buckets but {} irradiance values",
                daily.len(),
                irradiance_w_m2.len()
            )));
        }

        let mut rows = Vec::with_capacity(daily.len());
        for (bucket, &irradiance) in daily.iter().zip(irradiance_w_m2) {
            let date = bucket.start.date();
            if bucket.granularity != Granularity::Daily
                || date.year() != year
                || date.month() != month
            {
                return Err(ModelError::invalid(format!(
                    "bucket starting {} is not a day of {year}-{month:02}",
                    bucket.start
                )));
            }
            rows.push(ReportRow {
                date,
                performance: compute_ratio(bucket.actual_kwh, bucket.expected_kwh),
                expected_kwh: bucket.expected_kwh,
                actual_kwh: bucket.actual_kwh,
                irradiance_w_m2: irradiance,
            });
        }

        let total_expected_kwh: f64 = rows.iter().map(|r| r.expected_kwh).sum();
        let total_actual_kwh: f64 = rows.iter().map(|r| r.actual_kwh).sum();
        let mean_irradiance_w_m2 = if rows.is_empty() {
            0.0
        } else {
            irradiance_w_m2.iter().sum::<f64>() / rows.len() as f64
        };

        Ok(Self {
            year,
            month,
            rows,
            summary: ReportSummary {
                total_expected_kwh,
                total_actual_kwh,
                performance: compute_ratio(total_actual_kwh, total_expected_kwh),
                mean_irradiance_w_m2,
            },
        })
    }

    /// `"<Month>/<year>"`, e.g. `"May/2025"`.
    pub fn label(&self) -> String {
        let name = u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map_or("?", |m| m.name());
        format!("{name}/{}", self.year)
    }

    /// Export file name, e.g. `report_05-2025.csv`.
    pub fn file_name(&self) -> String {
        format!("report_{:02}-{}.csv", self.month, self.year)
    }
}

impl fmt::Display for MonthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Performance Report {} ---", self.label())?;
        writeln!(
            f,
            "{:<12} {:>11} {:>14} {:>12} {:>12}",
            "Date", "Performance", "Expected kWh", "Actual kWh", "Irr. W/m²"
        )?;
        for r in &self.rows {
            writeln!(
                f,
                "{:<12} {:>11} {:>14.1} {:>12.1} {:>12.0}",
                r.date.format("%d/%m/%Y").to_string(),
                r.performance.to_string(),
                r.expected_kwh,
                r.actual_kwh,
                r.irradiance_w_m2
            )?;
        }
        let s = &self.summary;
        write!(
            f,
            "{:<12} {:>11} {:>14.1} {:>12.1} {:>12.0}",
            "Total",
            s.performance.to_string(),
            s.total_expected_kwh,
            s.total_actual_kwh,
            s.mean_irradiance_w_m2
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::classify::ThresholdSet;
    use chrono::{Duration, NaiveDateTime, NaiveTime};

    fn day_bucket(day: u32, actual: f64, expected: f64) -> Bucket {
        let start: NaiveDateTime = NaiveDate::from_ymd_opt(2025, 5, day)
            .expect("valid day")
            .and_time(NaiveTime::MIN);
        Bucket::new(
            Granularity::Daily,
            start,
            start + Duration::days(1),
            actual,
            expected,
        )
        .expect("valid bucket")
    }

    #[test]
    fn zero_expected_is_not_applicable() {
        let r = compute_ratio(10.0, 0.0);
        assert_eq!(r, PerformanceRatio::NotApplicable);
        assert_eq!(r.to_string(), "N/A");
        assert_eq!(r.rounded(), None);
    }

    #[test]
    fn ratio_keeps_full_precision() {
        let r = compute_ratio(2.0, 3.0);
        assert_eq!(r.percent(), Some(2.0 / 3.0 * 100.0));
        assert_eq!(r.rounded(), Some(67));
        assert_eq!(r.to_string(), "67%");
    }

    #[test]
    fn metric_from_bucket_classifies_shortfall() {
        let t = ThresholdSet::default().performance;
        let status =
            |actual| PerformanceMetric::from_bucket(&day_bucket(1, actual, 100.0), t).status;

        assert_eq!(status(100.0), Some(Status::Normal));
        assert_eq!(status(98.0), Some(Status::Normal));
        assert_eq!(status(95.0), Some(Status::Warning));
        assert_eq!(status(90.0), Some(Status::Warning));
        assert_eq!(status(85.0), Some(Status::Critical));
        assert_eq!(status(10.0), Some(Status::Critical));
        assert_eq!(status(120.0), Some(Status::Normal));

        let idle = PerformanceMetric::from_bucket(&day_bucket(1, 0.0, 0.0), t);
        assert_eq!(idle.status, None);
    }

    #[test]
    fn operation_percent_counts_daylight_only() {
        let hours: Vec<Bucket> = [(0.0, 0.0), (1.0, 2.0), (0.0, 2.0), (3.0, 2.0)]
            .into_iter()
            .enumerate()
            .map(|(i, (a, e))| {
                let start = NaiveDate::from_ymd_opt(2025, 5, 1)
                    .expect("valid day")
                    .and_time(NaiveTime::MIN)
                    + Duration::hours(i as i64);
                Bucket::new(Granularity::Hourly, start, start + Duration::hours(1), a, e)
                    .expect("valid bucket")
            })
            .collect();
        assert_eq!(operation_percent(&hours).rounded(), Some(67));
        assert_eq!(operation_percent(&hours[..1]), PerformanceRatio::NotApplicable);
    }

    #[test]
    fn report_summary_totals() {
        let days: Vec<Bucket> = [(90.0, 100.0), (60.0, 100.0)]
            .into_iter()
            .enumerate()
            .map(|(i, (a, e))| day_bucket(i as u32 + 1, a, e))
            .collect();
        let report =
            MonthReport::from_buckets(2025, 5, &days, &[800.0, 600.0]).expect("report builds");
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.summary.total_actual_kwh, 150.0);
        assert_eq!(report.summary.total_expected_kwh, 200.0);
        assert_eq!(report.summary.performance.rounded(), Some(75));
        assert_eq!(report.summary.mean_irradiance_w_m2, 700.0);
        assert_eq!(report.label(), "May/2025");
        assert_eq!(report.file_name(), "report_05-2025.csv");
    }

    #[test]
    fn report_rejects_foreign_days() {
        let days = vec![day_bucket(3, 1.0, 1.0)];
        assert!(MonthReport::from_buckets(2025, 6, &days, &[500.0]).is_err());
        assert!(MonthReport::from_buckets(2025, 5, &days, &[]).is_err());
    }
}
