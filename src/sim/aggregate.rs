//! Time-bucket aggregation of actual vs expected energy.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::error::ModelError;
use crate::plant::Plant;

use super::generator::{Shape, TelemetryGenerator};
use super::time::{Period, TimeDescriptor, calendar_date, days_in_month};
use super::types::{Bucket, EquipmentProfile, Granularity, MetricKind, Reading};

/// Equipment the aggregation covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Sum over every inverter of the plant.
    Plant,
    Inverter(String),
    String(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plant => f.write_str("plant"),
            Self::Inverter(id) => write!(f, "inverter:{id}"),
            Self::String(id) => write!(f, "string:{id}"),
        }
    }
}

impl FromStr for Scope {
    type Err = ModelError;

    /// Parses `plant`, `inverter:<id>` or `string:<id>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if s == "plant" => Ok(Self::Plant),
            Some(("inverter", id)) if !id.is_empty() => Ok(Self::Inverter(id.to_string())),
            Some(("string", id)) if !id.is_empty() => Ok(Self::String(id.to_string())),
            _ => Err(ModelError::invalid(format!(
                "scope \"{s}\" must be plant, inverter:<id> or string:<id>"
            ))),
        }
    }
}

/// One generating unit resolved from a scope.
struct Unit {
    profile: EquipmentProfile,
    online: bool,
}

/// Folds generated power readings into buckets for a scope and period.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    generator: &'a TelemetryGenerator,
}

impl<'a> Aggregator<'a> {
    pub fn new(generator: &'a TelemetryGenerator) -> Self {
        Self { generator }
    }

    /// Aggregates a scope over a period.
    ///
    /// Daily periods give 24 hourly buckets, monthly periods one bucket per
    /// calendar day and annual periods 12 monthly buckets. Offline equipment
    /// contributes its expected energy but no actual energy.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownEquipment`] when the scope names an id
    /// not in `plant`, or [`ModelError::InvalidInput`] for a period outside
    /// the calendar range.
    pub fn aggregate(
        &self,
        plant: &Plant,
        scope: &Scope,
        period: Period,
    ) -> Result<Vec<Bucket>, ModelError> {
        let units = resolve(plant, scope)?;
        let buckets = match period {
            Period::Daily(date) => self.hourly(&units, date)?,
            Period::Monthly { year, month } => self.daily(&units, year, month)?,
            Period::Annual(year) => (1..=12)
                .map(|month| {
                    let days = self.daily(&units, year, month)?;
                    Bucket::roll_up(&days, Granularity::Monthly)
                })
                .collect::<Result<Vec<_>, _>>()?,
        };
        debug!(%scope, %period, buckets = buckets.len(), "aggregated");
        Ok(buckets)
    }

    fn daily(&self, units: &[Unit], year: i32, month: u32) -> Result<Vec<Bucket>, ModelError> {
        let days = days_in_month(year, month)?;
        (1..=days)
            .map(|day| {
                let hours = self.hourly(units, calendar_date(year, month, day)?)?;
                Bucket::roll_up(&hours, Granularity::Daily)
            })
            .collect()
    }

    fn hourly(&self, units: &[Unit], date: NaiveDate) -> Result<Vec<Bucket>, ModelError> {
        let series = units
            .iter()
            .map(|unit| self.unit_hourly(unit, date))
            .collect::<Result<Vec<_>, _>>()?;
        if series.is_empty() {
            return (0..24).map(|h| empty_hour(date, h)).collect();
        }
        merge_scopes(&series)
    }

    fn unit_hourly(&self, unit: &Unit, date: NaiveDate) -> Result<Vec<Bucket>, ModelError> {
        (0..24)
            .map(|hour| {
                let at = TimeDescriptor::Hour { date, hour };
                let expected = self
                    .generator
                    .expected_power_kw(&unit.profile, &at, Shape::Solar);
                let actual = if unit.online {
                    self.generator
                        .generate(&unit.profile, MetricKind::Power, at, Shape::Solar)?
                        .value
                } else {
                    0.0
                };
                let start = at.timestamp();
                Bucket::new(
                    Granularity::Hourly,
                    start,
                    start + Duration::hours(1),
                    actual,
                    expected,
                )
            })
            .collect()
    }
}

fn resolve(plant: &Plant, scope: &Scope) -> Result<Vec<Unit>, ModelError> {
    Ok(match scope {
        Scope::Plant => plant
            .inverters()
            .iter()
            .map(|inv| Unit {
                profile: inv.profile(),
                online: inv.online,
            })
            .collect(),
        Scope::Inverter(id) => {
            let inv = plant.inverter(id)?;
            vec![Unit {
                profile: inv.profile(),
                online: inv.online,
            }]
        }
        Scope::String(id) => {
            let (inv, string) = plant.string(id)?;
            vec![Unit {
                profile: inv.string_profile(string),
                online: inv.online,
            }]
        }
    })
}

fn empty_hour(date: NaiveDate, hour: i64) -> Result<Bucket, ModelError> {
    let start = date.and_time(NaiveTime::MIN) + Duration::hours(hour);
    Bucket::new(
        Granularity::Hourly,
        start,
        start + Duration::hours(1),
        0.0,
        0.0,
    )
}

/// Element-wise sum of aligned bucket series, in series order.
///
/// # Errors
///
/// Returns [`ModelError::InvalidInput`] when `series` is empty or the series
/// differ in length or bucket boundaries.
pub fn merge_scopes(series: &[Vec<Bucket>]) -> Result<Vec<Bucket>, ModelError> {
    let Some((first, rest)) = series.split_first() else {
        return Err(ModelError::invalid("no bucket series to merge"));
    };
    if rest.iter().any(|s| s.len() != first.len()) {
        return Err(ModelError::invalid("bucket series differ in length"));
    }

    first
        .iter()
        .enumerate()
        .map(|(i, head)| {
            let mut actual = head.actual_kwh;
            let mut expected = head.expected_kwh;
            for other in rest {
                let b = &other[i];
                if b.start != head.start || b.end != head.end {
                    return Err(ModelError::invalid(format!(
                        "bucket {i} is not aligned across series"
                    )));
                }
                actual += b.actual_kwh;
                expected += b.expected_kwh;
            }
            Bucket::new(head.granularity, head.start, head.end, actual, expected)
        })
        .collect()
}

/// Folds hourly power readings into hourly buckets.
///
/// Each reading is an average power (kW) over the hour starting at its
/// timestamp, so its value is also the hour's energy in kWh.
///
/// # Arguments
///
/// * `actual` - Measured power readings, one per hour
/// * `expected` - Modelled power readings for the same hours
///
/// # Errors
///
/// Returns [`ModelError::InvalidInput`] if the slices differ in length or
/// timestamps, a value is negative, or consecutive readings are not one
/// hour apart. Returns [`ModelError::UnsupportedMetric`] for readings that
/// are not power.
///
/// # Examples
///
/// ```
/// use pv_monitor::sim::aggregate::fold_hourly;
/// use pv_monitor::sim::types::{Bucket, Granularity, MetricKind, Reading};
/// use chrono::{Duration, NaiveDate};
///
/// let midnight = NaiveDate::from_ymd_opt(2025, 5, 15)
///     .and_then(|d| d.and_hms_opt(0, 0, 0))
///     .expect("valid timestamp");
/// let readings: Vec<Reading> = (0..24)
///     .map(|h| {
///         let kw = if (7..=18).contains(&h) { 25.0 } else { 0.0 };
///         Reading::new(midnight + Duration::hours(h), MetricKind::Power, kw)
///     })
///     .collect();
///
/// let hourly = fold_hourly(&readings, &readings).expect("contiguous readings");
/// let daily = Bucket::roll_up(&hourly, Granularity::Daily).expect("24 hours");
/// assert_eq!(daily.actual_kwh, 300.0);
/// ```
pub fn fold_hourly(actual: &[Reading], expected: &[Reading]) -> Result<Vec<Bucket>, ModelError> {
    if actual.len() != expected.len() {
        return Err(ModelError::invalid(format!(
            "{} actual readings but {} expected readings",
            actual.len(),
            expected.len()
        )));
    }

    let mut buckets = Vec::with_capacity(actual.len());
    let mut previous: Option<NaiveDateTime> = None;
    for (a, e) in actual.iter().zip(expected) {
        for r in [a, e] {
            if r.kind != MetricKind::Power {
                return Err(ModelError::UnsupportedMetric(format!(
                    "cannot fold {} readings into energy buckets",
                    r.kind
                )));
            }
        }
        if a.timestamp != e.timestamp {
            return Err(ModelError::invalid(format!(
                "actual reading at {} paired with expected reading at {}",
                a.timestamp, e.timestamp
            )));
        }
        if let Some(prev) = previous {
            if a.timestamp - prev != Duration::hours(1) {
                return Err(ModelError::invalid(format!(
                    "readings at {prev} and {} are not one hour apart",
                    a.timestamp
                )));
            }
        }
        previous = Some(a.timestamp);
        buckets.push(Bucket::new(
            Granularity::Hourly,
            a.timestamp,
            a.timestamp + Duration::hours(1),
            a.value,
            e.value,
        )?);
    }
    Ok(buckets)
}
