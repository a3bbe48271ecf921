//! Core model types: metrics, readings, equipment profiles and buckets.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Kind of physical quantity a reading measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Power,
    Voltage,
    Current,
    Temperature,
    Irradiance,
}

impl MetricKind {
    /// All metric kinds, in declaration order.
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Power,
        MetricKind::Voltage,
        MetricKind::Current,
        MetricKind::Temperature,
        MetricKind::Irradiance,
    ];

    /// Unit readings of this kind are reported in.
    pub fn unit(&self) -> Unit {
        match self {
            Self::Power => Unit::Kilowatt,
            Self::Voltage => Unit::Volt,
            Self::Current => Unit::Ampere,
            Self::Temperature => Unit::Celsius,
            Self::Irradiance => Unit::WattPerSquareMetre,
        }
    }

    /// Stable index used to salt generator seeds.
    pub(crate) fn salt(&self) -> u64 {
        match self {
            Self::Power => 1,
            Self::Voltage => 2,
            Self::Current => 3,
            Self::Temperature => 4,
            Self::Irradiance => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Voltage => "voltage",
            Self::Current => "current",
            Self::Temperature => "temperature",
            Self::Irradiance => "irradiance",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ModelError::UnsupportedMetric(s.to_string()))
    }
}

/// Measurement unit attached to a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Kilowatt,
    Volt,
    Ampere,
    Celsius,
    WattPerSquareMetre,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Kilowatt => "kW",
            Self::Volt => "V",
            Self::Ampere => "A",
            Self::Celsius => "°C",
            Self::WattPerSquareMetre => "W/m²",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Immutable point-in-time sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub kind: MetricKind,
    pub value: f64,
    pub unit: Unit,
}

impl Reading {
    pub fn new(timestamp: NaiveDateTime, kind: MetricKind, value: f64) -> Self {
        Self {
            timestamp,
            kind,
            value,
            unit: kind.unit(),
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}={:.2} {}",
            self.timestamp, self.kind, self.value, self.unit
        )
    }
}

/// Class of equipment a generator rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentKind {
    Inverter,
    String,
    WeatherStation,
}

impl EquipmentKind {
    /// Returns `true` when the generator has a rule for `metric` on this kind.
    pub fn supports(&self, metric: MetricKind) -> bool {
        use MetricKind::*;
        match self {
            Self::Inverter => matches!(metric, Power | Voltage | Current | Temperature),
            Self::String => matches!(metric, Power | Voltage | Current),
            Self::WeatherStation => matches!(metric, Irradiance | Temperature),
        }
    }
}

/// What the generator needs to know about one piece of equipment.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentProfile {
    pub id: String,
    pub kind: EquipmentKind,
    /// Rated AC (inverter) or DC share (string) capacity in kW.
    pub rated_kw: f64,
}

impl EquipmentProfile {
    pub fn new(id: impl Into<String>, kind: EquipmentKind, rated_kw: f64) -> Self {
        Self {
            id: id.into(),
            kind,
            rated_kw: rated_kw.max(0.0),
        }
    }

    /// Plant-level weather station with no generation capacity.
    pub fn weather_station(id: impl Into<String>) -> Self {
        Self::new(id, EquipmentKind::WeatherStation, 0.0)
    }
}

/// Time granularity of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Hourly,
    Daily,
    Monthly,
    Annual,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        })
    }
}

/// Time-aligned actual-vs-expected energy pair.
///
/// Both energies are non-negative and finite; `end` is strictly after
/// `start`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub granularity: Granularity,
    /// Inclusive start of the interval.
    pub start: NaiveDateTime,
    /// Exclusive end of the interval.
    pub end: NaiveDateTime,
    pub actual_kwh: f64,
    pub expected_kwh: f64,
}

impl Bucket {
    /// Creates a bucket after checking its invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] for negative or non-finite
    /// energies, or when `end <= start`.
    pub fn new(
        granularity: Granularity,
        start: NaiveDateTime,
        end: NaiveDateTime,
        actual_kwh: f64,
        expected_kwh: f64,
    ) -> Result<Self, ModelError> {
        if end <= start {
            return Err(ModelError::invalid(format!(
                "bucket end {end} must be after start {start}"
            )));
        }
        for (name, value) in [("actual", actual_kwh), ("expected", expected_kwh)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ModelError::invalid(format!(
                    "bucket {name} energy must be finite and >= 0, got {value}"
                )));
            }
        }
        Ok(Self {
            granularity,
            start,
            end,
            actual_kwh,
            expected_kwh,
        })
    }

    /// Sums contiguous child buckets into one coarser bucket.
    ///
    /// Sums run in slice order so repeated roll-ups are bit-identical.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] when `children` is empty or not
    /// contiguous.
    pub fn roll_up(children: &[Bucket], granularity: Granularity) -> Result<Self, ModelError> {
        let (first, last) = match (children.first(), children.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(ModelError::invalid("cannot roll up zero buckets")),
        };
        if children.windows(2).any(|w| w[0].end != w[1].start) {
            return Err(ModelError::invalid("buckets to roll up are not contiguous"));
        }

        let actual = children.iter().map(|b| b.actual_kwh).sum();
        let expected = children.iter().map(|b| b.expected_kwh).sum();
        Self::new(granularity, first.start, last.end, actual, expected)
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} .. {} | actual={:>9.2} kWh  expected={:>9.2} kWh",
            self.start, self.end, self.actual_kwh, self.expected_kwh
        )
    }
}
