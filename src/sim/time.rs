//! Time descriptors for generated readings and aggregation periods.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::ModelError;

use super::seed::digit_seed;

/// Point in time a reading is generated for, at one of three granularities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeDescriptor {
    /// Hour of day (0-23) on a calendar date.
    Hour { date: NaiveDate, hour: u32 },
    /// Whole calendar day.
    Day(NaiveDate),
    /// Month of year (1-12).
    Month { year: i32, month: u32 },
}

impl TimeDescriptor {
    /// Builds an hourly descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] if the date does not exist or
    /// `hour > 23`.
    pub fn hour(year: i32, month: u32, day: u32, hour: u32) -> Result<Self, ModelError> {
        if hour > 23 {
            return Err(ModelError::invalid(format!("hour {hour} is outside 0-23")));
        }
        Ok(Self::Hour {
            date: calendar_date(year, month, day)?,
            hour,
        })
    }

    /// Builds a daily descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] if the date does not exist.
    pub fn day(year: i32, month: u32, day: u32) -> Result<Self, ModelError> {
        Ok(Self::Day(calendar_date(year, month, day)?))
    }

    /// Builds a monthly descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] if `month` is outside 1-12.
    pub fn month(year: i32, month: u32) -> Result<Self, ModelError> {
        check_month(month)?;
        Ok(Self::Month { year, month })
    }

    /// Month of year this descriptor falls in (1-12).
    pub fn month_of_year(&self) -> u32 {
        match self {
            Self::Hour { date, .. } | Self::Day(date) => date.month(),
            Self::Month { month, .. } => *month,
        }
    }

    /// Hour of day for hourly descriptors.
    pub fn hour_of_day(&self) -> Option<u32> {
        match self {
            Self::Hour { hour, .. } => Some(*hour),
            _ => None,
        }
    }

    /// Start of the described interval.
    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            Self::Hour { date, hour } => {
                date.and_time(NaiveTime::MIN) + chrono::Duration::hours(i64::from(*hour))
            }
            Self::Day(date) => date.and_time(NaiveTime::MIN),
            Self::Month { year, month } => first_of_month(*year, *month).and_time(NaiveTime::MIN),
        }
    }

    /// Digit-concatenated seed of the time components (`hour, day, month, year`).
    pub fn seed(&self) -> u64 {
        match self {
            Self::Hour { date, hour } => digit_seed(&[
                *hour,
                date.day(),
                date.month(),
                year_part(date.year()),
            ]),
            Self::Day(date) => digit_seed(&[date.day(), date.month(), year_part(date.year())]),
            Self::Month { year, month } => digit_seed(&[*month, year_part(*year)]),
        }
    }
}

impl fmt::Display for TimeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hour { date, hour } => write!(f, "{date} {hour:02}:00"),
            Self::Day(date) => write!(f, "{date}"),
            Self::Month { year, month } => write!(f, "{year}-{month:02}"),
        }
    }
}

/// Aggregation window anchored on a specific date, month or year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// One day, split into 24 hourly buckets.
    Daily(NaiveDate),
    /// One month, split into one bucket per calendar day.
    Monthly { year: i32, month: u32 },
    /// One year, split into 12 monthly buckets.
    Annual(i32),
}

impl Period {
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] if the date does not exist.
    pub fn daily(year: i32, month: u32, day: u32) -> Result<Self, ModelError> {
        Ok(Self::Daily(calendar_date(year, month, day)?))
    }

    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] if `month` is outside 1-12.
    pub fn monthly(year: i32, month: u32) -> Result<Self, ModelError> {
        check_month(month)?;
        Ok(Self::Monthly { year, month })
    }

    pub fn annual(year: i32) -> Self {
        Self::Annual(year)
    }

    /// Period of the given kind (`daily`, `monthly`, `annual`) containing `date`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] for an unknown kind.
    pub fn containing(kind: &str, date: NaiveDate) -> Result<Self, ModelError> {
        match kind {
            "daily" => Ok(Self::Daily(date)),
            "monthly" => Ok(Self::Monthly {
                year: date.year(),
                month: date.month(),
            }),
            "annual" => Ok(Self::Annual(date.year())),
            other => Err(ModelError::invalid(format!(
                "unknown period \"{other}\", expected daily, monthly or annual"
            ))),
        }
    }

    /// Number of buckets this period splits into.
    pub fn bucket_count(&self) -> usize {
        match self {
            Self::Daily(_) => 24,
            Self::Monthly { year, month } => days_in_month(*year, *month).unwrap_or(0) as usize,
            Self::Annual(_) => 12,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily(date) => write!(f, "day {date}"),
            Self::Monthly { year, month } => write!(f, "month {year}-{month:02}"),
            Self::Annual(year) => write!(f, "year {year}"),
        }
    }
}

/// Number of days in `month` of `year`, leap years included.
///
/// # Errors
///
/// Returns [`ModelError::InvalidInput`] if `month` is outside 1-12 or the
/// year is outside the supported calendar range.
///
/// # Examples
///
/// ```
/// use pv_monitor::sim::time::days_in_month;
///
/// assert_eq!(days_in_month(2024, 2).ok(), Some(29));
/// assert_eq!(days_in_month(2025, 2).ok(), Some(28));
/// assert!(days_in_month(2025, 13).is_err());
/// ```
pub fn days_in_month(year: i32, month: u32) -> Result<u32, ModelError> {
    check_month(month)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .ok_or_else(|| ModelError::invalid(format!("year {year} is out of range")))
}

pub(crate) fn calendar_date(year: i32, month: u32, day: u32) -> Result<NaiveDate, ModelError> {
    check_month(month)?;
    if day == 0 || day > 31 {
        return Err(ModelError::invalid(format!("day {day} is outside 1-31")));
    }
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ModelError::invalid(format!("{year}-{month:02}-{day:02} is not a calendar date")))
}

pub(crate) fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

fn check_month(month: u32) -> Result<(), ModelError> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(ModelError::invalid(format!("month {month} is outside 1-12")))
    }
}

fn year_part(year: i32) -> u32 {
    year.unsigned_abs()
}
