//! Monitor: the model object a dashboard host mounts.
//!
//! Owns the current [`Plant`] value, the service-order registry and the two
//! refresh tasks. The host calls [`Monitor::tick`] from its own loop; each
//! due task replaces the whole plant with a refreshed copy.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::config::PlantConfig;
use crate::error::ModelError;
use crate::forecast::{MonthlyProjections, ProjectionRow};
use crate::ivcurve::{IvCurve, IvTestParameters, run_iv_test};
use crate::orders::ServiceOrderRegistry;
use crate::plant::{Plant, TelemetryRefresher};
use crate::sim::aggregate::{Aggregator, Scope};
use crate::sim::classify::{Status, ThresholdSet, classify};
use crate::sim::generator::{Shape, TelemetryGenerator};
use crate::sim::kpi::{MonthReport, PerformanceMetric, PerformanceRatio, operation_percent};
use crate::sim::schedule::RepeatingTask;
use crate::sim::time::{Period, TimeDescriptor, calendar_date, days_in_month};
use crate::sim::types::{Bucket, EquipmentProfile, Granularity, MetricKind, Reading};

/// Id of the plant weather station feeding report irradiance.
pub const WEATHER_STATION_ID: &str = "ws1";

/// One of the two live refresh concerns of a mounted monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    /// Inverter power, voltage, current and temperature.
    Inverters,
    /// String voltage and current.
    Strings,
}

impl fmt::Display for RefreshKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inverters => "inverters",
            Self::Strings => "strings",
        })
    }
}

/// Which refresh tasks ran during one [`Monitor::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tick {
    pub inverters: bool,
    pub strings: bool,
}

impl Tick {
    pub fn any(&self) -> bool {
        self.inverters || self.strings
    }
}

pub struct Monitor {
    plant: Plant,
    orders: ServiceOrderRegistry,
    generator: TelemetryGenerator,
    thresholds: ThresholdSet,
    refresher: TelemetryRefresher,
    projections: MonthlyProjections,
    inverter_task: RepeatingTask,
    string_task: RepeatingTask,
    mounted: bool,
}

impl Monitor {
    /// Creates an unmounted monitor with an empty order registry.
    ///
    /// # Arguments
    ///
    /// * `plant` - Initial plant value
    /// * `generator` - Deterministic telemetry generator used for aggregation
    /// * `thresholds` - Installed warning/critical thresholds
    /// * `refresher` - Live telemetry source for the refresh ticks
    /// * `inverter_interval` - Inverter refresh period
    /// * `string_interval` - String refresh period
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] for a zero interval.
    pub fn new(
        plant: Plant,
        generator: TelemetryGenerator,
        thresholds: ThresholdSet,
        refresher: TelemetryRefresher,
        inverter_interval: Duration,
        string_interval: Duration,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            plant,
            orders: ServiceOrderRegistry::new(),
            generator,
            thresholds,
            refresher,
            projections: MonthlyProjections::default(),
            inverter_task: RepeatingTask::new("inverter-refresh", inverter_interval)?,
            string_task: RepeatingTask::new("string-refresh", string_interval)?,
            mounted: false,
        })
    }

    /// Builds a monitor from a configuration after validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] listing every
    /// [`PlantConfig::validate`] error, or if the plant or intervals are
    /// rejected.
    pub fn from_config(config: &PlantConfig) -> Result<Self, ModelError> {
        let errors = config.validate();
        if !errors.is_empty() {
            let detail = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ModelError::invalid(detail));
        }
        Self::new(
            config.build_plant()?,
            TelemetryGenerator::new(config.generator_config()),
            config.threshold_set(),
            TelemetryRefresher::new(config.refresh_config(), config.plant.seed),
            config.inverter_interval(),
            config.string_interval(),
        )
    }

    /// Replaces the order registry.
    pub fn with_orders(mut self, orders: ServiceOrderRegistry) -> Self {
        self.orders = orders;
        self
    }

    pub fn plant(&self) -> &Plant {
        &self.plant
    }

    pub fn orders(&self) -> &ServiceOrderRegistry {
        &self.orders
    }

    pub fn orders_mut(&mut self) -> &mut ServiceOrderRegistry {
        &mut self.orders
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    pub fn projections(&self) -> &MonthlyProjections {
        &self.projections
    }

    pub fn projections_mut(&mut self) -> &mut MonthlyProjections {
        &mut self.projections
    }

    /// Starts both refresh tasks.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] if the monitor was unmounted.
    pub fn mount(&mut self, now: Instant) -> Result<(), ModelError> {
        self.inverter_task.start(now)?;
        self.string_task.start(now)?;
        self.mounted = true;
        info!(plant = %self.plant.name, "monitor mounted");
        Ok(())
    }

    /// Disposes both refresh tasks. Later ticks change nothing.
    pub fn unmount(&mut self) {
        self.inverter_task.dispose();
        self.string_task.dispose();
        self.mounted = false;
        info!(plant = %self.plant.name, "monitor unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Pauses one refresh concern; the other keeps its cadence.
    pub fn stop_refresh(&mut self, kind: RefreshKind) {
        self.task_mut(kind).stop();
        info!(plant = %self.plant.name, %kind, "refresh stopped");
    }

    /// Resumes one refresh concern; its next run is one interval after
    /// `now`. Resuming a running concern changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] unless the monitor is mounted.
    pub fn start_refresh(&mut self, kind: RefreshKind, now: Instant) -> Result<(), ModelError> {
        if !self.mounted {
            return Err(ModelError::invalid(format!(
                "cannot start {kind} refresh on an unmounted monitor"
            )));
        }
        self.task_mut(kind).start(now)?;
        info!(plant = %self.plant.name, %kind, "refresh started");
        Ok(())
    }

    pub fn is_refreshing(&self, kind: RefreshKind) -> bool {
        match kind {
            RefreshKind::Inverters => self.inverter_task.is_running(),
            RefreshKind::Strings => self.string_task.is_running(),
        }
    }

    fn task_mut(&mut self, kind: RefreshKind) -> &mut RepeatingTask {
        match kind {
            RefreshKind::Inverters => &mut self.inverter_task,
            RefreshKind::Strings => &mut self.string_task,
        }
    }

    /// Runs the refresh tasks that are due at `now`.
    pub fn tick(&mut self, now: Instant) -> Tick {
        let tick = Tick {
            inverters: self.inverter_task.poll(now),
            strings: self.string_task.poll(now),
        };
        if tick.inverters {
            self.plant = self.refresher.refresh_inverters(&self.plant);
        }
        if tick.strings {
            self.plant = self.refresher.refresh_strings(&self.plant);
        }
        if tick.any() {
            debug!(
                inverters = tick.inverters,
                strings = tick.strings,
                power_kw = self.plant.power_kw(),
                "plant refreshed"
            );
        }
        tick
    }

    /// Actual vs expected buckets for a scope and period.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownEquipment`] for ids not in the plant.
    pub fn aggregate(&self, scope: &Scope, period: Period) -> Result<Vec<Bucket>, ModelError> {
        Aggregator::new(&self.generator).aggregate(&self.plant, scope, period)
    }

    /// Per-bucket performance of a scope, classified with the performance
    /// thresholds.
    ///
    /// # Errors
    ///
    /// Same as [`aggregate`](Self::aggregate).
    pub fn performance(
        &self,
        scope: &Scope,
        period: Period,
    ) -> Result<Vec<PerformanceMetric>, ModelError> {
        Ok(self
            .aggregate(scope, period)?
            .iter()
            .map(|b| PerformanceMetric::from_bucket(b, self.thresholds.performance))
            .collect())
    }

    /// One bucket covering the whole period, rolled up from its children.
    ///
    /// # Errors
    ///
    /// Same as [`aggregate`](Self::aggregate).
    pub fn period_total(&self, scope: &Scope, period: Period) -> Result<Bucket, ModelError> {
        let granularity = match period {
            Period::Daily(_) => Granularity::Daily,
            Period::Monthly { .. } => Granularity::Monthly,
            Period::Annual(_) => Granularity::Annual,
        };
        Bucket::roll_up(&self.aggregate(scope, period)?, granularity)
    }

    /// Share of a day's daylight hours in which an inverter produced.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownEquipment`] for an unknown inverter.
    pub fn operation(
        &self,
        inverter_id: &str,
        date: NaiveDate,
    ) -> Result<PerformanceRatio, ModelError> {
        let hourly = self.aggregate(&Scope::Inverter(inverter_id.to_string()), Period::Daily(date))?;
        Ok(operation_percent(&hourly))
    }

    /// Daily performance report of the whole plant for one month.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] for a month outside 1-12.
    pub fn month_report(&self, year: i32, month: u32) -> Result<MonthReport, ModelError> {
        let daily = self.aggregate(&Scope::Plant, Period::monthly(year, month)?)?;
        let station = EquipmentProfile::weather_station(WEATHER_STATION_ID);
        let irradiance = (1..=days_in_month(year, month)?)
            .map(|day| {
                let date = calendar_date(year, month, day)?;
                self.generator
                    .generate(
                        &station,
                        MetricKind::Irradiance,
                        TimeDescriptor::Day(date),
                        Shape::Solar,
                    )
                    .map(|r| r.value)
            })
            .collect::<Result<Vec<_>, _>>()?;
        MonthReport::from_buckets(year, month, &daily, &irradiance)
    }

    /// Monthly targets against the plant's actuals for `year`.
    ///
    /// # Errors
    ///
    /// Propagates aggregation errors.
    pub fn compare_projections(
        &self,
        year: i32,
        as_of: NaiveDate,
    ) -> Result<Vec<ProjectionRow>, ModelError> {
        let annual = self.aggregate(&Scope::Plant, Period::annual(year))?;
        self.projections.compare(&annual, as_of)
    }

    /// IV test of one inverter at its current state.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownEquipment`] or
    /// [`ModelError::EquipmentOffline`].
    pub fn iv_test(
        &self,
        inverter_id: &str,
        params: &IvTestParameters,
    ) -> Result<IvCurve, ModelError> {
        run_iv_test(&self.plant, inverter_id, params)
    }

    /// Load gauge of one inverter: percent of rated output and its tier
    /// under the load thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownEquipment`] for an unknown inverter.
    pub fn load_gauge(&self, inverter_id: &str) -> Result<(f64, Status), ModelError> {
        let percent = self.plant.inverter(inverter_id)?.load_percent();
        Ok((percent, classify(percent, self.thresholds.load)))
    }

    /// Live readings of one inverter, each with its threshold tier.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownEquipment`] for an unknown inverter.
    pub fn live_status(
        &self,
        inverter_id: &str,
        at: NaiveDateTime,
    ) -> Result<Vec<(Reading, Option<Status>)>, ModelError> {
        let inv = self.plant.inverter(inverter_id)?;
        Ok([
            Reading::new(at, MetricKind::Power, inv.power_kw),
            Reading::new(at, MetricKind::Voltage, inv.voltage_v),
            Reading::new(at, MetricKind::Current, inv.current_a),
            Reading::new(at, MetricKind::Temperature, inv.temperature_c),
        ]
        .into_iter()
        .map(|r| {
            let status = self.thresholds.classify_reading(&r);
            (r, status)
        })
        .collect())
    }
}
