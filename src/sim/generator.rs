//! Deterministic synthetic telemetry.
//!
//! Every reading is a pure function of the equipment profile, metric kind,
//! time descriptor and shape, so charts redraw with identical values.

use std::f64::consts::PI;

use crate::error::ModelError;

use super::seed::{id_salt, mix, unit_noise};
use super::time::TimeDescriptor;
use super::types::{EquipmentKind, EquipmentProfile, MetricKind, Reading};

/// Closed value range `[min, max]`; `min <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    min: f64,
    max: f64,
}

impl Band {
    /// Creates a band from two endpoints in either order.
    ///
    /// A NaN endpoint collapses the band onto the other one.
    ///
    /// # Examples
    ///
    /// ```
    /// use pv_monitor::sim::generator::Band;
    ///
    /// let band = Band::new(70.0, 20.0);
    /// assert_eq!((band.min(), band.max()), (20.0, 70.0));
    /// assert_eq!(band.clamp(95.0), 70.0);
    /// ```
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Nearest point of the band to `value`.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    /// Point at fraction `t` (0..=1) of the band.
    pub fn lerp(&self, t: f64) -> f64 {
        self.clamp(self.min + self.span() * t.clamp(0.0, 1.0))
    }
}

/// Plant-class ranges the generator draws from.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// AC voltage band of inverters (V).
    pub inverter_voltage: Band,
    /// DC voltage band of strings (V).
    pub string_voltage: Band,
    /// Equipment and ambient temperature band (°C).
    pub temperature: Band,
    /// Clear-sky peak irradiance (W/m²).
    pub peak_irradiance_w_m2: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            inverter_voltage: Band::new(350.0, 400.0),
            string_voltage: Band::new(580.0, 610.0),
            temperature: Band::new(20.0, 70.0),
            peak_irradiance_w_m2: 1000.0,
        }
    }
}

/// Envelope applied on top of the seeded noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    /// Diurnal sine for hourly descriptors, times the seasonal curve.
    #[default]
    Solar,
    /// No envelope; the value depends on the noise alone.
    Flat,
}

impl Shape {
    /// Envelope factor in `[0, 1]` for a time descriptor.
    pub fn factor(&self, at: &TimeDescriptor) -> f64 {
        match self {
            Self::Flat => 1.0,
            Self::Solar => {
                let seasonal = seasonal_envelope(at.month_of_year());
                match at.hour_of_day() {
                    Some(hour) => diurnal_envelope(hour) * seasonal,
                    None => seasonal,
                }
            }
        }
    }
}

/// Daylight curve: `sin(π (h - 6) / 12)` between 06:00 and 18:00, else 0.
///
/// # Examples
///
/// ```
/// use pv_monitor::sim::generator::diurnal_envelope;
///
/// assert_eq!(diurnal_envelope(3), 0.0);
/// assert!((diurnal_envelope(12) - 1.0).abs() < 1e-12);
/// ```
pub fn diurnal_envelope(hour: u32) -> f64 {
    if !(6..=18).contains(&hour) {
        return 0.0;
    }
    (PI * (f64::from(hour) - 6.0) / 12.0).sin().max(0.0)
}

/// Seasonal curve peaking in January: `(2 + cos(2π (m - 1) / 12)) / 3`.
pub fn seasonal_envelope(month: u32) -> f64 {
    let phase = 2.0 * PI * (f64::from(month) - 1.0) / 12.0;
    (2.0 + phase.cos()) / 3.0
}

/// Produces synthetic readings for equipment of a configured plant class.
#[derive(Debug, Clone, Default)]
pub struct TelemetryGenerator {
    config: GeneratorConfig,
}

impl TelemetryGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates one reading.
    ///
    /// # Arguments
    ///
    /// * `equipment` - Identifier, kind and rated capacity of the source
    /// * `kind` - Metric to generate
    /// * `at` - Hour, day or month the reading describes
    /// * `shape` - Envelope applied to power, temperature and irradiance
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnsupportedMetric`] when the equipment kind has
    /// no rule for `kind`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pv_monitor::sim::generator::{Shape, TelemetryGenerator};
    /// use pv_monitor::sim::time::TimeDescriptor;
    /// use pv_monitor::sim::types::{EquipmentKind, EquipmentProfile, MetricKind};
    ///
    /// let generator = TelemetryGenerator::default();
    /// let inv = EquipmentProfile::new("inv1", EquipmentKind::Inverter, 30.0);
    /// let at = TimeDescriptor::hour(2025, 5, 15, 12).expect("valid hour");
    /// let reading = generator
    ///     .generate(&inv, MetricKind::Power, at, Shape::Solar)
    ///     .expect("inverters report power");
    /// assert!((0.0..=30.0).contains(&reading.value));
    /// ```
    pub fn generate(
        &self,
        equipment: &EquipmentProfile,
        kind: MetricKind,
        at: TimeDescriptor,
        shape: Shape,
    ) -> Result<Reading, ModelError> {
        if !equipment.kind.supports(kind) {
            return Err(ModelError::UnsupportedMetric(format!(
                "{kind} on {:?} {}",
                equipment.kind, equipment.id
            )));
        }

        let value = match kind {
            MetricKind::Power => self.power_kw(equipment, at, shape),
            MetricKind::Voltage => self.voltage_v(equipment, at),
            MetricKind::Current => {
                // P[kW] * 1000 / V
                let power = self.power_kw(equipment, at, shape);
                power * 1000.0 / self.voltage_v(equipment, at)
            }
            MetricKind::Temperature => {
                let s = shape.factor(&at);
                let u = self.noise(equipment, MetricKind::Temperature, at);
                self.config.temperature.lerp(0.6 * s + 0.4 * u)
            }
            MetricKind::Irradiance => {
                let s = shape.factor(&at);
                let u = self.noise(equipment, MetricKind::Irradiance, at);
                self.config.peak_irradiance_w_m2 * s * (0.7 + 0.3 * u)
            }
        };

        Ok(Reading::new(at.timestamp(), kind, value))
    }

    /// Same as [`generate`](Self::generate) with the metric given by name.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnsupportedMetric`] for unknown metric names.
    pub fn generate_named(
        &self,
        equipment: &EquipmentProfile,
        metric: &str,
        at: TimeDescriptor,
        shape: Shape,
    ) -> Result<Reading, ModelError> {
        self.generate(equipment, metric.parse()?, at, shape)
    }

    /// Modelled (noise-free) power for the descriptor: `rated · shape`.
    pub fn expected_power_kw(
        &self,
        equipment: &EquipmentProfile,
        at: &TimeDescriptor,
        shape: Shape,
    ) -> f64 {
        equipment.rated_kw * shape.factor(at)
    }

    fn power_kw(&self, equipment: &EquipmentProfile, at: TimeDescriptor, shape: Shape) -> f64 {
        let expected = self.expected_power_kw(equipment, &at, shape);
        let u = self.noise(equipment, MetricKind::Power, at);
        (expected * (0.7 + 0.5 * u)).min(equipment.rated_kw).max(0.0)
    }

    fn voltage_v(&self, equipment: &EquipmentProfile, at: TimeDescriptor) -> f64 {
        let band = match equipment.kind {
            EquipmentKind::String => self.config.string_voltage,
            _ => self.config.inverter_voltage,
        };
        band.lerp(self.noise(equipment, MetricKind::Voltage, at))
    }

    fn noise(&self, equipment: &EquipmentProfile, kind: MetricKind, at: TimeDescriptor) -> f64 {
        unit_noise(mix(at.seed(), id_salt(&equipment.id), kind.salt()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inverter() -> EquipmentProfile {
        EquipmentProfile::new("inv1", EquipmentKind::Inverter, 27.5)
    }

    fn hour(month: u32, day: u32, hour: u32) -> TimeDescriptor {
        TimeDescriptor::hour(2025, month, day, hour).expect("valid hour")
    }

    fn hours() -> impl Iterator<Item = TimeDescriptor> {
        (1..=12).flat_map(|m| (0..24).map(move |h| hour(m, 15, h)))
    }

    fn value(
        g: &TelemetryGenerator,
        eq: &EquipmentProfile,
        kind: MetricKind,
        at: TimeDescriptor,
    ) -> f64 {
        g.generate(eq, kind, at, Shape::Solar)
            .expect("supported metric")
            .value
    }

    #[test]
    fn identical_inputs_give_identical_values() {
        let g = TelemetryGenerator::default();
        let inv = inverter();
        for at in hours() {
            for kind in [
                MetricKind::Power,
                MetricKind::Voltage,
                MetricKind::Current,
                MetricKind::Temperature,
            ] {
                let a = value(&g, &inv, kind, at);
                let b = value(&g, &inv, kind, at);
                assert_eq!(a.to_bits(), b.to_bits());
            }
        }
    }

    #[test]
    fn inverter_values_stay_in_range() {
        let g = TelemetryGenerator::default();
        let cfg = g.config().clone();
        let inv = inverter();
        for at in hours() {
            assert!((0.0..=27.5).contains(&value(&g, &inv, MetricKind::Power, at)));
            assert!(cfg.inverter_voltage.contains(value(&g, &inv, MetricKind::Voltage, at)));
            assert!(cfg.temperature.contains(value(&g, &inv, MetricKind::Temperature, at)));
        }
    }

    #[test]
    fn string_voltage_uses_dc_band() {
        let g = TelemetryGenerator::default();
        let st = EquipmentProfile::new("ST1-A", EquipmentKind::String, 9.0);
        for at in hours() {
            assert!((580.0..=610.0).contains(&value(&g, &st, MetricKind::Voltage, at)));
        }
    }

    #[test]
    fn band_orders_its_endpoints() {
        let band = Band::new(70.0, 20.0);
        assert_eq!((band.min(), band.max()), (20.0, 70.0));
        assert_eq!(band, Band::new(20.0, 70.0));
        assert_eq!(band.lerp(0.0), 20.0);
        assert_eq!(band.lerp(2.0), 70.0);
        assert_eq!(band.clamp(-5.0), 20.0);
        assert!(band.contains(45.0));
        assert!(!band.contains(70.5));

        let collapsed = Band::new(f64::NAN, 5.0);
        assert_eq!((collapsed.min(), collapsed.max()), (5.0, 5.0));
        assert_eq!(collapsed.clamp(9.0), 5.0);
    }

    #[test]
    fn reversed_temperature_band_generates_within_range() {
        let g = TelemetryGenerator::new(GeneratorConfig {
            temperature: Band::new(70.0, 20.0),
            inverter_voltage: Band::new(400.0, 350.0),
            ..GeneratorConfig::default()
        });
        let inv = inverter();
        for at in hours() {
            let t = value(&g, &inv, MetricKind::Temperature, at);
            assert!((20.0..=70.0).contains(&t), "{t} outside 20-70");
            let v = value(&g, &inv, MetricKind::Voltage, at);
            assert!((350.0..=400.0).contains(&v), "{v} outside 350-400");
        }
    }

    #[test]
    fn night_power_is_zero() {
        let g = TelemetryGenerator::default();
        assert_eq!(value(&g, &inverter(), MetricKind::Power, hour(5, 15, 2)), 0.0);
    }

    #[test]
    fn negative_rating_yields_zero_power() {
        let g = TelemetryGenerator::default();
        let mut inv = inverter();
        inv.rated_kw = -3.0;
        assert_eq!(value(&g, &inv, MetricKind::Power, hour(5, 15, 12)), 0.0);
    }

    #[test]
    fn current_is_power_over_voltage() {
        let g = TelemetryGenerator::default();
        let inv = inverter();
        let at = hour(1, 10, 11);
        let p = value(&g, &inv, MetricKind::Power, at);
        let v = value(&g, &inv, MetricKind::Voltage, at);
        let i = value(&g, &inv, MetricKind::Current, at);
        assert!((i - p * 1000.0 / v).abs() < 1e-9);
    }

    #[test]
    fn unsupported_metric_is_rejected() {
        let g = TelemetryGenerator::default();
        let at = TimeDescriptor::day(2025, 5, 15).expect("valid day");
        let st = EquipmentProfile::new("ST1-A", EquipmentKind::String, 9.0);
        assert!(matches!(
            g.generate(&st, MetricKind::Temperature, at, Shape::Solar),
            Err(ModelError::UnsupportedMetric(_))
        ));
        assert!(matches!(
            g.generate_named(&inverter(), "humidity", at, Shape::Flat),
            Err(ModelError::UnsupportedMetric(_))
        ));
    }

    #[test]
    fn different_equipment_differs() {
        let g = TelemetryGenerator::default();
        let a = EquipmentProfile::new("inv1", EquipmentKind::Inverter, 27.5);
        let b = EquipmentProfile::new("inv2", EquipmentKind::Inverter, 27.5);
        let differing = hours()
            .filter(|at| {
                value(&g, &a, MetricKind::Voltage, *at) != value(&g, &b, MetricKind::Voltage, *at)
            })
            .count();
        assert!(differing > 0);
    }

    #[test]
    fn envelopes_have_expected_shape() {
        assert_eq!(diurnal_envelope(5), 0.0);
        assert!(diurnal_envelope(6).abs() < 1e-12);
        assert!(diurnal_envelope(18).abs() < 1e-12);
        assert!(diurnal_envelope(9) < diurnal_envelope(12));
        assert!((seasonal_envelope(1) - 1.0).abs() < 1e-12);
        assert!((seasonal_envelope(7) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn weather_station_irradiance_in_range() {
        let g = TelemetryGenerator::default();
        let ws = EquipmentProfile::weather_station("ws");
        for at in hours() {
            assert!((0.0..=1000.0).contains(&value(&g, &ws, MetricKind::Irradiance, at)));
        }
    }
}
