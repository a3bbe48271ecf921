//! TOML-based plant configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ModelError;
use crate::plant::{Inverter, Plant, PvString, RefreshConfig};
use crate::sim::classify::{ThresholdSet, Thresholds};
use crate::sim::generator::{Band, GeneratorConfig};

/// Top-level plant configuration parsed from TOML.
///
/// All sections have defaults matching the `default` preset's settings;
/// the inverter list defaults to the two-inverter dashboard plant. Load
/// from TOML with [`PlantConfig::from_toml_file`] or pick a preset with
/// [`PlantConfig::from_preset`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlantConfig {
    /// Plant identity and live-refresh seed.
    #[serde(default)]
    pub plant: PlantSection,
    /// Value ranges of the telemetry generator.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Live refresh cadence and random-walk step.
    #[serde(default)]
    pub refresh: RefreshSection,
    /// Installed warning/critical thresholds.
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    /// Inverters in display order.
    #[serde(default = "dashboard_inverters")]
    pub inverters: Vec<InverterConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlantSection {
    pub name: String,
    /// Seed of the live-refresh random walk.
    pub seed: u64,
}

impl Default for PlantSection {
    fn default() -> Self {
        Self {
            name: "Solar Plant".to_string(),
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Inverter AC voltage band, lower edge (V).
    pub inverter_voltage_min: f64,
    /// Inverter AC voltage band, upper edge (V).
    pub inverter_voltage_max: f64,
    /// String DC voltage band, lower edge (V).
    pub string_voltage_min: f64,
    /// String DC voltage band, upper edge (V).
    pub string_voltage_max: f64,
    pub temperature_min_c: f64,
    pub temperature_max_c: f64,
    /// Clear-sky peak irradiance (W/m²).
    pub peak_irradiance_w_m2: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            inverter_voltage_min: 350.0,
            inverter_voltage_max: 400.0,
            string_voltage_min: 580.0,
            string_voltage_max: 610.0,
            temperature_min_c: 20.0,
            temperature_max_c: 70.0,
            peak_irradiance_w_m2: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefreshSection {
    /// Inverter telemetry refresh interval (ms, must be > 0).
    pub inverter_interval_ms: u64,
    /// String telemetry refresh interval (ms, must be > 0).
    pub string_interval_ms: u64,
    /// Max power change per tick (% of rated, 0-100].
    pub power_step_pct: f64,
}

impl Default for RefreshSection {
    fn default() -> Self {
        Self {
            inverter_interval_ms: 5000,
            string_interval_ms: 2000,
            power_step_pct: 3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdsConfig {
    /// Performance shortfall (% below expected generation).
    pub performance: Thresholds,
    /// Inverter load gauge (% of rated output).
    pub load: Thresholds,
    /// Equipment temperature (°C).
    pub temperature: Thresholds,
    /// Inverter AC voltage (V).
    pub voltage: Thresholds,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        let set = ThresholdSet::default();
        Self {
            performance: set.performance,
            load: set.load,
            temperature: set.temperature,
            voltage: set.voltage,
        }
    }
}

/// One inverter and its initial live telemetry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InverterConfig {
    pub id: String,
    pub name: String,
    #[serde(default = "default_online")]
    pub online: bool,
    pub rated_kw: f64,
    #[serde(default)]
    pub power_kw: f64,
    #[serde(default)]
    pub voltage_v: f64,
    #[serde(default)]
    pub current_a: f64,
    #[serde(default)]
    pub temperature_c: f64,
    #[serde(default)]
    pub strings: Vec<StringConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StringConfig {
    pub id: String,
    #[serde(default)]
    pub voltage_v: f64,
    #[serde(default)]
    pub current_a: f64,
}

fn default_online() -> bool {
    true
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"inverters[0].rated_kw"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

fn inverter(
    id: &str,
    name: &str,
    online: bool,
    telemetry: [f64; 4],
    strings: &[(&str, f64, f64)],
) -> InverterConfig {
    let [power_kw, voltage_v, current_a, temperature_c] = telemetry;
    InverterConfig {
        id: id.to_string(),
        name: name.to_string(),
        online,
        rated_kw: 30.0,
        power_kw,
        voltage_v,
        current_a,
        temperature_c,
        strings: strings
            .iter()
            .map(|&(id, voltage_v, current_a)| StringConfig {
                id: id.to_string(),
                voltage_v,
                current_a,
            })
            .collect(),
    }
}

fn dashboard_inverters() -> Vec<InverterConfig> {
    vec![
        inverter(
            "inv1",
            "Inverter 01",
            true,
            [27.5, 380.0, 25.4, 42.3],
            &[
                ("ST1-A", 595.1, 14.52),
                ("ST1-B", 594.8, 14.35),
                ("ST1-C", 593.2, 14.48),
            ],
        ),
        inverter(
            "inv2",
            "Inverter 02",
            true,
            [27.3, 380.0, 25.1, 43.1],
            &[
                ("ST2-A", 596.3, 14.27),
                ("ST2-B", 595.9, 14.38),
                ("ST2-C", 594.5, 14.19),
            ],
        ),
    ]
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self::dashboard()
    }
}

impl PlantConfig {
    /// Two inverters with three strings each, as shown on the dashboard.
    pub fn dashboard() -> Self {
        Self {
            plant: PlantSection::default(),
            telemetry: TelemetryConfig::default(),
            refresh: RefreshSection::default(),
            thresholds: ThresholdsConfig::default(),
            inverters: dashboard_inverters(),
        }
    }

    /// Four inverters for IV-curve testing; `inv4` is offline.
    pub fn iv_test() -> Self {
        let mut inverters = dashboard_inverters();
        inverters.push(inverter(
            "inv3",
            "Inverter 03",
            true,
            [26.9, 379.0, 24.8, 47.6],
            &[("ST3-A", 594.0, 14.10), ("ST3-B", 593.7, 14.22)],
        ));
        inverters.push(inverter(
            "inv4",
            "Inverter 04",
            false,
            [0.0, 0.0, 0.0, 31.0],
            &[("ST4-A", 0.0, 0.0), ("ST4-B", 0.0, 0.0)],
        ));
        Self {
            plant: PlantSection {
                name: "Solar Plant (IV test)".to_string(),
                ..PlantSection::default()
            },
            inverters,
            ..Self::dashboard()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["default", "iv_test"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "default" => Ok(Self::dashboard()),
            "iv_test" => Ok(Self::iv_test()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut push = |field: String, message: &str| {
            errors.push(ConfigError {
                field,
                message: message.to_string(),
            });
        };

        if self.plant.name.trim().is_empty() {
            push("plant.name".into(), "must not be empty");
        }

        let t = &self.telemetry;
        for (field, min, max) in [
            ("inverter_voltage", t.inverter_voltage_min, t.inverter_voltage_max),
            ("string_voltage", t.string_voltage_min, t.string_voltage_max),
            ("temperature", t.temperature_min_c, t.temperature_max_c),
        ] {
            if !(min.is_finite() && max.is_finite() && min < max) {
                push(format!("telemetry.{field}"), "min must be < max");
            }
        }
        if t.inverter_voltage_min <= 0.0 || t.string_voltage_min <= 0.0 {
            push("telemetry".into(), "voltage bands must be > 0");
        }
        if !(t.peak_irradiance_w_m2 > 0.0) {
            push("telemetry.peak_irradiance_w_m2".into(), "must be > 0");
        }

        let r = &self.refresh;
        if r.inverter_interval_ms == 0 {
            push("refresh.inverter_interval_ms".into(), "must be > 0");
        }
        if r.string_interval_ms == 0 {
            push("refresh.string_interval_ms".into(), "must be > 0");
        }
        if !(r.power_step_pct > 0.0 && r.power_step_pct <= 100.0) {
            push("refresh.power_step_pct".into(), "must be in (0, 100]");
        }

        for (field, th) in [
            ("performance", self.thresholds.performance),
            ("load", self.thresholds.load),
            ("temperature", self.thresholds.temperature),
            ("voltage", self.thresholds.voltage),
        ] {
            if !(th.warning <= th.critical) {
                push(
                    format!("thresholds.{field}"),
                    "warning must be <= critical",
                );
            }
        }

        if self.inverters.is_empty() {
            push("inverters".into(), "at least one inverter is required");
        }
        let mut inverter_ids = std::collections::HashSet::new();
        let mut string_ids = std::collections::HashSet::new();
        for (i, inv) in self.inverters.iter().enumerate() {
            let at = |f: &str| format!("inverters[{i}].{f}");
            if inv.id.trim().is_empty() {
                push(at("id"), "must not be empty");
            } else if !inverter_ids.insert(inv.id.as_str()) {
                push(at("id"), "duplicate inverter id");
            }
            if !(inv.rated_kw > 0.0 && inv.rated_kw.is_finite()) {
                push(at("rated_kw"), "must be > 0");
            }
            if !(0.0..=inv.rated_kw).contains(&inv.power_kw) {
                push(at("power_kw"), "must be in [0, rated_kw]");
            }
            for (j, s) in inv.strings.iter().enumerate() {
                if s.id.trim().is_empty() {
                    push(format!("inverters[{i}].strings[{j}].id"), "must not be empty");
                } else if !string_ids.insert(s.id.as_str()) {
                    push(format!("inverters[{i}].strings[{j}].id"), "duplicate string id");
                }
            }
        }

        errors
    }

    /// Builds the plant topology with its initial telemetry.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] for values the plant constructors
    /// reject; run [`validate`](Self::validate) first for field paths.
    pub fn build_plant(&self) -> Result<Plant, ModelError> {
        let inverters = self
            .inverters
            .iter()
            .map(|cfg| {
                let strings = cfg
                    .strings
                    .iter()
                    .map(|s| PvString::new(&s.id, s.voltage_v, s.current_a))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Inverter::new(&cfg.id, &cfg.name, cfg.rated_kw, strings)?
                    .with_telemetry(cfg.power_kw, cfg.voltage_v, cfg.current_a, cfg.temperature_c)?
                    .with_online(cfg.online))
            })
            .collect::<Result<Vec<_>, ModelError>>()?;
        Plant::new(&self.plant.name, inverters)
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        let t = &self.telemetry;
        GeneratorConfig {
            inverter_voltage: Band::new(t.inverter_voltage_min, t.inverter_voltage_max),
            string_voltage: Band::new(t.string_voltage_min, t.string_voltage_max),
            temperature: Band::new(t.temperature_min_c, t.temperature_max_c),
            peak_irradiance_w_m2: t.peak_irradiance_w_m2,
        }
    }

    pub fn refresh_config(&self) -> RefreshConfig {
        let g = self.generator_config();
        RefreshConfig {
            power_step_pct: self.refresh.power_step_pct,
            inverter_voltage: g.inverter_voltage,
            string_voltage: g.string_voltage,
            temperature: g.temperature,
            ..RefreshConfig::default()
        }
    }

    pub fn threshold_set(&self) -> ThresholdSet {
        ThresholdSet {
            performance: self.thresholds.performance,
            load: self.thresholds.load,
            temperature: self.thresholds.temperature,
            voltage: self.thresholds.voltage,
        }
    }

    pub fn inverter_interval(&self) -> Duration {
        Duration::from_millis(self.refresh.inverter_interval_ms)
    }

    pub fn string_interval(&self) -> Duration {
        Duration::from_millis(self.refresh.string_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_valid() {
        for name in PlantConfig::PRESETS {
            let errors = PlantConfig::from_preset(name)
                .expect("preset exists")
                .validate();
            assert!(errors.is_empty(), "{name} should be valid: {errors:?}");
        }
    }

    #[test]
    fn from_preset_unknown() {
        let err = PlantConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn presets_build_plants() {
        let plant = PlantConfig::dashboard().build_plant().expect("dashboard builds");
        assert_eq!(plant.inverters().len(), 2);
        assert_eq!(plant.inverters()[0].strings.len(), 3);

        let plant = PlantConfig::iv_test().build_plant().expect("iv_test builds");
        assert_eq!(plant.online_count(), 3);
        assert!(!plant.inverter("inv4").expect("inv4 exists").online);
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[plant]
name = "Rooftop"
seed = 7

[telemetry]
inverter_voltage_min = 360.0
inverter_voltage_max = 410.0

[refresh]
inverter_interval_ms = 1000

[thresholds]
temperature = { warning = 50.0, critical = 60.0 }

[[inverters]]
id = "inv1"
name = "Inverter 01"
rated_kw = 10.0
power_kw = 8.0

[[inverters.strings]]
id = "S1"
voltage_v = 590.0
current_a = 6.5
"#;
        let cfg = PlantConfig::from_toml_str(toml).expect("valid TOML should parse");
        assert!(cfg.validate().is_empty());
        assert_eq!(cfg.plant.seed, 7);
        assert_eq!(cfg.telemetry.string_voltage_min, 580.0);
        assert_eq!(cfg.refresh.string_interval_ms, 2000);
        assert_eq!(cfg.thresholds.temperature.critical, 60.0);
        assert_eq!(cfg.thresholds.performance, Thresholds::new(5.0, 15.0));
        assert_eq!(cfg.inverters.len(), 1);
        assert!(cfg.inverters[0].online);
        assert_eq!(cfg.inverter_interval(), Duration::from_secs(1));
    }

    #[test]
    fn missing_inverters_default_to_dashboard() {
        let cfg = PlantConfig::from_toml_str("[plant]\nname = \"x\"\n").expect("parses");
        assert_eq!(cfg.inverters.len(), 2);
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[refresh]
inverter_interval_ms = 1000
bogus_field = true
"#;
        assert!(PlantConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn validation_catches_duplicates() {
        let mut cfg = PlantConfig::dashboard();
        cfg.inverters[1].id = "inv1".to_string();
        cfg.inverters[1].strings[0].id = "ST1-A".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "inverters[1].id"));
        assert!(errors.iter().any(|e| e.field == "inverters[1].strings[0].id"));
    }

    #[test]
    fn validation_catches_bad_ranges() {
        let mut cfg = PlantConfig::dashboard();
        cfg.telemetry.temperature_min_c = 80.0;
        cfg.refresh.string_interval_ms = 0;
        cfg.thresholds.voltage = Thresholds::new(410.0, 400.0);
        cfg.inverters[0].power_kw = 31.0;
        let errors = cfg.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"telemetry.temperature"));
        assert!(fields.contains(&"refresh.string_interval_ms"));
        assert!(fields.contains(&"thresholds.voltage"));
        assert!(fields.contains(&"inverters[0].power_kw"));
    }

    #[test]
    fn validation_requires_inverters() {
        let mut cfg = PlantConfig::dashboard();
        cfg.inverters.clear();
        assert!(cfg.validate().iter().any(|e| e.field == "inverters"));
    }
}
