//! Live telemetry refresh for the dashboard view.
//!
//! Unlike the deterministic generator, live values follow a seeded random
//! walk. Each refresh returns a new [`Plant`] computed from the old one.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::sim::generator::Band;

use super::types::{Inverter, Plant, PvString};

/// Random-walk step bounds for one refresh tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshConfig {
    /// Max power change per tick as a percent of rated capacity.
    pub power_step_pct: f64,
    /// Std-dev of the inverter voltage jitter (V).
    pub voltage_noise_v: f64,
    /// Std-dev of the temperature jitter (°C).
    pub temperature_noise_c: f64,
    /// Std-dev of the string current jitter (A).
    pub string_current_noise_a: f64,
    pub inverter_voltage: Band,
    pub string_voltage: Band,
    pub temperature: Band,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            power_step_pct: 3.0,
            voltage_noise_v: 1.0,
            temperature_noise_c: 0.3,
            string_current_noise_a: 0.1,
            inverter_voltage: Band::new(350.0, 400.0),
            string_voltage: Band::new(580.0, 610.0),
            temperature: Band::new(20.0, 70.0),
        }
    }
}

/// Seeded source of live telemetry updates.
#[derive(Debug, Clone)]
pub struct TelemetryRefresher {
    config: RefreshConfig,
    rng: StdRng,
}

impl TelemetryRefresher {
    pub fn new(config: RefreshConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Steps inverter power, voltage, temperature and current.
    ///
    /// Offline inverters report zero power and current and keep their last
    /// voltage and temperature.
    pub fn refresh_inverters(&mut self, plant: &Plant) -> Plant {
        let inverters = plant
            .inverters()
            .iter()
            .map(|inv| self.step_inverter(inv))
            .collect();
        plant.with_telemetry(inverters)
    }

    /// Jitters string voltage and current; strings of offline inverters
    /// carry no current.
    pub fn refresh_strings(&mut self, plant: &Plant) -> Plant {
        let inverters = plant
            .inverters()
            .iter()
            .map(|inv| Inverter {
                strings: inv
                    .strings
                    .iter()
                    .map(|s| self.step_string(s, inv.online))
                    .collect(),
                ..inv.clone()
            })
            .collect();
        plant.with_telemetry(inverters)
    }

    fn step_inverter(&mut self, inv: &Inverter) -> Inverter {
        if !inv.online {
            return Inverter {
                power_kw: 0.0,
                current_a: 0.0,
                ..inv.clone()
            };
        }

        let c = &self.config;
        let step_kw = inv.rated_kw * c.power_step_pct / 100.0;
        let power_kw = (inv.power_kw + self.rng.random_range(-1.0_f64..=1.0) * step_kw)
            .min(inv.rated_kw)
            .max(0.0);
        let voltage_v = c
            .inverter_voltage
            .clamp(inv.voltage_v + gaussian_noise(&mut self.rng, c.voltage_noise_v));
        let temperature_c = c
            .temperature
            .clamp(inv.temperature_c + gaussian_noise(&mut self.rng, c.temperature_noise_c));
        let current_a = if voltage_v > 0.0 {
            power_kw * 1000.0 / voltage_v
        } else {
            0.0
        };

        Inverter {
            power_kw,
            voltage_v,
            current_a,
            temperature_c,
            ..inv.clone()
        }
    }

    fn step_string(&mut self, s: &PvString, online: bool) -> PvString {
        let c = &self.config;
        let voltage_v = c
            .string_voltage
            .clamp(s.voltage_v + gaussian_noise(&mut self.rng, c.voltage_noise_v * 0.5));
        let current_a = if online {
            (s.current_a + gaussian_noise(&mut self.rng, c.string_current_noise_a)).max(0.0)
        } else {
            0.0
        };
        PvString {
            id: s.id.clone(),
            voltage_v,
            current_a,
        }
    }
}

/// Gaussian noise with mean 0 via the Box-Muller transform.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `std_dev` - Standard deviation of the noise
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}
