//! IV-curve test of an online inverter's string array.
//!
//! The curve follows a normalised single-diode model:
//!
//! ```text
//! I = Isc * (1 - (exp(a * V / Voc) - 1) / (exp(a) - 1)),   a = 15 / (n * Vt / Vt_stc)
//! ```
//!
//! so `I(0) = Isc`, `I(Voc) = 0`, and a hotter array bends the knee earlier.

use serde::Serialize;
use tracing::info;

use crate::error::ModelError;
use crate::plant::Plant;
use crate::sim::seed::{id_salt, unit_noise};

const K_BOLTZMANN: f64 = 1.380_649e-23;
const Q_ELECTRON: f64 = 1.602_176_634e-19;
const STC_TEMP_C: f64 = 25.0;
const KELVIN: f64 = 273.15;

/// Conditions of an IV sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IvTestParameters {
    /// Open-circuit voltage of the array (V).
    pub voc_v: f64,
    /// Short-circuit current at the test irradiance (A).
    pub isc_a: f64,
    /// Cell temperature (°C).
    pub temperature_c: f64,
    /// Plane-of-array irradiance during the test (W/m²).
    pub irradiance_w_m2: f64,
    /// Diode ideality factor.
    pub ideality: f64,
    /// Number of sweep points, endpoints included.
    pub points: usize,
}

impl Default for IvTestParameters {
    fn default() -> Self {
        Self {
            voc_v: 1000.0,
            isc_a: 9.2,
            temperature_c: 25.0,
            irradiance_w_m2: 850.0,
            ideality: 1.3,
            points: 101,
        }
    }
}

impl IvTestParameters {
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] for non-positive Voc, Isc or
    /// ideality, a temperature below absolute zero, or fewer than 2 points.
    pub fn validate(&self) -> Result<(), ModelError> {
        let positive = [
            ("voc_v", self.voc_v),
            ("isc_a", self.isc_a),
            ("ideality", self.ideality),
        ];
        if let Some((name, value)) = positive
            .iter()
            .find(|(_, v)| !v.is_finite() || *v <= 0.0)
        {
            return Err(ModelError::invalid(format!(
                "IV test {name} must be > 0, got {value}"
            )));
        }
        if !self.temperature_c.is_finite() || self.temperature_c <= -KELVIN {
            return Err(ModelError::invalid(format!(
                "IV test temperature {} °C is not physical",
                self.temperature_c
            )));
        }
        if !self.irradiance_w_m2.is_finite() || self.irradiance_w_m2 < 0.0 {
            return Err(ModelError::invalid("IV test irradiance must be >= 0"));
        }
        if self.points < 2 {
            return Err(ModelError::invalid("IV test needs at least 2 points"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IvPoint {
    pub voltage_v: f64,
    pub current_a: f64,
    pub power_w: f64,
}

/// Characteristic values read off a traced curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IvSummary {
    pub voc_v: f64,
    pub isc_a: f64,
    pub vmp_v: f64,
    pub imp_a: f64,
    pub pmax_w: f64,
    pub fill_factor: f64,
}

/// Result of one IV test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IvCurve {
    pub inverter_id: String,
    pub parameters: IvTestParameters,
    pub points: Vec<IvPoint>,
    pub summary: IvSummary,
}

/// Thermal voltage `kT/q` (V) at a temperature in °C.
pub fn thermal_voltage(temperature_c: f64) -> f64 {
    K_BOLTZMANN * (temperature_c + KELVIN) / Q_ELECTRON
}

/// Current at `voltage` on the normalised single-diode curve.
///
/// Returns `isc` at or below 0 V and 0 at or above `voc`.
pub fn diode_current(voltage: f64, isc: f64, voc: f64, ideality: f64, temperature_c: f64) -> f64 {
    if voc <= 0.0 || isc <= 0.0 || voltage >= voc {
        return 0.0;
    }
    if voltage <= 0.0 {
        return isc;
    }

    let temp_ratio = thermal_voltage(temperature_c) / thermal_voltage(STC_TEMP_C);
    let a = 15.0 / (ideality * temp_ratio);
    let v_norm = voltage / voc;
    let denom = a.min(700.0).exp() - 1.0;
    if denom.abs() < 1e-30 {
        return isc * (1.0 - v_norm);
    }
    (isc * (1.0 - ((a * v_norm).min(700.0).exp() - 1.0) / denom)).max(0.0)
}

/// Sweeps voltage from 0 to Voc in evenly spaced steps.
///
/// # Errors
///
/// Returns [`ModelError::InvalidInput`] if the parameters do not validate.
pub fn trace(params: &IvTestParameters) -> Result<Vec<IvPoint>, ModelError> {
    params.validate()?;
    let last = (params.points - 1) as f64;
    Ok((0..params.points)
        .map(|i| {
            let voltage_v = params.voc_v * i as f64 / last;
            let current_a = diode_current(
                voltage_v,
                params.isc_a,
                params.voc_v,
                params.ideality,
                params.temperature_c,
            );
            IvPoint {
                voltage_v,
                current_a,
                power_w: voltage_v * current_a,
            }
        })
        .collect())
}

/// Reads Voc, Isc, the maximum power point and the fill factor off a curve.
pub fn summarize(points: &[IvPoint]) -> IvSummary {
    let isc_a = points.first().map_or(0.0, |p| p.current_a);
    let voc_v = points.last().map_or(0.0, |p| p.voltage_v);
    let mpp = points
        .iter()
        .copied()
        .fold(None::<IvPoint>, |best, p| match best {
            Some(b) if b.power_w >= p.power_w => Some(b),
            _ => Some(p),
        });
    let (vmp_v, imp_a, pmax_w) =
        mpp.map_or((0.0, 0.0, 0.0), |p| (p.voltage_v, p.current_a, p.power_w));
    let denom = voc_v * isc_a;
    let fill_factor = if denom > 0.0 {
        (pmax_w / denom).clamp(0.0, 1.0)
    } else {
        0.0
    };
    IvSummary {
        voc_v,
        isc_a,
        vmp_v,
        imp_a,
        pmax_w,
        fill_factor,
    }
}

/// Runs an IV test on one inverter.
///
/// Each inverter's array shows a small, stable soiling loss (up to 5% of
/// Isc) derived from its id, so repeated tests of one inverter agree.
///
/// # Errors
///
/// Returns [`ModelError::UnknownEquipment`] for an unknown id,
/// [`ModelError::EquipmentOffline`] if the inverter is offline, or
/// [`ModelError::InvalidInput`] for bad parameters.
pub fn run_iv_test(
    plant: &Plant,
    inverter_id: &str,
    params: &IvTestParameters,
) -> Result<IvCurve, ModelError> {
    let inverter = plant.inverter(inverter_id)?;
    if !inverter.online {
        return Err(ModelError::EquipmentOffline(inverter_id.to_string()));
    }

    let soiling = 1.0 - 0.05 * unit_noise(id_salt(inverter_id));
    let effective = IvTestParameters {
        isc_a: params.isc_a * soiling,
        ..params.clone()
    };
    let points = trace(&effective)?;
    let summary = summarize(&points);
    info!(
        inverter = inverter_id,
        pmax_w = summary.pmax_w,
        fill_factor = summary.fill_factor,
        "IV test completed"
    );

    Ok(IvCurve {
        inverter_id: inverter_id.to_string(),
        parameters: params.clone(),
        points,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plant::Inverter;

    #[test]
    fn curve_endpoints() {
        assert_eq!(diode_current(0.0, 9.2, 1000.0, 1.3, 25.0), 9.2);
        assert_eq!(diode_current(1000.0, 9.2, 1000.0, 1.3, 25.0), 0.0);
        assert_eq!(diode_current(-5.0, 9.2, 1000.0, 1.3, 25.0), 9.2);
    }

    #[test]
    fn current_decreases_with_voltage() {
        let pts = trace(&IvTestParameters::default()).expect("default parameters are valid");
        assert_eq!(pts.len(), 101);
        assert!(pts.windows(2).all(|w| w[1].current_a <= w[0].current_a));
    }

    #[test]
    fn default_curve_has_realistic_fill_factor() {
        let pts = trace(&IvTestParameters::default()).expect("default parameters are valid");
        let s = summarize(&pts);
        assert!((0.6..0.9).contains(&s.fill_factor), "ff = {}", s.fill_factor);
        assert!(s.vmp_v > 500.0 && s.vmp_v < 1000.0);
        assert!((s.pmax_w - s.vmp_v * s.imp_a).abs() < 1e-9);
    }

    #[test]
    fn heat_lowers_fill_factor() {
        let cool = trace(&IvTestParameters::default()).expect("default parameters are valid");
        let hot = trace(&IvTestParameters {
            temperature_c: 65.0,
            ..IvTestParameters::default()
        })
        .expect("hot parameters are valid");
        assert!(summarize(&hot).fill_factor < summarize(&cool).fill_factor);
    }

    #[test]
    fn invalid_parameters_rejected() {
        let bad = IvTestParameters {
            points: 1,
            ..IvTestParameters::default()
        };
        assert!(trace(&bad).is_err());
        let bad = IvTestParameters {
            voc_v: 0.0,
            ..IvTestParameters::default()
        };
        assert!(trace(&bad).is_err());
    }

    #[test]
    fn only_online_inverters_are_tested() {
        let invs = vec![
            Inverter::new("inv1", "Inverter 01", 30.0, vec![]).expect("valid inverter"),
            Inverter::new("inv4", "Inverter 04", 30.0, vec![])
                .expect("valid inverter")
                .with_online(false),
        ];
        let plant = Plant::new("p", invs).expect("unique ids");
        let params = IvTestParameters::default();

        let curve = run_iv_test(&plant, "inv1", &params).expect("inv1 is online");
        assert!((9.2 * 0.95..=9.2).contains(&curve.summary.isc_a));
        assert_eq!(Ok(curve), run_iv_test(&plant, "inv1", &params));
        assert!(matches!(
            run_iv_test(&plant, "inv4", &params),
            Err(ModelError::EquipmentOffline(_))
        ));
        assert!(matches!(
            run_iv_test(&plant, "inv9", &params),
            Err(ModelError::UnknownEquipment(_))
        ));
    }
}
