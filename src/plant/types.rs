//! Plant topology: plant → inverters → strings.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::ModelError;
use crate::sim::classify::gauge_percent;
use crate::sim::types::{EquipmentKind, EquipmentProfile};

/// Series-connected module string feeding one inverter DC input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PvString {
    pub id: String,
    /// DC voltage (V).
    pub voltage_v: f64,
    /// DC current (A).
    pub current_a: f64,
}

impl PvString {
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] for an empty id or negative or
    /// non-finite readings.
    pub fn new(id: impl Into<String>, voltage_v: f64, current_a: f64) -> Result<Self, ModelError> {
        let id = id.into();
        require_id(&id, "string")?;
        require_non_negative(&id, "voltage", voltage_v)?;
        require_non_negative(&id, "current", current_a)?;
        Ok(Self {
            id,
            voltage_v,
            current_a,
        })
    }

    /// DC power in kW.
    pub fn power_kw(&self) -> f64 {
        self.voltage_v * self.current_a / 1000.0
    }
}

/// Inverter with its live telemetry and owned strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inverter {
    pub id: String,
    pub name: String,
    pub online: bool,
    /// Nameplate AC capacity (kW).
    pub rated_kw: f64,
    pub power_kw: f64,
    pub voltage_v: f64,
    pub current_a: f64,
    pub temperature_c: f64,
    pub strings: Vec<PvString>,
}

impl Inverter {
    /// Creates an inverter with zeroed live telemetry.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] for an empty id, a rated capacity
    /// that is not strictly positive, or duplicate string ids.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        rated_kw: f64,
        strings: Vec<PvString>,
    ) -> Result<Self, ModelError> {
        let id = id.into();
        require_id(&id, "inverter")?;
        if !rated_kw.is_finite() || rated_kw <= 0.0 {
            return Err(ModelError::invalid(format!(
                "inverter {id}: rated capacity must be > 0, got {rated_kw}"
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = strings.iter().find(|s| !seen.insert(s.id.as_str())) {
            return Err(ModelError::invalid(format!(
                "inverter {id}: duplicate string id {}",
                dup.id
            )));
        }
        Ok(Self {
            id,
            name: name.into(),
            online: true,
            rated_kw,
            power_kw: 0.0,
            voltage_v: 0.0,
            current_a: 0.0,
            temperature_c: 0.0,
            strings,
        })
    }

    /// Sets the initial live telemetry.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] if power exceeds the rated
    /// capacity or any value is negative or non-finite.
    pub fn with_telemetry(
        mut self,
        power_kw: f64,
        voltage_v: f64,
        current_a: f64,
        temperature_c: f64,
    ) -> Result<Self, ModelError> {
        require_non_negative(&self.id, "power", power_kw)?;
        require_non_negative(&self.id, "voltage", voltage_v)?;
        require_non_negative(&self.id, "current", current_a)?;
        if !temperature_c.is_finite() {
            return Err(ModelError::invalid(format!(
                "{}: temperature must be finite",
                self.id
            )));
        }
        if power_kw > self.rated_kw {
            return Err(ModelError::invalid(format!(
                "{}: power {power_kw} kW exceeds rated {} kW",
                self.id, self.rated_kw
            )));
        }
        self.power_kw = power_kw;
        self.voltage_v = voltage_v;
        self.current_a = current_a;
        self.temperature_c = temperature_c;
        Ok(self)
    }

    pub fn with_online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    /// Generator profile of this inverter.
    pub fn profile(&self) -> EquipmentProfile {
        EquipmentProfile::new(&self.id, EquipmentKind::Inverter, self.rated_kw)
    }

    /// Rated share of one string: the inverter rating split evenly.
    pub fn string_rated_kw(&self) -> f64 {
        if self.strings.is_empty() {
            0.0
        } else {
            self.rated_kw / self.strings.len() as f64
        }
    }

    /// Generator profile of one of this inverter's strings.
    pub fn string_profile(&self, string: &PvString) -> EquipmentProfile {
        EquipmentProfile::new(&string.id, EquipmentKind::String, self.string_rated_kw())
    }

    /// Output as a gauge percentage of rated capacity, within `[0, 100]`.
    pub fn load_percent(&self) -> f64 {
        gauge_percent(self.power_kw, self.rated_kw)
    }
}

/// Root aggregate owning the ordered inverter list.
///
/// Inverter ids and string ids are each unique across the plant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plant {
    pub name: String,
    inverters: Vec<Inverter>,
}

impl Plant {
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] for duplicate inverter or string
    /// ids.
    pub fn new(name: impl Into<String>, inverters: Vec<Inverter>) -> Result<Self, ModelError> {
        let mut inverter_ids = HashSet::new();
        let mut string_ids = HashSet::new();
        for inv in &inverters {
            if !inverter_ids.insert(inv.id.as_str()) {
                return Err(ModelError::invalid(format!(
                    "duplicate inverter id {}",
                    inv.id
                )));
            }
            for s in &inv.strings {
                if !string_ids.insert(s.id.as_str()) {
                    return Err(ModelError::invalid(format!("duplicate string id {}", s.id)));
                }
            }
        }
        Ok(Self {
            name: name.into(),
            inverters,
        })
    }

    pub fn inverters(&self) -> &[Inverter] {
        &self.inverters
    }

    /// # Errors
    ///
    /// Returns [`ModelError::UnknownEquipment`] if no inverter has this id.
    pub fn inverter(&self, id: &str) -> Result<&Inverter, ModelError> {
        self.inverters
            .iter()
            .find(|inv| inv.id == id)
            .ok_or_else(|| ModelError::UnknownEquipment(id.to_string()))
    }

    /// Finds a string and its owning inverter.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownEquipment`] if no string has this id.
    pub fn string(&self, id: &str) -> Result<(&Inverter, &PvString), ModelError> {
        self.inverters
            .iter()
            .find_map(|inv| inv.strings.iter().find(|s| s.id == id).map(|s| (inv, s)))
            .ok_or_else(|| ModelError::UnknownEquipment(id.to_string()))
    }

    pub fn online_count(&self) -> usize {
        self.inverters.iter().filter(|inv| inv.online).count()
    }

    pub fn rated_kw(&self) -> f64 {
        self.inverters.iter().map(|inv| inv.rated_kw).sum()
    }

    /// Sum of current output of online inverters (kW).
    pub fn power_kw(&self) -> f64 {
        self.inverters
            .iter()
            .filter(|inv| inv.online)
            .map(|inv| inv.power_kw)
            .sum()
    }

    /// New plant value with the same topology and replaced telemetry.
    ///
    /// Callers only rewrite telemetry fields, never ids or string lists.
    pub(crate) fn with_telemetry(&self, inverters: Vec<Inverter>) -> Self {
        Self {
            name: self.name.clone(),
            inverters,
        }
    }
}

fn require_id(id: &str, what: &str) -> Result<(), ModelError> {
    if id.trim().is_empty() {
        Err(ModelError::invalid(format!("{what} id must not be empty")))
    } else {
        Ok(())
    }
}

fn require_non_negative(id: &str, what: &str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ModelError::invalid(format!(
            "{id}: {what} must be finite and >= 0, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(prefix: &str) -> Vec<PvString> {
        ["A", "B"]
            .iter()
            .map(|s| PvString::new(format!("{prefix}-{s}"), 595.0, 14.5).expect("valid string"))
            .collect()
    }

    fn inverter(id: &str, prefix: &str) -> Inverter {
        Inverter::new(id, id.to_uppercase(), 30.0, strings(prefix)).expect("valid inverter")
    }

    #[test]
    fn rejects_bad_inverter_fields() {
        assert!(Inverter::new("", "x", 30.0, vec![]).is_err());
        assert!(Inverter::new("inv1", "x", 0.0, vec![]).is_err());
        assert!(Inverter::new("inv1", "x", f64::INFINITY, vec![]).is_err());
        let over = Inverter::new("inv1", "x", 30.0, vec![])
            .and_then(|i| i.with_telemetry(31.0, 380.0, 1.0, 40.0));
        assert!(over.is_err());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let invs = vec![inverter("inv1", "ST1"), inverter("inv1", "ST2")];
        assert!(Plant::new("p", invs).is_err());

        let invs = vec![inverter("inv1", "ST1"), inverter("inv2", "ST1")];
        assert!(Plant::new("p", invs).is_err());
    }

    #[test]
    fn looks_up_strings_with_owner() {
        let invs = vec![inverter("inv1", "ST1"), inverter("inv2", "ST2")];
        let plant = Plant::new("p", invs).expect("unique ids");
        let (owner, _) = plant.string("ST2-B").expect("string exists");
        assert_eq!(owner.id, "inv2");
        assert!(matches!(
            plant.inverter("inv9"),
            Err(ModelError::UnknownEquipment(_))
        ));
    }

    #[test]
    fn string_share_splits_rating() {
        assert_eq!(inverter("inv1", "ST1").string_rated_kw(), 15.0);
    }

    #[test]
    fn load_percent_is_a_gauge_of_rating() {
        let inv = inverter("inv1", "ST1")
            .with_telemetry(22.5, 380.0, 59.2, 40.0)
            .expect("within rating");
        assert_eq!(inv.load_percent(), 75.0);

        let idle = inverter("inv2", "ST2").with_online(false);
        assert_eq!(idle.load_percent(), 0.0);
    }
}
