//! Plant topology and its live telemetry refresh.

pub mod refresh;
pub mod types;

pub use refresh::{RefreshConfig, TelemetryRefresher};
pub use types::{Inverter, Plant, PvString};
