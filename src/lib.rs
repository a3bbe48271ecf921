//! Telemetry simulation and performance model for a photovoltaic plant
//! monitoring dashboard.

pub mod config;
pub mod error;
pub mod forecast;
pub mod io;
pub mod ivcurve;
pub mod logging;
pub mod monitor;
pub mod orders;
pub mod plant;
/// Generator, aggregation, classification and scheduling modules.
pub mod sim;
