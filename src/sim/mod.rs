/// Bucket aggregation over scopes and periods.
pub mod aggregate;
/// Threshold classification.
pub mod classify;
/// Deterministic telemetry generator.
pub mod generator;
pub mod kpi;
/// Repeating refresh tasks.
pub mod schedule;
pub mod seed;
pub mod time;
pub mod types;
