//! Error taxonomy for the telemetry and performance model.

/// Errors returned by generator, aggregator, registry and test operations.
///
/// A zero expected value is not an error: it surfaces as
/// [`PerformanceRatio::NotApplicable`](crate::sim::kpi::PerformanceRatio).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Malformed time descriptor or out-of-domain parameter.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested metric has no generator rule for the equipment.
    #[error("unsupported metric: {0}")]
    UnsupportedMetric(String),

    /// No inverter or string with this identifier exists in the plant.
    #[error("unknown equipment: {0}")]
    UnknownEquipment(String),

    /// The operation requires the equipment to be online.
    #[error("equipment offline: {0}")]
    EquipmentOffline(String),

    /// No service order with this identifier exists in the registry.
    #[error("service order not found: {0}")]
    OrderNotFound(String),
}

impl ModelError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
