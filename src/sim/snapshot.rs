//! Initial-state query consumed by reporting front ends.

use serde::Serialize;

use super::types::GridId;

/// Summary of one microgrid's size, computed on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSnapshot {
    pub id: GridId,
    pub house_count: usize,
    /// Mean current hourly demand per house (kWh).
    pub average_consumption: f64,
    /// Installed solar capacity (kW).
    pub solar_capacity: f64,
    /// Current battery capacity (kWh).
    pub battery_capacity: f64,
}
