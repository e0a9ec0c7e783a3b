//! Core simulation types: configuration, identifiers, and hourly results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::devices::types::HOURS_PER_DAY;

/// Identifier of a microgrid, unique within a federation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridId(pub u32);

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a house, unique within its microgrid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HouseId(pub u32);

impl fmt::Display for HouseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the federation treats aggregate excess and shortage after netting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementMode {
    /// Net and record only. Every grid has already settled with the utility.
    #[default]
    ReportOnly,
    /// Trade the post-netting residual with the utility a second time.
    Retrade,
}

/// Centralized simulation configuration.
///
/// # Examples
///
/// ```
/// use minigrid_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(2, 42);
/// assert_eq!(cfg.total_hours(), 48);
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of days to simulate.
    pub days: usize,
    /// Master random seed for reproducibility.
    pub seed: u64,
    /// Federation-level settlement behaviour.
    pub settlement: SettlementMode,
    /// Degrade every battery once at the end of each simulated day.
    pub degrade_battery_daily: bool,
}

impl SimConfig {
    /// Creates a new configuration with report-only settlement and no degradation.
    ///
    /// # Panics
    ///
    /// Panics if `days` is zero.
    pub fn new(days: usize, seed: u64) -> Self {
        assert!(days > 0, "days must be > 0");
        Self {
            days,
            seed,
            settlement: SettlementMode::default(),
            degrade_battery_daily: false,
        }
    }

    /// Total number of simulated hours across all days.
    pub fn total_hours(&self) -> usize {
        self.days * HOURS_PER_DAY
    }
}

/// Energy a microgrid settled with the utility during one hour.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HourlyBalance {
    /// Surplus sold to the utility (kWh).
    pub excess_kwh: f64,
    /// Deficit bought from the utility (kWh).
    pub shortage_kwh: f64,
}
