//! TOML-based scenario configuration and preset definitions.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use rand::{SeedableRng, rngs::StdRng};
use serde::Deserialize;

use crate::devices::House;
use crate::devices::battery::DEFAULT_DEGRADATION_RATE;
use crate::devices::solar::{DEFAULT_YIELD_MAX, DEFAULT_YIELD_MIN};
use crate::devices::types::HOURS_PER_DAY;
use crate::error::{ConfigError, ValidationErrors};
use crate::sim::microgrid::{Microgrid, MicrogridSpec, PeakPricing};
use crate::sim::types::{GridId, HouseId, SettlementMode, SimConfig};
use crate::sim::{Federation, UtilityMarket};

/// Multiplier between a grid id and the offset of its generation seed.
const GRID_SEED_STRIDE: u64 = 7919;

/// Residential hourly demand multipliers: low overnight, peaking in the evening.
pub const RESIDENTIAL_PROFILE: [f64; HOURS_PER_DAY] = [
    1.2, 1.1, 1.0, 0.9, 0.8, 0.7, 0.6, 0.7, 0.8, 0.9, 1.0, 1.2, 1.4, 1.5, 1.6, 1.7, 1.8, 1.9, 1.8,
    1.7, 1.6, 1.5, 1.3, 1.2,
];

/// Top-level scenario configuration parsed from TOML.
///
/// Sections other than `grids` have defaults. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or start from a preset with
/// [`ScenarioConfig::from_preset`], then call
/// [`ScenarioConfig::build_federation`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run length, seed, and settlement behaviour.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Utility prices.
    #[serde(default)]
    pub utility: UtilityConfig,
    /// Demand profile shared by houses without their own.
    #[serde(default)]
    pub demand: DemandConfig,
    /// Microgrids in stepping order.
    #[serde(default)]
    pub grids: Vec<GridConfig>,
}

/// Run length, seed, and settlement behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of days to simulate (must be > 0).
    pub days: usize,
    /// Master random seed.
    pub seed: u64,
    /// `"report_only"` or `"retrade"`.
    pub settlement: SettlementMode,
    /// Degrade every battery after each simulated day.
    pub degrade_battery_daily: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            days: 7,
            seed: 42,
            settlement: SettlementMode::ReportOnly,
            degrade_battery_daily: false,
        }
    }
}

/// Utility prices per kWh.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UtilityConfig {
    /// Price the utility pays for surplus.
    pub buy_price: f64,
    /// Price the utility charges for energy.
    pub sell_price: f64,
}

impl Default for UtilityConfig {
    fn default() -> Self {
        Self {
            buy_price: 0.03,
            sell_price: 0.06,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemandConfig {
    /// 24 hourly multipliers.
    pub default_profile: Vec<f64>,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            default_profile: RESIDENTIAL_PROFILE.to_vec(),
        }
    }
}

/// One microgrid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Grid id; defaults to the 1-based declaration position.
    pub id: Option<u32>,
    pub avg_sunlight_hours: f64,
    pub sell_price: f64,
    pub backup_days: f64,
    pub safety_factor: f64,
    /// Peer ids in trading order; defaults to every other grid in declaration order.
    pub peers: Option<Vec<u32>>,
    pub deficit_reserve_days: f64,
    pub peer_reserve_days: f64,
    pub degradation_rate: f64,
    pub yield_min: f64,
    pub yield_max: f64,
    pub solar_capacity_kw: Option<f64>,
    pub battery_capacity_kwh: Option<f64>,
    pub initial_battery_kwh: Option<f64>,
    pub peak_pricing: Option<PeakPricingConfig>,
    pub houses: Vec<HouseConfig>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            id: None,
            avg_sunlight_hours: 6.0,
            sell_price: 0.05,
            backup_days: 1.0,
            safety_factor: 1.2,
            peers: None,
            deficit_reserve_days: 0.0,
            peer_reserve_days: 2.0,
            degradation_rate: DEFAULT_DEGRADATION_RATE,
            yield_min: DEFAULT_YIELD_MIN,
            yield_max: DEFAULT_YIELD_MAX,
            solar_capacity_kw: None,
            battery_capacity_kwh: None,
            initial_battery_kwh: None,
            peak_pricing: None,
            houses: Vec::new(),
        }
    }
}

/// Evening peak pricing window (hours of day, inclusive).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeakPricingConfig {
    pub start_hour: usize,
    pub end_hour: usize,
    pub multiplier: f64,
}

impl Default for PeakPricingConfig {
    fn default() -> Self {
        Self {
            start_hour: 18,
            end_hour: 22,
            multiplier: 1.1,
        }
    }
}

/// A group of identical houses.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HouseConfig {
    /// Base hourly demand (kWh) scaled by the profile.
    pub base_demand_kwh: f64,
    /// Number of houses in the group.
    pub count: usize,
    /// Own 24-hour profile; falls back to `demand.default_profile`.
    pub profile: Option<Vec<f64>>,
}

impl Default for HouseConfig {
    fn default() -> Self {
        Self {
            base_demand_kwh: 0.5,
            count: 1,
            profile: None,
        }
    }
}

impl HouseConfig {
    /// Houses whose base demand yields `daily_kwh` on a flat day.
    fn daily(count: usize, daily_kwh: f64) -> Self {
        Self {
            base_demand_kwh: daily_kwh / HOURS_PER_DAY as f64,
            count,
            profile: None,
        }
    }
}

impl GridConfig {
    fn sized(sunlight: f64, backup_days: f64, safety_factor: f64, houses: HouseConfig) -> Self {
        Self {
            avg_sunlight_hours: sunlight,
            backup_days,
            safety_factor,
            houses: vec![houses],
            ..Self::default()
        }
    }

    fn spec(&self, id: GridId, peers: Vec<GridId>) -> MicrogridSpec {
        MicrogridSpec {
            id,
            avg_sunlight_hours: self.avg_sunlight_hours,
            sell_price: self.sell_price,
            backup_days: self.backup_days,
            safety_factor: self.safety_factor,
            peers,
            deficit_reserve_days: self.deficit_reserve_days,
            peer_reserve_days: self.peer_reserve_days,
            degradation_rate: self.degradation_rate,
            yield_min: self.yield_min,
            yield_max: self.yield_max,
            solar_capacity_kw: self.solar_capacity_kw,
            battery_capacity_kwh: self.battery_capacity_kwh,
            initial_battery_kwh: self.initial_battery_kwh,
            peak_pricing: self.peak_pricing.as_ref().map(|p| PeakPricing {
                start_hour: p.start_hour,
                end_hour: p.end_hour,
                multiplier: p.multiplier,
            }),
        }
    }
}

impl ScenarioConfig {
    /// Three peered grids sized with generous backup.
    pub fn federation() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            utility: UtilityConfig::default(),
            demand: DemandConfig::default(),
            grids: vec![
                GridConfig::sized(8.0, 5.0, 1.5, HouseConfig::daily(5, 12.0)),
                GridConfig::sized(5.0, 5.0, 1.5, HouseConfig::daily(9, 10.0)),
                GridConfig::sized(6.0, 5.0, 1.5, HouseConfig::daily(2, 11.0)),
            ],
        }
    }

    /// One isolated grid with a single day of backup.
    pub fn single_grid() -> Self {
        Self {
            grids: vec![GridConfig::sized(6.0, 1.0, 1.2, HouseConfig::daily(4, 12.0))],
            ..Self::federation()
        }
    }

    /// Three grids with too little solar, forcing peer and utility trades.
    pub fn undersized() -> Self {
        Self {
            grids: vec![
                GridConfig::sized(8.0, 1.0, 0.6, HouseConfig::daily(5, 12.0)),
                GridConfig::sized(5.0, 1.0, 0.6, HouseConfig::daily(9, 10.0)),
                GridConfig::sized(6.0, 1.0, 0.6, HouseConfig::daily(2, 11.0)),
            ],
            ..Self::federation()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["federation", "single_grid", "undersized"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "federation" => Ok(Self::federation()),
            "single_grid" => Ok(Self::single_grid()),
            "undersized" => Ok(Self::undersized()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Resolved id of every grid, in declaration order.
    pub fn grid_ids(&self) -> Vec<GridId> {
        self.grids
            .iter()
            .enumerate()
            .map(|(i, g)| GridId(g.id.unwrap_or(i as u32 + 1)))
            .collect()
    }

    fn peers_of(&self, index: usize, ids: &[GridId]) -> Vec<GridId> {
        match &self.grids[index].peers {
            Some(peers) => peers.iter().map(|p| GridId(*p)).collect(),
            None => ids
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != index)
                .map(|(_, id)| *id)
                .collect(),
        }
    }

    fn houses_of(&self, grid: &GridConfig, id: GridId) -> Result<Vec<House>, ConfigError> {
        let mut houses = Vec::new();
        for (group, cfg) in grid.houses.iter().enumerate() {
            let profile = cfg
                .profile
                .as_deref()
                .unwrap_or(self.demand.default_profile.as_slice());
            for _ in 0..cfg.count {
                let house_id = HouseId(houses.len() as u32);
                let house = House::new(house_id, id, cfg.base_demand_kwh, profile)
                    .map_err(|e| e.within(&format!("houses[{group}]")))?;
                houses.push(house);
            }
        }
        Ok(houses)
    }

    /// Builds every grid, collecting one error per invalid grid.
    fn build_grids(&self) -> Result<Vec<Microgrid>, Vec<ConfigError>> {
        let ids = self.grid_ids();
        let mut grids = Vec::with_capacity(self.grids.len());
        let mut errors = Vec::new();

        for (index, grid) in self.grids.iter().enumerate() {
            let id = ids[index];
            let seed = self
                .simulation
                .seed
                .wrapping_add(u64::from(id.0).wrapping_mul(GRID_SEED_STRIDE));
            let built = self.houses_of(grid, id).and_then(|houses| {
                Microgrid::new(
                    grid.spec(id, self.peers_of(index, &ids)),
                    houses,
                    StdRng::seed_from_u64(seed),
                )
            });
            match built {
                Ok(g) => grids.push(g),
                Err(e) => errors.push(e.within(&format!("grids[{index}]"))),
            }
        }

        if errors.is_empty() { Ok(grids) } else { Err(errors) }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.simulation.days == 0 {
            errors.push(ConfigError::new("simulation.days", "must be > 0"));
        }
        if let Err(e) = UtilityMarket::new(self.utility.buy_price, self.utility.sell_price) {
            errors.push(e.within("utility"));
        }

        let profile = &self.demand.default_profile;
        if profile.len() != HOURS_PER_DAY {
            errors.push(ConfigError::new(
                "demand.default_profile",
                format!("must contain {HOURS_PER_DAY} hourly values, got {}", profile.len()),
            ));
        } else if profile.iter().any(|v| !v.is_finite() || *v < 0.0) {
            errors.push(ConfigError::new(
                "demand.default_profile",
                "values must be finite and >= 0",
            ));
        }

        if self.grids.is_empty() {
            errors.push(ConfigError::new("grids", "must contain at least one grid"));
            return errors;
        }

        let ids = self.grid_ids();
        let mut seen = HashSet::new();
        for (index, id) in ids.iter().enumerate() {
            if !seen.insert(*id) {
                errors.push(ConfigError::new(
                    format!("grids[{index}].id"),
                    format!("duplicate grid id {id}"),
                ));
            }
        }
        for (index, grid) in self.grids.iter().enumerate() {
            for peer in grid.peers.iter().flatten() {
                if !seen.contains(&GridId(*peer)) {
                    errors.push(ConfigError::new(
                        format!("grids[{index}].peers"),
                        format!("unknown peer {peer}"),
                    ));
                }
            }
            for (group, house) in grid.houses.iter().enumerate() {
                if house.count == 0 {
                    errors.push(ConfigError::new(
                        format!("grids[{index}].houses[{group}].count"),
                        "must be > 0",
                    ));
                }
            }
        }

        // Grid-level checks only make sense once the shared profile is usable.
        if errors.iter().all(|e| e.field != "demand.default_profile") {
            if let Err(grid_errors) = self.build_grids() {
                errors.extend(grid_errors);
            }
        }

        errors
    }

    /// Simulation settings for this scenario.
    ///
    /// # Panics
    ///
    /// Panics if `simulation.days` is zero; call [`ScenarioConfig::validate`] first.
    pub fn sim_config(&self) -> SimConfig {
        let mut cfg = SimConfig::new(self.simulation.days, self.simulation.seed);
        cfg.settlement = self.simulation.settlement;
        cfg.degrade_battery_daily = self.simulation.degrade_battery_daily;
        cfg
    }

    /// Validates the scenario and builds the full federation.
    ///
    /// # Errors
    ///
    /// Returns every violation found by [`ScenarioConfig::validate`]; no
    /// partial topology is ever returned.
    pub fn build_federation(&self) -> Result<Federation, ValidationErrors> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }

        let utility = UtilityMarket::new(self.utility.buy_price, self.utility.sell_price)
            .map_err(|e| e.within("utility"))?;
        let grids = self.build_grids().map_err(ValidationErrors)?;
        Ok(Federation::new(self.sim_config(), grids, utility)?)
    }
}
