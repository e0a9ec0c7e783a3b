//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use std::path::PathBuf;

use minigrid_sim::devices::House;
use minigrid_sim::sim::microgrid::{Microgrid, MicrogridSpec};
use minigrid_sim::sim::types::{GridId, HouseId};
use minigrid_sim::sim::UtilityMarket;
use rand::{SeedableRng, rngs::StdRng};

/// Absolute tolerance for energy and money comparisons.
pub const EPS: f64 = 1e-6;

pub fn assert_close(actual: f64, expected: f64, what: &str) {
    assert!(
        (actual - expected).abs() < EPS,
        "{what}: expected {expected}, got {actual}"
    );
}

/// Utility at the default prices (buys at 0.03, sells at 0.06).
pub fn utility() -> UtilityMarket {
    UtilityMarket::new(0.03, 0.06).expect("default prices are valid")
}

/// House with a flat profile of 1.0.
pub fn flat_house(grid: u32, id: u32, base_demand_kwh: f64) -> House {
    House::new(HouseId(id), GridId(grid), base_demand_kwh, &[1.0; 24]).expect("valid house")
}

/// Spec with explicit capacities, an empty battery, and a random yield band.
pub fn sized_spec(id: u32, solar_kw: f64, battery_kwh: f64) -> MicrogridSpec {
    let mut spec = MicrogridSpec::new(GridId(id));
    spec.solar_capacity_kw = Some(solar_kw);
    spec.battery_capacity_kwh = Some(battery_kwh);
    spec.initial_battery_kwh = Some(0.0);
    spec
}

/// Like [`sized_spec`] but the array always yields its full capacity.
pub fn exact_spec(id: u32, solar_kw: f64, battery_kwh: f64) -> MicrogridSpec {
    let mut spec = sized_spec(id, solar_kw, battery_kwh);
    spec.yield_min = 1.0;
    spec.yield_max = 1.0;
    spec
}

pub fn build_grid(spec: MicrogridSpec, houses: Vec<House>) -> Microgrid {
    Microgrid::new(spec, houses, StdRng::seed_from_u64(42)).expect("valid microgrid")
}

/// Fresh per-test scratch directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("minigrid-sim-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}
