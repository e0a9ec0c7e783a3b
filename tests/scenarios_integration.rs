//! Small hand-checked topologies stepped through the federation.

mod common;

use common::{EPS, assert_close, build_grid, exact_spec, flat_house, sized_spec, utility};
use minigrid_sim::sim::Federation;
use minigrid_sim::sim::records::{EnergySource, PeerDirection, UtilityDirection};
use minigrid_sim::sim::types::{GridId, SimConfig};

fn single_grid(initial_battery_kwh: f64) -> Federation {
    let mut spec = sized_spec(1, 2.0, 5.0);
    spec.initial_battery_kwh = Some(initial_battery_kwh);
    let grid = build_grid(spec, vec![flat_house(1, 0, 1.0)]);
    Federation::new(SimConfig::new(1, 42), vec![grid], utility()).expect("valid federation")
}

#[test]
fn daylight_surplus_is_stored_without_trading() {
    let mut fed = single_grid(0.0);
    let record = fed.step(10).clone();

    assert!(
        (1.4..=1.9).contains(&record.total_generation),
        "generation {} outside yield band",
        record.total_generation
    );
    assert_close(record.total_demand, 1.0, "demand");

    let grid = &fed.grids()[0];
    assert_close(
        grid.battery().level_kwh(),
        record.total_generation - 1.0,
        "battery level",
    );
    let log = grid.grid_log().last().expect("grid record");
    assert!(log.internal_transactions.is_empty());
    assert!(log.external_transactions.is_empty());
    assert_eq!(fed.utility().purchased_kwh(), 0.0);
    assert_eq!(fed.utility().sold_kwh(), 0.0);
}

#[test]
fn night_deficit_drawn_from_battery() {
    let mut fed = single_grid(2.5);
    let record = fed.step(2).clone();

    assert_eq!(record.total_generation, 0.0);
    let grid = &fed.grids()[0];
    let house = &grid.houses()[0];
    assert_close(grid.battery().level_kwh(), 1.5, "battery level");
    assert_eq!(house.unmet_demand_kwh(), 0.0);
    assert_close(house.cost(), grid.sell_price(), "house cost");
    assert_eq!(house.energy_source(), Some(EnergySource::Battery));
    assert_eq!(fed.utility().sold_kwh(), 0.0);
}

#[test]
fn night_deficit_bought_from_utility_when_battery_empty() {
    let mut fed = single_grid(0.0);
    fed.step(2);

    let grid = &fed.grids()[0];
    let house = &grid.houses()[0];
    assert_eq!(house.unmet_demand_kwh(), 0.0);
    assert_close(house.cost(), grid.sell_price(), "house cost");
    assert_eq!(house.energy_source(), Some(EnergySource::Utility));
    assert_close(fed.utility().sold_kwh(), 1.0, "utility sold");

    let log = grid.grid_log().last().expect("grid record");
    assert_eq!(log.external_transactions.len(), 1);
    assert_eq!(log.external_transactions[0].direction, UtilityDirection::Buy);
    assert_close(log.external_transactions[0].price, 0.06, "purchase cost");
}

#[test]
fn peer_surplus_resolves_neighbour_deficit() {
    // A: 4 kWh generated, 1 kWh demand, full battery -> 3 kWh surplus.
    let mut a = exact_spec(1, 4.0, 1.0);
    a.initial_battery_kwh = Some(1.0);
    a.peers = vec![GridId(2)];
    // B: no generation, 2 kWh demand, empty battery, no reserve.
    let mut b = exact_spec(2, 0.0, 2.0);
    b.deficit_reserve_days = 0.0;
    b.peers = vec![GridId(1)];

    let grids = vec![
        build_grid(a, vec![flat_house(1, 0, 1.0)]),
        build_grid(b, vec![flat_house(2, 0, 2.0)]),
    ];
    let mut fed = Federation::new(SimConfig::new(1, 42), grids, utility()).expect("valid");
    let record = fed.step(12).clone();

    let grid_a = fed.grid(GridId(1)).expect("grid A");
    let grid_b = fed.grid(GridId(2)).expect("grid B");

    let a_log = grid_a.grid_log().last().expect("A record");
    assert_eq!(a_log.internal_transactions.len(), 1);
    assert_eq!(a_log.internal_transactions[0].peer, GridId(2));
    assert_eq!(a_log.internal_transactions[0].direction, PeerDirection::Supply);
    assert_close(a_log.internal_transactions[0].amount_kwh, 2.0, "peer transfer");
    assert_eq!(a_log.external_transactions.len(), 1);
    assert_eq!(a_log.external_transactions[0].direction, UtilityDirection::Sell);
    assert_close(a_log.external_transactions[0].amount_kwh, 1.0, "sold to utility");

    let b_log = grid_b.grid_log().last().expect("B record");
    assert!(b_log.internal_transactions.iter().any(|t| t.peer == GridId(1)
        && t.direction == PeerDirection::Receive
        && (t.amount_kwh - 2.0).abs() < EPS));
    assert!(b_log.external_transactions.is_empty());
    assert_eq!(grid_b.houses()[0].unmet_demand_kwh(), 0.0);

    assert_close(fed.utility().purchased_kwh(), 1.0, "utility purchased");
    assert_eq!(fed.utility().sold_kwh(), 0.0);
    assert_eq!(record.unmet_demand, 0.0);
    assert_eq!(record.netted_kwh, 0.0);
}

#[test]
fn peer_battery_covers_deficit_above_reserve() {
    // A has a stocked battery and no reserve; B is short at night.
    let mut a = exact_spec(1, 0.0, 10.0);
    a.initial_battery_kwh = Some(10.0);
    a.peer_reserve_days = 0.0;
    let mut b = exact_spec(2, 0.0, 0.0);
    b.peers = vec![GridId(1)];

    let grids = vec![
        build_grid(b, vec![flat_house(2, 0, 1.5), flat_house(2, 1, 0.5)]),
        build_grid(a, vec![flat_house(1, 0, 1.0)]),
    ];
    let mut fed = Federation::new(SimConfig::new(1, 42), grids, utility()).expect("valid");
    fed.step(0);

    let grid_b = fed.grid(GridId(2)).expect("grid B");
    for house in grid_b.houses() {
        assert_eq!(house.unmet_demand_kwh(), 0.0);
        assert_eq!(house.energy_source(), Some(EnergySource::Peer));
    }
    // 2 kWh to B, then 1 kWh for A's own house.
    assert_close(
        fed.grid(GridId(1)).expect("grid A").battery().level_kwh(),
        7.0,
        "A battery",
    );
    assert_eq!(fed.utility().sold_kwh(), 0.0);
}
