//! Federation orchestrator: steps every microgrid hour by hour.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::devices::types::HOURS_PER_DAY;
use crate::error::ConfigError;
use crate::sim::clock::{self, Clock};
use crate::sim::microgrid::Microgrid;
use crate::sim::peers::PeerSet;
use crate::sim::records::{EventLog, FederationRecord};
use crate::sim::snapshot::GridSnapshot;
use crate::sim::types::{GridId, HourlyBalance, SettlementMode, SimConfig};
use crate::sim::utility::UtilityMarket;

/// A set of peer-trading microgrids sharing one utility.
///
/// The federation owns every grid and the utility. Within an hour, grids
/// step one at a time in registry order; each grid sees the others through a
/// [`PeerSet`], so peer trades resolve sequentially against shared battery
/// state. Once all grids have stepped, the federation nets aggregate excess
/// against aggregate shortage, flushes every grid, and appends one
/// [`FederationRecord`].
#[derive(Debug)]
pub struct Federation {
    config: SimConfig,
    grids: Vec<Microgrid>,
    utility: UtilityMarket,
    next_hour: usize,
    unmet_demand_kwh: f64,
    grid_transactions_kwh: f64,
    netted_kwh: f64,
    unallocated_kwh: f64,
    log: EventLog<FederationRecord>,
}

impl Federation {
    /// Creates a federation from fully built grids.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `grids` is empty, two grids share an id,
    /// or a grid names a peer that is not in the federation.
    pub fn new(
        config: SimConfig,
        grids: Vec<Microgrid>,
        utility: UtilityMarket,
    ) -> Result<Self, ConfigError> {
        if grids.is_empty() {
            return Err(ConfigError::new("grids", "must contain at least one grid"));
        }

        let mut ids = HashSet::new();
        for grid in &grids {
            if !ids.insert(grid.id()) {
                return Err(ConfigError::new(
                    "grids",
                    format!("duplicate grid id {}", grid.id()),
                ));
            }
        }
        for (index, grid) in grids.iter().enumerate() {
            if let Some(peer) = grid.peers().iter().find(|p| !ids.contains(p)) {
                return Err(ConfigError::new(
                    format!("grids[{index}].peers"),
                    format!("unknown peer {peer}"),
                ));
            }
        }

        Ok(Self {
            config,
            grids,
            utility,
            next_hour: 0,
            unmet_demand_kwh: 0.0,
            grid_transactions_kwh: 0.0,
            netted_kwh: 0.0,
            unallocated_kwh: 0.0,
            log: EventLog::new(),
        })
    }

    /// Advances every grid through `hour`.
    ///
    /// # Returns
    ///
    /// The federation record appended for this hour.
    ///
    /// # Panics
    ///
    /// Panics if `hour` is earlier than an hour already stepped.
    pub fn step(&mut self, hour: usize) -> &FederationRecord {
        assert!(
            hour >= self.next_hour,
            "hour {hour} already simulated (next is {})",
            self.next_hour
        );
        self.next_hour = hour + 1;

        let mut total = HourlyBalance::default();
        for index in 0..self.grids.len() {
            if let Some((grid, mut peers)) = PeerSet::split(&mut self.grids, index) {
                let balance = grid.step(hour, &mut peers, &mut self.utility);
                total.excess_kwh += balance.excess_kwh;
                total.shortage_kwh += balance.shortage_kwh;
            }
        }

        let netted = total.excess_kwh.min(total.shortage_kwh);
        let residual_excess = total.excess_kwh - netted;
        let residual_shortage = total.shortage_kwh - netted;
        self.netted_kwh += netted;
        if self.config.settlement == SettlementMode::Retrade {
            if residual_excess > 0.0 {
                self.utility.buy_energy(residual_excess);
            }
            if residual_shortage > 0.0 {
                self.utility.sell_energy(residual_shortage);
            }
        }
        self.grid_transactions_kwh += residual_excess - residual_shortage;
        debug!(hour, netted, residual_excess, residual_shortage, "federation netting");

        let mut total_generation = 0.0;
        let mut total_demand = 0.0;
        let mut expenditure = 0.0;
        let mut revenue = 0.0;
        for grid in &mut self.grids {
            total_generation += grid.generation_kwh();
            total_demand += grid.demand_kwh();
            self.unallocated_kwh += grid.pending_unallocated_kwh();
            self.unmet_demand_kwh += grid.houses().iter().map(|h| h.unmet_demand_kwh()).sum::<f64>();
            expenditure += grid.houses().iter().map(|h| h.cost()).sum::<f64>();
            revenue += grid.revenue();
            grid.flush(hour);
        }

        if self.config.degrade_battery_daily && clock::is_end_of_day(hour) {
            for grid in &mut self.grids {
                grid.degrade_battery();
            }
            debug!(day = clock::day_of(hour), "batteries degraded");
        }

        self.log.push(FederationRecord {
            simulation_hour: hour,
            total_generation,
            total_demand,
            unmet_demand: self.unmet_demand_kwh,
            total_grid_transactions: self.grid_transactions_kwh,
            total_client_expenditure: expenditure,
            revenue,
            netted_kwh: self.netted_kwh,
            unallocated_kwh: self.unallocated_kwh,
        });
        &self.log.records()[self.log.len() - 1]
    }

    /// Steps every hour of the next `days` days in increasing order.
    pub fn simulate_days(&mut self, days: usize) {
        let mut hours = Clock::for_days(self.next_hour, days);
        hours.run(|hour| {
            if hour % HOURS_PER_DAY == 0 {
                info!(day = clock::day_of(hour), "simulating day");
            }
            self.step(hour);
        });
    }

    /// Runs the configured number of days.
    pub fn run(&mut self) {
        info!(
            grids = self.grids.len(),
            days = self.config.days,
            seed = self.config.seed,
            "simulation started"
        );
        self.simulate_days(self.config.days);
        info!(
            hours = self.log.len(),
            unmet_kwh = self.unmet_demand_kwh,
            "simulation finished"
        );
    }

    /// Federation records appended since the previous drain.
    pub fn drain_records(&mut self) -> &[FederationRecord] {
        self.log.drain_new()
    }

    /// Initial-state summary of every grid, in registry order.
    pub fn initial_state(&self) -> Vec<GridSnapshot> {
        self.grids.iter().map(Microgrid::snapshot).collect()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grids(&self) -> &[Microgrid] {
        &self.grids
    }

    /// Looks up a grid by id.
    pub fn grid(&self, id: GridId) -> Option<&Microgrid> {
        self.grids.iter().find(|g| g.id() == id)
    }

    pub fn utility(&self) -> &UtilityMarket {
        &self.utility
    }

    pub fn log(&self) -> &EventLog<FederationRecord> {
        &self.log
    }

    /// Next hour [`Federation::step`] accepts.
    pub fn next_hour(&self) -> usize {
        self.next_hour
    }
}
