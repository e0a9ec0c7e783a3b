//! A solar-plus-battery microgrid serving a set of houses.

use std::mem;

use rand::rngs::StdRng;
use tracing::{debug, trace, warn};

use crate::devices::solar::{DEFAULT_YIELD_MAX, DEFAULT_YIELD_MIN};
use crate::devices::types::{ENERGY_EPSILON, HOURS_PER_DAY, SupplyChannel};
use crate::devices::{Battery, House, SolarPv};
use crate::devices::battery::DEFAULT_DEGRADATION_RATE;
use crate::error::ConfigError;
use crate::sim::peers::PeerExchange;
use crate::sim::records::{
    EnergyFlows, EnergySource, EventLog, ExternalTransaction, GridRecord, HouseRecord,
    InternalTransaction, PeerDirection, UtilityDirection,
};
use crate::sim::snapshot::GridSnapshot;
use crate::sim::types::{GridId, HourlyBalance};
use crate::sim::utility::UtilityMarket;

/// Selling-price multiplier applied over an hour-of-day window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakPricing {
    /// First peak hour of day (inclusive).
    pub start_hour: usize,
    /// Last peak hour of day (inclusive).
    pub end_hour: usize,
    pub multiplier: f64,
}

impl PeakPricing {
    /// Validates the window and multiplier.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` unless `start_hour <= end_hour < 24` and the
    /// multiplier is a positive finite number.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_hour > self.end_hour || self.end_hour >= HOURS_PER_DAY {
            return Err(ConfigError::new(
                "peak_pricing.end_hour",
                format!(
                    "window must satisfy start_hour <= end_hour < {HOURS_PER_DAY}, got [{}, {}]",
                    self.start_hour, self.end_hour
                ),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier <= 0.0 {
            return Err(ConfigError::new(
                "peak_pricing.multiplier",
                format!("must be > 0, got {}", self.multiplier),
            ));
        }
        Ok(())
    }

    /// Returns `true` if `hour_of_day` falls inside the window.
    pub fn covers(&self, hour_of_day: usize) -> bool {
        (self.start_hour..=self.end_hour).contains(&hour_of_day)
    }
}

/// Construction parameters for a [`Microgrid`].
///
/// Capacity overrides bypass the sizing rules; everything else is validated
/// by [`Microgrid::new`].
#[derive(Debug, Clone)]
pub struct MicrogridSpec {
    pub id: GridId,
    /// Average daily sunlight used to size the solar array, in `(0, 24]`.
    pub avg_sunlight_hours: f64,
    /// Base selling price per kWh charged to houses.
    pub sell_price: f64,
    /// Days of demand the battery is sized to hold.
    pub backup_days: f64,
    /// Multiplier on the daily requirement when sizing solar.
    pub safety_factor: f64,
    /// Peers in trading order.
    pub peers: Vec<GridId>,
    /// Days of demand kept in the battery when covering the grid's own deficit.
    pub deficit_reserve_days: f64,
    /// Days of demand kept in the battery when serving peers.
    pub peer_reserve_days: f64,
    pub degradation_rate: f64,
    pub yield_min: f64,
    pub yield_max: f64,
    pub solar_capacity_kw: Option<f64>,
    pub battery_capacity_kwh: Option<f64>,
    pub initial_battery_kwh: Option<f64>,
    pub peak_pricing: Option<PeakPricing>,
}

impl MicrogridSpec {
    /// Creates a spec with default sizing and pricing parameters and no peers.
    pub fn new(id: GridId) -> Self {
        Self {
            id,
            avg_sunlight_hours: 6.0,
            sell_price: 0.05,
            backup_days: 1.0,
            safety_factor: 1.2,
            peers: Vec::new(),
            deficit_reserve_days: 0.0,
            peer_reserve_days: 2.0,
            degradation_rate: DEFAULT_DEGRADATION_RATE,
            yield_min: DEFAULT_YIELD_MIN,
            yield_max: DEFAULT_YIELD_MAX,
            solar_capacity_kw: None,
            battery_capacity_kwh: None,
            initial_battery_kwh: None,
            peak_pricing: None,
        }
    }

    fn validate(&self, houses: &[House]) -> Result<(), ConfigError> {
        if !(self.avg_sunlight_hours > 0.0 && self.avg_sunlight_hours <= 24.0) {
            return Err(ConfigError::new(
                "avg_sunlight_hours",
                format!("must be in (0, 24], got {}", self.avg_sunlight_hours),
            ));
        }
        positive("sell_price", self.sell_price)?;
        positive("backup_days", self.backup_days)?;
        positive("safety_factor", self.safety_factor)?;
        non_negative("deficit_reserve_days", Some(self.deficit_reserve_days))?;
        non_negative("peer_reserve_days", Some(self.peer_reserve_days))?;
        non_negative("solar_capacity_kw", self.solar_capacity_kw)?;
        non_negative("battery_capacity_kwh", self.battery_capacity_kwh)?;
        non_negative("initial_battery_kwh", self.initial_battery_kwh)?;

        if self.peers.contains(&self.id) {
            return Err(ConfigError::new("peers", "must not include the grid itself"));
        }
        if let Some(dup) = self
            .peers
            .iter()
            .enumerate()
            .find_map(|(i, p)| self.peers[..i].contains(p).then_some(*p))
        {
            return Err(ConfigError::new("peers", format!("duplicate peer {dup}")));
        }
        if let Some(house) = houses.iter().find(|h| h.grid() != self.id) {
            return Err(ConfigError::new(
                "houses",
                format!("house {} belongs to grid {}", house.id(), house.grid()),
            ));
        }
        if let Some(peak) = &self.peak_pricing {
            peak.validate()?;
        }
        Ok(())
    }
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::new(field, format!("must be > 0, got {value}")))
    }
}

fn non_negative(field: &str, value: Option<f64>) -> Result<(), ConfigError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(ConfigError::new(
            field,
            format!("must be a finite value >= 0, got {v}"),
        )),
        _ => Ok(()),
    }
}

/// The houses' view of this hour's generation: nothing else is reachable.
struct GenerationPool<'a> {
    available_kwh: &'a mut f64,
    served_kwh: f64,
}

impl SupplyChannel for GenerationPool<'_> {
    fn supply(&mut self, requested_kwh: f64) -> f64 {
        let given = requested_kwh.max(0.0).min(self.available_kwh.max(0.0));
        *self.available_kwh -= given;
        self.served_kwh += given;
        given
    }
}

/// A microgrid with one solar array, one battery, and its houses.
///
/// Each hour the grid serves its houses from generation, then settles the
/// balance: surplus goes to the battery, then peers, then the utility;
/// deficit comes from the battery, then peers, then the utility, and is
/// redistributed to the houses that are still short.
///
/// Peers are referenced by id. Every trade happens through a
/// [`PeerExchange`] handed in by the caller, so a grid never owns another.
#[derive(Debug, Clone)]
pub struct Microgrid {
    id: GridId,
    houses: Vec<House>,
    solar: SolarPv,
    battery: Battery,
    peers: Vec<GridId>,
    sell_price: f64,
    peak_pricing: Option<PeakPricing>,
    avg_sunlight_hours: f64,
    daily_requirement_kwh: f64,
    deficit_reserve_kwh: f64,
    peer_reserve_kwh: f64,

    available_generation_kwh: f64,
    generation_kwh: f64,
    demand_kwh: f64,
    revenue: f64,
    unallocated_kwh: f64,
    flows: EnergyFlows,
    internal_transactions: Vec<InternalTransaction>,
    external_transactions: Vec<ExternalTransaction>,

    grid_log: EventLog<GridRecord>,
    house_log: EventLog<HouseRecord>,
}

impl Microgrid {
    /// Builds and sizes a microgrid.
    ///
    /// # Arguments
    ///
    /// * `spec` - Sizing, pricing, and peer parameters
    /// * `houses` - Houses owned by this grid, in service order
    /// * `rng` - Generator driving the solar yield
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if sunlight hours are outside `(0, 24]`, the
    /// price, backup days, or safety factor are not positive, an override or
    /// reserve is negative, the peer list names the grid itself, or a house
    /// belongs to another grid.
    pub fn new(spec: MicrogridSpec, houses: Vec<House>, rng: StdRng) -> Result<Self, ConfigError> {
        spec.validate(&houses)?;

        let daily_requirement_kwh: f64 = houses.iter().map(House::daily_energy_kwh).sum();
        let solar_capacity = spec
            .solar_capacity_kw
            .unwrap_or(daily_requirement_kwh * spec.safety_factor / spec.avg_sunlight_hours);
        let battery_capacity = spec
            .battery_capacity_kwh
            .unwrap_or(daily_requirement_kwh * spec.backup_days);
        let initial_level = spec
            .initial_battery_kwh
            .unwrap_or(0.5 * daily_requirement_kwh);

        let solar =
            SolarPv::with_rng(solar_capacity, rng).with_yield_band(spec.yield_min, spec.yield_max)?;
        let battery = Battery::new(battery_capacity, initial_level, spec.degradation_rate)?;

        debug!(
            grid = %spec.id,
            houses = houses.len(),
            daily_requirement_kwh,
            solar_capacity,
            battery_capacity,
            "microgrid sized"
        );

        Ok(Self {
            id: spec.id,
            houses,
            solar,
            battery,
            peers: spec.peers,
            sell_price: spec.sell_price,
            peak_pricing: spec.peak_pricing,
            avg_sunlight_hours: spec.avg_sunlight_hours,
            daily_requirement_kwh,
            deficit_reserve_kwh: spec.deficit_reserve_days * daily_requirement_kwh,
            peer_reserve_kwh: spec.peer_reserve_days * daily_requirement_kwh,
            available_generation_kwh: 0.0,
            generation_kwh: 0.0,
            demand_kwh: 0.0,
            revenue: 0.0,
            unallocated_kwh: 0.0,
            flows: EnergyFlows::default(),
            internal_transactions: Vec::new(),
            external_transactions: Vec::new(),
            grid_log: EventLog::new(),
            house_log: EventLog::new(),
        })
    }

    /// Selling price for `hour`, including any peak multiplier.
    pub fn selling_price_at(&self, hour: usize) -> f64 {
        match &self.peak_pricing {
            Some(peak) if peak.covers(hour % HOURS_PER_DAY) => self.sell_price * peak.multiplier,
            _ => self.sell_price,
        }
    }

    /// Runs the grid's hourly balancing sequence.
    ///
    /// Transactions accumulate until [`Microgrid::flush`], so energy other
    /// grids push or pull later in the same hour lands in the same record.
    ///
    /// # Returns
    ///
    /// The energy sold to and bought from the utility this hour.
    pub fn step(
        &mut self,
        hour: usize,
        peers: &mut impl PeerExchange,
        utility: &mut UtilityMarket,
    ) -> HourlyBalance {
        let price = self.selling_price_at(hour);

        let generated = self.solar.generate(hour);
        self.generation_kwh = generated;
        self.available_generation_kwh += generated;
        self.flows.generation_kwh += generated;

        let mut pool = GenerationPool {
            available_kwh: &mut self.available_generation_kwh,
            served_kwh: 0.0,
        };
        let demand: f64 = self
            .houses
            .iter_mut()
            .map(|house| house.consume_energy(hour, &mut pool, price))
            .sum();
        let served = pool.served_kwh;
        self.demand_kwh = demand;
        self.revenue += served * price;
        self.flows.delivered_kwh += served;

        let balance = generated - demand;
        trace!(grid = %self.id, hour, generated, demand, served, balance, "hourly balance");

        if balance > ENERGY_EPSILON {
            let sold = self.settle_surplus(peers, utility);
            HourlyBalance {
                excess_kwh: sold,
                shortage_kwh: 0.0,
            }
        } else if balance < -ENERGY_EPSILON {
            let bought = self.settle_deficit(hour, -balance, price, peers, utility);
            HourlyBalance {
                excess_kwh: 0.0,
                shortage_kwh: bought,
            }
        } else {
            HourlyBalance::default()
        }
    }

    fn settle_surplus(&mut self, peers: &mut impl PeerExchange, utility: &mut UtilityMarket) -> f64 {
        let surplus = mem::take(&mut self.available_generation_kwh).max(0.0);

        let mut residual = self.battery.store(surplus);
        self.flows.battery_stored_kwh += surplus - residual;

        for &peer in &self.peers {
            if residual <= ENERGY_EPSILON {
                break;
            }
            let remainder = peers.accept_energy(peer, residual, self.id);
            let sent = residual - remainder;
            if sent > ENERGY_EPSILON {
                debug!(grid = %self.id, %peer, amount_kwh = sent, "surplus sent to peer");
                self.internal_transactions.push(InternalTransaction {
                    peer,
                    amount_kwh: sent,
                    direction: PeerDirection::Supply,
                });
                self.flows.peer_out_kwh += sent;
            }
            residual = remainder;
        }

        if residual > ENERGY_EPSILON {
            let proceeds = utility.buy_energy(residual);
            self.external_transactions.push(ExternalTransaction {
                direction: UtilityDirection::Sell,
                amount_kwh: residual,
                price: proceeds,
            });
            self.revenue += proceeds;
            self.flows.utility_sold_kwh += residual;
            residual
        } else {
            0.0
        }
    }

    fn settle_deficit(
        &mut self,
        hour: usize,
        need: f64,
        price: f64,
        peers: &mut impl PeerExchange,
        utility: &mut UtilityMarket,
    ) -> f64 {
        // All generation went to the houses.
        self.available_generation_kwh = 0.0;

        let from_battery = self
            .battery
            .draw(need.min(self.battery.available_above(self.deficit_reserve_kwh)));
        self.flows.battery_drawn_kwh += from_battery;
        let mut need = need - from_battery;

        let mut from_peers = 0.0;
        for &peer in &self.peers {
            if need <= ENERGY_EPSILON {
                break;
            }
            let provided = peers.provide_energy(peer, need, self.id).min(need);
            if provided > ENERGY_EPSILON {
                debug!(grid = %self.id, %peer, amount_kwh = provided, "deficit covered by peer");
                self.internal_transactions.push(InternalTransaction {
                    peer,
                    amount_kwh: provided,
                    direction: PeerDirection::Demand,
                });
                from_peers += provided;
                need -= provided;
            }
        }
        self.flows.peer_in_kwh += from_peers;

        let from_utility = if need > ENERGY_EPSILON {
            let cost = utility.sell_energy(need);
            self.external_transactions.push(ExternalTransaction {
                direction: UtilityDirection::Buy,
                amount_kwh: need,
                price: cost,
            });
            self.revenue -= cost;
            self.flows.utility_bought_kwh += need;
            need
        } else {
            0.0
        };

        let tranches = [
            (EnergySource::Battery, from_battery),
            (EnergySource::Peer, from_peers),
            (EnergySource::Utility, from_utility),
        ];
        let delivered = self.redistribute(hour, tranches, price);
        self.revenue += delivered * price;
        self.flows.delivered_kwh += delivered;

        let acquired = from_battery + from_peers + from_utility;
        let leftover = (acquired - delivered).max(0.0);
        if leftover > ENERGY_EPSILON {
            warn!(grid = %self.id, hour, amount_kwh = leftover, "acquired energy left unallocated");
            self.unallocated_kwh += leftover;
        }

        from_utility
    }

    /// Hands acquired energy to short houses in service order, battery
    /// energy first, then peer, then utility.
    fn redistribute(
        &mut self,
        hour: usize,
        tranches: [(EnergySource, f64); 3],
        price: f64,
    ) -> f64 {
        let mut delivered = 0.0;
        let mut tranches = tranches.into_iter().filter(|(_, kwh)| *kwh > ENERGY_EPSILON);
        let mut current = tranches.next();

        for house in &mut self.houses {
            while let Some((source, remaining)) = current.as_mut() {
                let unmet = house.unmet_demand_kwh();
                if unmet <= ENERGY_EPSILON {
                    break;
                }
                let amount = unmet.min(*remaining);
                house.supply_energy(hour, amount, *source, price);
                trace!(grid = %self.id, house = %house.id(), amount_kwh = amount, %source, "house supplied");
                delivered += amount;
                *remaining -= amount;
                if *remaining <= ENERGY_EPSILON {
                    current = tranches.next();
                }
            }
            if current.is_none() {
                break;
            }
        }
        delivered
    }

    /// Accepts surplus offered by a peer into the battery.
    ///
    /// # Returns
    ///
    /// The remainder that did not fit.
    pub fn accept_energy(&mut self, amount_kwh: f64, from: GridId) -> f64 {
        let amount = amount_kwh.max(0.0);
        let remainder = self.battery.store(amount);
        let stored = amount - remainder;
        if stored > ENERGY_EPSILON {
            debug!(grid = %self.id, %from, amount_kwh = stored, "stored energy from peer");
            self.internal_transactions.push(InternalTransaction {
                peer: from,
                amount_kwh: stored,
                direction: PeerDirection::Receive,
            });
            self.flows.peer_in_kwh += stored;
            self.flows.battery_stored_kwh += stored;
        }
        remainder
    }

    /// Serves a peer's request from the generation pool, then from battery
    /// energy above the peer reserve.
    ///
    /// # Returns
    ///
    /// The energy provided, never more than `amount_needed_kwh`.
    pub fn provide_energy(&mut self, amount_needed_kwh: f64, to: GridId) -> f64 {
        let needed = amount_needed_kwh.max(0.0);

        let from_pool = needed.min(self.available_generation_kwh.max(0.0));
        self.available_generation_kwh -= from_pool;

        let from_battery = self
            .battery
            .draw((needed - from_pool).min(self.battery.available_above(self.peer_reserve_kwh)));
        self.flows.battery_drawn_kwh += from_battery;

        let provided = from_pool + from_battery;
        if provided > ENERGY_EPSILON {
            debug!(grid = %self.id, %to, amount_kwh = provided, "supplied energy to peer");
            self.internal_transactions.push(InternalTransaction {
                peer: to,
                amount_kwh: provided,
                direction: PeerDirection::Supply,
            });
            self.flows.peer_out_kwh += provided;
        }
        provided
    }

    /// Appends this hour's grid and house records and resets the hourly state.
    pub fn flush(&mut self, hour: usize) {
        let unmet: f64 = self.houses.iter().map(House::unmet_demand_kwh).sum();
        let unallocated = mem::take(&mut self.unallocated_kwh);

        self.grid_log.push(GridRecord {
            simulation_hour: hour,
            grid_id: self.id,
            generation_kwh: self.generation_kwh,
            total_demand_kwh: self.demand_kwh,
            unmet_demand_kwh: unmet,
            internal_transactions: mem::take(&mut self.internal_transactions),
            external_transactions: mem::take(&mut self.external_transactions),
            revenue_usd: self.revenue,
            battery_level_kwh: self.battery.level_kwh(),
            battery_percent: self.battery.state_of_charge(),
            unallocated_kwh: unallocated,
            flows: mem::take(&mut self.flows),
        });
        for house in &self.houses {
            self.house_log.push(house.record(hour));
        }
    }

    /// Applies one degradation step to the battery.
    pub fn degrade_battery(&mut self) {
        self.battery.degrade();
    }

    /// Initial-state summary, computed on demand.
    pub fn snapshot(&self) -> GridSnapshot {
        let house_count = self.houses.len();
        let average_consumption = if house_count == 0 {
            0.0
        } else {
            self.houses.iter().map(House::current_demand_kwh).sum::<f64>() / house_count as f64
        };
        GridSnapshot {
            id: self.id,
            house_count,
            average_consumption,
            solar_capacity: self.solar.capacity_kw,
            battery_capacity: self.battery.capacity_kwh(),
        }
    }

    pub fn id(&self) -> GridId {
        self.id
    }

    pub fn houses(&self) -> &[House] {
        &self.houses
    }

    pub fn solar(&self) -> &SolarPv {
        &self.solar
    }

    pub fn battery(&self) -> &Battery {
        &self.battery
    }

    /// Peers in trading order.
    pub fn peers(&self) -> &[GridId] {
        &self.peers
    }

    pub fn sell_price(&self) -> f64 {
        self.sell_price
    }

    pub fn avg_sunlight_hours(&self) -> f64 {
        self.avg_sunlight_hours
    }

    /// Energy all houses need over one day, used for sizing and reserves.
    pub fn daily_energy_requirement_kwh(&self) -> f64 {
        self.daily_requirement_kwh
    }

    /// Battery level a peer request will not draw below.
    pub fn peer_reserve_kwh(&self) -> f64 {
        self.peer_reserve_kwh
    }

    /// Cumulative revenue: sales to houses and the utility minus utility purchases.
    pub fn revenue(&self) -> f64 {
        self.revenue
    }

    /// Generation produced during the most recent step.
    pub fn generation_kwh(&self) -> f64 {
        self.generation_kwh
    }

    /// Demand requested during the most recent step.
    pub fn demand_kwh(&self) -> f64 {
        self.demand_kwh
    }

    /// Unallocated energy not yet flushed.
    pub fn pending_unallocated_kwh(&self) -> f64 {
        self.unallocated_kwh
    }

    pub fn grid_log(&self) -> &EventLog<GridRecord> {
        &self.grid_log
    }

    pub fn grid_log_mut(&mut self) -> &mut EventLog<GridRecord> {
        &mut self.grid_log
    }

    pub fn house_log(&self) -> &EventLog<HouseRecord> {
        &self.house_log
    }

    pub fn house_log_mut(&mut self) -> &mut EventLog<HouseRecord> {
        &mut self.house_log
    }
}
