use crate::devices::types::{Device, DeviceContext, HOURS_PER_DAY, SupplyChannel};
use crate::error::ConfigError;
use crate::sim::records::{EnergySource, EventLog, HouseRecord, SupplyRecord};
use crate::sim::types::{GridId, HouseId};

/// A consuming household attached to one microgrid.
///
/// Demand for an hour is `base_demand_kwh * profile[hour mod 24]`. The house
/// first pulls from its grid's generation channel; whatever that channel
/// cannot cover stays as unmet demand until the grid's settlement pass
/// delivers battery, peer, or utility energy through [`House::supply_energy`].
///
/// The owning grid is referenced by id only.
#[derive(Debug, Clone)]
pub struct House {
    id: HouseId,
    grid: GridId,
    base_demand_kwh: f64,
    profile: [f64; HOURS_PER_DAY],
    current_demand_kwh: f64,
    unmet_demand_kwh: f64,
    cost: f64,
    supplied_kwh: f64,
    energy_source: Option<EnergySource>,
    supply_log: EventLog<SupplyRecord>,
}

impl House {
    /// Creates a new house.
    ///
    /// # Arguments
    ///
    /// * `id` - House identifier, unique within the grid
    /// * `grid` - Owning grid (lookup handle)
    /// * `base_demand_kwh` - Base hourly demand scaled by the profile (>= 0)
    /// * `profile` - Exactly 24 non-negative hourly multipliers
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the profile does not have 24 entries, or
    /// any demand value is negative or not finite.
    pub fn new(
        id: HouseId,
        grid: GridId,
        base_demand_kwh: f64,
        profile: &[f64],
    ) -> Result<Self, ConfigError> {
        let profile: [f64; HOURS_PER_DAY] = profile.try_into().map_err(|_| {
            ConfigError::new(
                "profile",
                format!(
                    "must contain {HOURS_PER_DAY} hourly values, got {}",
                    profile.len()
                ),
            )
        })?;
        if !base_demand_kwh.is_finite() || base_demand_kwh < 0.0 {
            return Err(ConfigError::new(
                "base_demand_kwh",
                format!("must be a finite value >= 0, got {base_demand_kwh}"),
            ));
        }
        if let Some(h) = profile.iter().position(|v| !v.is_finite() || *v < 0.0) {
            return Err(ConfigError::new(
                "profile",
                format!("hour {h} must be a finite value >= 0, got {}", profile[h]),
            ));
        }

        Ok(Self {
            id,
            grid,
            base_demand_kwh,
            profile,
            current_demand_kwh: base_demand_kwh,
            unmet_demand_kwh: 0.0,
            cost: 0.0,
            supplied_kwh: 0.0,
            energy_source: None,
            supply_log: EventLog::new(),
        })
    }

    /// Demand for `hour` in kWh.
    pub fn demand_at(&self, hour: usize) -> f64 {
        self.base_demand_kwh * self.profile[hour % HOURS_PER_DAY]
    }

    /// Energy this house needs over one full day.
    pub fn daily_energy_kwh(&self) -> f64 {
        self.profile.iter().map(|f| self.base_demand_kwh * f).sum()
    }

    /// Computes this hour's demand and serves it from the generation channel.
    ///
    /// # Arguments
    ///
    /// * `hour` - Absolute simulation hour
    /// * `channel` - The grid's generation-only supply channel
    /// * `price` - Grid selling price per kWh for this hour
    ///
    /// # Returns
    ///
    /// The current demand in kWh.
    pub fn consume_energy(
        &mut self,
        hour: usize,
        channel: &mut impl SupplyChannel,
        price: f64,
    ) -> f64 {
        self.current_demand_kwh = self.energy_kwh(&DeviceContext::new(hour));

        let supplied = channel.supply(self.current_demand_kwh).max(0.0);
        self.unmet_demand_kwh = (self.current_demand_kwh - supplied).max(0.0);
        self.cost += supplied * price;
        self.supplied_kwh += supplied;
        self.energy_source = (supplied > 0.0).then_some(EnergySource::Generation);

        self.current_demand_kwh
    }

    /// Receives settlement energy covering part of the unmet demand.
    ///
    /// Reduces unmet and current demand by `amount_kwh` (floored at 0),
    /// charges `price` per kWh, and appends a [`SupplyRecord`].
    pub fn supply_energy(&mut self, hour: usize, amount_kwh: f64, source: EnergySource, price: f64) {
        let amount = amount_kwh.max(0.0);
        self.unmet_demand_kwh = (self.unmet_demand_kwh - amount).max(0.0);
        self.current_demand_kwh = (self.current_demand_kwh - amount).max(0.0);
        self.cost += amount * price;
        self.supplied_kwh += amount;
        self.energy_source = match self.energy_source {
            None => Some(source),
            Some(previous) if previous == source => Some(source),
            Some(_) => Some(EnergySource::Mixed),
        };

        self.supply_log.push(SupplyRecord {
            simulation_hour: hour,
            amount_kwh: amount,
            source,
            remaining_unmet_kwh: self.unmet_demand_kwh,
            current_demand_kwh: self.current_demand_kwh,
            total_cost: self.cost,
            total_supplied_kwh: self.supplied_kwh,
        });
    }

    /// Builds the per-hour log record for this house.
    pub fn record(&self, hour: usize) -> HouseRecord {
        HouseRecord {
            simulation_hour: hour,
            grid_id: self.grid,
            house_id: self.id,
            current_demand: self.current_demand_kwh,
            unmet_demand: self.unmet_demand_kwh,
            cost: self.cost,
            energy_source: self.energy_source,
        }
    }

    pub fn id(&self) -> HouseId {
        self.id
    }

    pub fn grid(&self) -> GridId {
        self.grid
    }

    pub fn base_demand_kwh(&self) -> f64 {
        self.base_demand_kwh
    }

    pub fn current_demand_kwh(&self) -> f64 {
        self.current_demand_kwh
    }

    pub fn unmet_demand_kwh(&self) -> f64 {
        self.unmet_demand_kwh
    }

    /// Cumulative cost charged to this house.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Cumulative energy delivered to this house.
    pub fn supplied_kwh(&self) -> f64 {
        self.supplied_kwh
    }

    pub fn energy_source(&self) -> Option<EnergySource> {
        self.energy_source
    }

    /// Settlement deliveries received so far.
    pub fn supply_log(&self) -> &EventLog<SupplyRecord> {
        &self.supply_log
    }
}

impl Device for House {
    /// Demand for the hour; does not touch settlement state.
    fn energy_kwh(&mut self, context: &DeviceContext) -> f64 {
        self.demand_at(context.hour)
    }

    fn device_type(&self) -> &'static str {
        "House"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Channel with a fixed amount of energy.
    struct Pool(f64);

    impl SupplyChannel for Pool {
        fn supply(&mut self, requested_kwh: f64) -> f64 {
            let given = requested_kwh.min(self.0);
            self.0 -= given;
            given
        }
    }

    fn flat_house(base: f64) -> House {
        House::new(HouseId(0), GridId(1), base, &[1.0; 24]).unwrap()
    }

    #[test]
    fn test_profile_length_validated() {
        let err = House::new(HouseId(0), GridId(1), 1.0, &[1.0; 23]).unwrap_err();
        assert_eq!(err.field, "profile");
        assert!(House::new(HouseId(0), GridId(1), 1.0, &[1.0; 25]).is_err());
        assert!(House::new(HouseId(0), GridId(1), 1.0, &[]).is_err());
    }

    #[test]
    fn test_negative_values_rejected() {
        assert!(House::new(HouseId(0), GridId(1), -1.0, &[1.0; 24]).is_err());
        let mut profile = [1.0; 24];
        profile[5] = -0.2;
        assert!(House::new(HouseId(0), GridId(1), 1.0, &profile).is_err());
    }

    #[test]
    fn test_demand_follows_profile() {
        let mut profile = [1.0; 24];
        profile[18] = 1.9;
        let house = House::new(HouseId(0), GridId(1), 0.5, &profile).unwrap();
        assert_eq!(house.demand_at(18), 0.95);
        assert_eq!(house.demand_at(42), 0.95);
        assert_eq!(house.demand_at(3), 0.5);
        assert!((house.daily_energy_kwh() - (0.5 * 23.0 + 0.95)).abs() < 1e-12);
    }

    #[test]
    fn test_consume_fully_served() {
        let mut house = flat_house(1.0);
        let mut pool = Pool(5.0);
        let demand = house.consume_energy(10, &mut pool, 0.05);
        assert_eq!(demand, 1.0);
        assert_eq!(house.unmet_demand_kwh(), 0.0);
        assert!((house.cost() - 0.05).abs() < 1e-12);
        assert_eq!(house.energy_source(), Some(EnergySource::Generation));
        assert_eq!(pool.0, 4.0);
    }

    #[test]
    fn test_consume_partially_served() {
        let mut house = flat_house(2.0);
        let mut pool = Pool(0.5);
        house.consume_energy(10, &mut pool, 0.1);
        assert_eq!(house.unmet_demand_kwh(), 1.5);
        assert!((house.cost() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_consume_without_generation() {
        let mut house = flat_house(1.0);
        house.consume_energy(2, &mut Pool(0.0), 0.1);
        assert_eq!(house.unmet_demand_kwh(), 1.0);
        assert_eq!(house.cost(), 0.0);
        assert_eq!(house.energy_source(), None);
    }

    #[test]
    fn test_supply_resolves_unmet_and_logs() {
        let mut house = flat_house(1.0);
        house.consume_energy(2, &mut Pool(0.0), 0.06);
        house.supply_energy(2, 1.0, EnergySource::Utility, 0.06);

        assert_eq!(house.unmet_demand_kwh(), 0.0);
        assert_eq!(house.current_demand_kwh(), 0.0);
        assert!((house.cost() - 0.06).abs() < 1e-12);
        assert_eq!(house.energy_source(), Some(EnergySource::Utility));

        let log = house.supply_log().records();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].source, EnergySource::Utility);
        assert_eq!(log[0].remaining_unmet_kwh, 0.0);
    }

    #[test]
    fn test_supply_from_two_sources_is_mixed() {
        let mut house = flat_house(2.0);
        house.consume_energy(2, &mut Pool(0.0), 0.05);
        house.supply_energy(2, 0.5, EnergySource::Battery, 0.05);
        house.supply_energy(2, 1.5, EnergySource::Utility, 0.05);
        assert_eq!(house.energy_source(), Some(EnergySource::Mixed));
        assert_eq!(house.unmet_demand_kwh(), 0.0);
    }

    #[test]
    fn test_oversupply_floors_at_zero() {
        let mut house = flat_house(1.0);
        house.consume_energy(2, &mut Pool(0.0), 0.05);
        house.supply_energy(2, 3.0, EnergySource::Peer, 0.05);
        assert_eq!(house.unmet_demand_kwh(), 0.0);
        assert_eq!(house.current_demand_kwh(), 0.0);
    }

    #[test]
    fn test_cost_is_monotonic() {
        let mut house = flat_house(1.5);
        let mut last = 0.0;
        for h in 0..48 {
            let mut pool = Pool(if h % 2 == 0 { 1.0 } else { 0.0 });
            house.consume_energy(h, &mut pool, 0.05);
            let unmet = house.unmet_demand_kwh();
            house.supply_energy(h, unmet, EnergySource::Utility, 0.05);
            assert!(house.cost() >= last);
            last = house.cost();
        }
    }

    #[test]
    fn test_record_snapshot() {
        let mut house = flat_house(1.0);
        house.consume_energy(9, &mut Pool(0.25), 0.04);
        let r = house.record(9);
        assert_eq!(r.simulation_hour, 9);
        assert_eq!(r.grid_id, GridId(1));
        assert_eq!(r.house_id, HouseId(0));
        assert_eq!(r.current_demand, 1.0);
        assert_eq!(r.unmet_demand, 0.75);
        assert_eq!(r.energy_source, Some(EnergySource::Generation));
    }
}
