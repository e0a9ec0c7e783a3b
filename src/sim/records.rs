//! Append-only per-hour records emitted by houses, grids, and the federation.

use std::fmt;

use serde::Serialize;

use super::types::{GridId, HouseId};

/// An append-only stream of records.
///
/// Records are never removed. [`EventLog::drain_new`] hands out the records
/// appended since the previous drain and advances a cursor, so a persistence
/// collaborator can consume incrementally while the full history stays
/// available through [`EventLog::records`].
#[derive(Debug, Clone)]
pub struct EventLog<T> {
    records: Vec<T>,
    drained: usize,
}

impl<T> Default for EventLog<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            drained: 0,
        }
    }
}

impl<T> EventLog<T> {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record.
    pub fn push(&mut self, record: T) {
        self.records.push(record);
    }

    /// Returns every record appended so far.
    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// Returns the records not yet drained, without advancing the cursor.
    pub fn pending(&self) -> &[T] {
        &self.records[self.drained..]
    }

    /// Returns the records appended since the last drain and advances the cursor.
    pub fn drain_new(&mut self) -> &[T] {
        let start = self.drained;
        self.drained = self.records.len();
        &self.records[start..]
    }

    /// Returns the most recent record.
    pub fn last(&self) -> Option<&T> {
        self.records.last()
    }

    /// Number of records appended so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Provenance of energy delivered to a house.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergySource {
    Generation,
    Battery,
    Peer,
    Utility,
    /// More than one source contributed during the hour.
    Mixed,
}

impl EnergySource {
    /// Lower-case label used in logs and exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generation => "generation",
            Self::Battery => "battery",
            Self::Peer => "peer",
            Self::Utility => "utility",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for EnergySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a transfer between two microgrids, from the logging grid's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerDirection {
    /// Energy sent to the peer.
    Supply,
    /// Energy requested from and delivered by the peer.
    Demand,
    /// Energy offered by the peer and stored locally.
    Receive,
}

impl PeerDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supply => "supply",
            Self::Demand => "demand",
            Self::Receive => "receive",
        }
    }
}

/// Direction of a trade with the utility, from the microgrid's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UtilityDirection {
    Sell,
    Buy,
}

impl UtilityDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sell => "sell",
            Self::Buy => "buy",
        }
    }
}

/// An energy transfer between two microgrids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InternalTransaction {
    pub peer: GridId,
    pub amount_kwh: f64,
    pub direction: PeerDirection,
}

/// An energy transfer between a microgrid and the utility.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalTransaction {
    pub direction: UtilityDirection,
    pub amount_kwh: f64,
    /// Proceeds for a sale, cost for a purchase.
    pub price: f64,
}

/// One settlement delivery to a house.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyRecord {
    pub simulation_hour: usize,
    pub amount_kwh: f64,
    pub source: EnergySource,
    pub remaining_unmet_kwh: f64,
    pub current_demand_kwh: f64,
    pub total_cost: f64,
    pub total_supplied_kwh: f64,
}

/// Energy moved through a microgrid during one hour.
///
/// Inflows are generation, battery draws, peer energy received, and utility
/// purchases; outflows are battery stores, peer energy sent, utility sales,
/// and energy delivered to houses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EnergyFlows {
    pub generation_kwh: f64,
    pub battery_drawn_kwh: f64,
    pub peer_in_kwh: f64,
    pub utility_bought_kwh: f64,
    pub battery_stored_kwh: f64,
    pub peer_out_kwh: f64,
    pub utility_sold_kwh: f64,
    pub delivered_kwh: f64,
}

impl EnergyFlows {
    /// Total energy entering the grid's balance.
    pub fn inflow_kwh(&self) -> f64 {
        self.generation_kwh + self.battery_drawn_kwh + self.peer_in_kwh + self.utility_bought_kwh
    }

    /// Total energy leaving the grid's balance.
    pub fn outflow_kwh(&self) -> f64 {
        self.battery_stored_kwh + self.peer_out_kwh + self.utility_sold_kwh + self.delivered_kwh
    }
}

/// Per-hour state of one house.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseRecord {
    pub simulation_hour: usize,
    pub grid_id: GridId,
    pub house_id: HouseId,
    pub current_demand: f64,
    pub unmet_demand: f64,
    pub cost: f64,
    /// `None` when the house received no energy this hour.
    pub energy_source: Option<EnergySource>,
}

/// Per-hour state of one microgrid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRecord {
    pub simulation_hour: usize,
    pub grid_id: GridId,
    pub generation_kwh: f64,
    pub total_demand_kwh: f64,
    pub unmet_demand_kwh: f64,
    pub internal_transactions: Vec<InternalTransaction>,
    pub external_transactions: Vec<ExternalTransaction>,
    pub revenue_usd: f64,
    pub battery_level_kwh: f64,
    pub battery_percent: f64,
    /// Acquired deficit energy no house could absorb.
    pub unallocated_kwh: f64,
    pub flows: EnergyFlows,
}

/// Per-hour aggregate across the federation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FederationRecord {
    pub simulation_hour: usize,
    /// Generation across all grids this hour.
    pub total_generation: f64,
    /// Demand across all grids this hour.
    pub total_demand: f64,
    /// Cumulative demand left unserved after settlement.
    pub unmet_demand: f64,
    /// Cumulative net federation position with the utility (+ sold, - bought).
    pub total_grid_transactions: f64,
    /// Cumulative cost charged to all houses.
    pub total_client_expenditure: f64,
    /// Sum of all grid revenues.
    pub revenue: f64,
    /// Cumulative energy matched by federation netting.
    pub netted_kwh: f64,
    /// Cumulative unallocated deficit energy.
    pub unallocated_kwh: f64,
}

impl fmt::Display for FederationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "h={:>4} | gen={:>8.3} kWh  demand={:>8.3} kWh  unmet={:>7.3} kWh | \
             utility_net={:>9.3} kWh | spend=${:>9.3}  revenue=${:>9.3}",
            self.simulation_hour,
            self.total_generation,
            self.total_demand,
            self.unmet_demand,
            self.total_grid_transactions,
            self.total_client_expenditure,
            self.revenue,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_new_advances_without_removing() {
        let mut log = EventLog::new();
        log.push(1);
        log.push(2);
        assert_eq!(log.drain_new(), &[1, 2]);
        assert!(log.drain_new().is_empty());

        log.push(3);
        assert_eq!(log.pending(), &[3]);
        assert_eq!(log.drain_new(), &[3]);
        assert_eq!(log.records(), &[1, 2, 3]);
        assert_eq!(log.len(), 3);
        assert_eq!(log.last(), Some(&3));
    }

    #[test]
    fn empty_log() {
        let mut log: EventLog<u8> = EventLog::default();
        assert!(log.is_empty());
        assert!(log.drain_new().is_empty());
        assert!(log.last().is_none());
    }

    #[test]
    fn flows_totals() {
        let flows = EnergyFlows {
            generation_kwh: 2.0,
            battery_drawn_kwh: 0.5,
            peer_in_kwh: 0.25,
            utility_bought_kwh: 1.0,
            battery_stored_kwh: 0.75,
            peer_out_kwh: 0.5,
            utility_sold_kwh: 0.0,
            delivered_kwh: 2.5,
        };
        assert_eq!(flows.inflow_kwh(), 3.75);
        assert_eq!(flows.outflow_kwh(), 3.75);
    }

    #[test]
    fn labels_are_lowercase() {
        assert_eq!(EnergySource::Utility.to_string(), "utility");
        assert_eq!(PeerDirection::Receive.as_str(), "receive");
        assert_eq!(UtilityDirection::Buy.as_str(), "buy");
    }

    #[test]
    fn federation_record_display_does_not_panic() {
        let r = FederationRecord {
            simulation_hour: 5,
            total_generation: 0.0,
            total_demand: 3.2,
            unmet_demand: 0.0,
            total_grid_transactions: -1.5,
            total_client_expenditure: 0.4,
            revenue: 0.1,
            netted_kwh: 0.0,
            unallocated_kwh: 0.0,
        };
        assert!(format!("{r}").starts_with("h=   5"));
    }
}
