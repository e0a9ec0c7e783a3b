//! Post-hoc run summary computed from the federation's records.

use std::fmt;

use super::federation::Federation;
use super::records::{FederationRecord, GridRecord, PeerDirection};
use super::utility::UtilityMarket;

/// Aggregate indicators derived from a complete simulation run.
///
/// Computed post-hoc from the appended records so the summary always agrees
/// with what was logged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FederationKpi {
    /// Number of simulated hours.
    pub hours: usize,
    /// Energy generated by every array (kWh).
    pub total_generation_kwh: f64,
    /// Energy requested by every house (kWh).
    pub total_demand_kwh: f64,
    /// Demand left unserved after settlement (kWh, cumulative).
    pub unmet_demand_kwh: f64,
    /// Energy the utility bought from grids (kWh).
    pub utility_purchased_kwh: f64,
    /// Energy the utility sold to grids (kWh).
    pub utility_sold_kwh: f64,
    /// Utility net revenue ($).
    pub utility_net_revenue: f64,
    /// Energy moved between grids (kWh, each transfer counted once).
    pub peer_traded_kwh: f64,
    /// Energy matched by federation netting (kWh).
    pub netted_kwh: f64,
    /// Acquired deficit energy no house could absorb (kWh).
    pub unallocated_kwh: f64,
    /// Share of demand not bought from the utility (%).
    pub self_sufficiency_pct: f64,
    /// Cost charged to all houses ($).
    pub client_expenditure: f64,
    /// Revenue across all grids ($).
    pub grid_revenue: f64,
}

impl FederationKpi {
    /// Computes the summary from raw records.
    ///
    /// # Arguments
    ///
    /// * `records` - Federation records in hour order
    /// * `grid_records` - Every grid record of the run, any order
    /// * `utility` - The utility after the run
    pub fn from_records<'a>(
        records: &[FederationRecord],
        grid_records: impl IntoIterator<Item = &'a GridRecord>,
        utility: &UtilityMarket,
    ) -> Self {
        let Some(last) = records.last() else {
            return Self::default();
        };

        let total_generation_kwh: f64 = records.iter().map(|r| r.total_generation).sum();
        let total_demand_kwh: f64 = records.iter().map(|r| r.total_demand).sum();

        // Every transfer is logged as a supply by the grid that sent it.
        let peer_traded_kwh = grid_records
            .into_iter()
            .flat_map(|r| &r.internal_transactions)
            .filter(|t| t.direction == PeerDirection::Supply)
            .map(|t| t.amount_kwh)
            .sum();

        let self_sufficiency_pct = if total_demand_kwh > 0.0 {
            (100.0 * (1.0 - utility.sold_kwh() / total_demand_kwh)).max(0.0)
        } else {
            100.0
        };

        Self {
            hours: records.len(),
            total_generation_kwh,
            total_demand_kwh,
            unmet_demand_kwh: last.unmet_demand,
            utility_purchased_kwh: utility.purchased_kwh(),
            utility_sold_kwh: utility.sold_kwh(),
            utility_net_revenue: utility.net_revenue(),
            peer_traded_kwh,
            netted_kwh: last.netted_kwh,
            unallocated_kwh: last.unallocated_kwh,
            self_sufficiency_pct,
            client_expenditure: last.total_client_expenditure,
            grid_revenue: last.revenue,
        }
    }

    /// Computes the summary for a federation's full history.
    pub fn from_federation(federation: &Federation) -> Self {
        Self::from_records(
            federation.log().records(),
            federation
                .grids()
                .iter()
                .flat_map(|g| g.grid_log().records()),
            federation.utility(),
        )
    }
}

impl fmt::Display for FederationKpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Federation Summary ({} h) ---", self.hours)?;
        writeln!(f, "Generation:            {:.3} kWh", self.total_generation_kwh)?;
        writeln!(f, "Demand:                {:.3} kWh", self.total_demand_kwh)?;
        writeln!(f, "Unmet demand:          {:.3} kWh", self.unmet_demand_kwh)?;
        writeln!(f, "Peer traded:           {:.3} kWh", self.peer_traded_kwh)?;
        writeln!(
            f,
            "Utility bought/sold:   {:.3} / {:.3} kWh (net revenue ${:.3})",
            self.utility_purchased_kwh, self.utility_sold_kwh, self.utility_net_revenue
        )?;
        writeln!(f, "Netted:                {:.3} kWh", self.netted_kwh)?;
        writeln!(f, "Unallocated:           {:.3} kWh", self.unallocated_kwh)?;
        writeln!(f, "Self-sufficiency:      {:.1}%", self.self_sufficiency_pct)?;
        writeln!(f, "Client expenditure:    ${:.3}", self.client_expenditure)?;
        write!(f, "Grid revenue:          ${:.3}", self.grid_revenue)
    }
}
