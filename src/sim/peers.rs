//! Peer-to-peer energy exchange between microgrids.

use tracing::warn;

use super::microgrid::Microgrid;
use super::types::GridId;

/// Access to the peers a microgrid trades with during its hourly step.
///
/// Calls resolve fully and in order; the caller never holds two peers at once.
pub trait PeerExchange {
    /// Offers `amount_kwh` of surplus to `peer`.
    ///
    /// # Returns
    ///
    /// The unabsorbed remainder, in `[0, amount_kwh]`.
    fn accept_energy(&mut self, peer: GridId, amount_kwh: f64, from: GridId) -> f64;

    /// Requests `amount_kwh` from `peer`.
    ///
    /// # Returns
    ///
    /// The energy actually provided, in `[0, amount_kwh]`.
    fn provide_energy(&mut self, peer: GridId, amount_kwh: f64, to: GridId) -> f64;
}

/// An empty peer set: nothing is accepted and nothing is provided.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPeers;

impl PeerExchange for NoPeers {
    fn accept_energy(&mut self, _peer: GridId, amount_kwh: f64, _from: GridId) -> f64 {
        amount_kwh
    }

    fn provide_energy(&mut self, _peer: GridId, _amount_kwh: f64, _to: GridId) -> f64 {
        0.0
    }
}

/// Every grid in a registry except the one currently stepping.
///
/// Built by splitting the federation's grid slice around the active grid, so
/// the active grid and its peers are disjoint mutable borrows of the same
/// registry rather than cross-references.
pub struct PeerSet<'a> {
    before: &'a mut [Microgrid],
    after: &'a mut [Microgrid],
}

impl<'a> PeerSet<'a> {
    /// Splits `grids` into the grid at `index` and the set of all others.
    ///
    /// Returns `None` if `index` is out of bounds.
    pub fn split(grids: &'a mut [Microgrid], index: usize) -> Option<(&'a mut Microgrid, Self)> {
        if index >= grids.len() {
            return None;
        }
        let (before, rest) = grids.split_at_mut(index);
        let (current, after) = rest.split_first_mut()?;
        Some((current, Self { before, after }))
    }

    fn find(&mut self, id: GridId) -> Option<&mut Microgrid> {
        self.before
            .iter_mut()
            .chain(self.after.iter_mut())
            .find(|grid| grid.id() == id)
    }
}

impl PeerExchange for PeerSet<'_> {
    fn accept_energy(&mut self, peer: GridId, amount_kwh: f64, from: GridId) -> f64 {
        match self.find(peer) {
            Some(grid) => grid.accept_energy(amount_kwh, from).clamp(0.0, amount_kwh.max(0.0)),
            None => {
                warn!(%peer, %from, "offer to unknown peer ignored");
                amount_kwh
            }
        }
    }

    fn provide_energy(&mut self, peer: GridId, amount_kwh: f64, to: GridId) -> f64 {
        match self.find(peer) {
            Some(grid) => grid.provide_energy(amount_kwh, to).clamp(0.0, amount_kwh.max(0.0)),
            None => {
                warn!(%peer, %to, "request to unknown peer ignored");
                0.0
            }
        }
    }
}
