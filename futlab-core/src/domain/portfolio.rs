//! Portfolio — the open positions plus running account values.

use super::position::{Position, Side};
use serde::{Deserialize, Serialize};

/// Account state carried across bars.
///
/// Positions are kept in insertion order; the first one is the primary
/// position used for direction guards and per-bar snapshots. At most one
/// position exists per side. Both sides may be open at once; the entry path
/// only checks the primary before opening the other side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    positions: Vec<Position>,
    total_open_contracts: u32,
    asset_value: f64,
    cumulative_pnl: f64,
}

impl Portfolio {
    pub fn new(initial_asset_value: f64) -> Self {
        Self {
            positions: Vec::new(),
            total_open_contracts: 0,
            asset_value: initial_asset_value,
            cumulative_pnl: 0.0,
        }
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn is_flat(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn total_open_contracts(&self) -> u32 {
        self.total_open_contracts
    }

    pub fn asset_value(&self) -> f64 {
        self.asset_value
    }

    pub fn cumulative_pnl(&self) -> f64 {
        self.cumulative_pnl
    }

    /// The first held position, if any.
    pub fn primary(&self) -> Option<&Position> {
        self.positions.first()
    }

    pub fn position(&self, side: Side) -> Option<&Position> {
        self.positions.iter().find(|p| p.side == side)
    }

    pub(crate) fn position_mut(&mut self, side: Side) -> Option<&mut Position> {
        self.positions.iter_mut().find(|p| p.side == side)
    }

    pub(crate) fn positions_mut(&mut self) -> &mut [Position] {
        &mut self.positions
    }

    /// Append a new position and count its contracts.
    pub(crate) fn open(&mut self, side: Side, entry_price: f64, contracts: u32) {
        self.positions
            .push(Position::new(side, entry_price, contracts));
        self.total_open_contracts += contracts;
    }

    /// Add contracts to the existing position on `side`. Entry price is unchanged.
    pub(crate) fn add_contracts(&mut self, side: Side, contracts: u32) -> bool {
        match self.position_mut(side) {
            Some(pos) => {
                pos.contracts += contracts;
                self.total_open_contracts += contracts;
                true
            }
            None => false,
        }
    }

    pub(crate) fn release_contracts(&mut self, contracts: u32) {
        self.total_open_contracts = self.total_open_contracts.saturating_sub(contracts);
    }

    /// Remove positions by their index in the current ordering.
    pub(crate) fn remove_indices(&mut self, indices: &[usize]) {
        if indices.is_empty() {
            return;
        }
        let mut idx = 0;
        self.positions.retain(|_| {
            let keep = !indices.contains(&idx);
            idx += 1;
            keep
        });
    }

    /// Book realized P&L into the asset value and the cumulative total.
    pub(crate) fn realize(&mut self, pnl: f64) {
        self.asset_value += pnl;
        self.cumulative_pnl += pnl;
    }

    /// Sum of contracts across held positions. Equal to
    /// `total_open_contracts()` whenever the ledger is consistent.
    pub fn held_contracts(&self) -> u32 {
        self.positions.iter().map(|p| p.contracts).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_and_add_track_total() {
        let mut pf = Portfolio::new(1_000.0);
        pf.open(Side::Long, 1200.0, 3);
        assert!(pf.add_contracts(Side::Long, 2));
        assert!(!pf.add_contracts(Side::Short, 2));
        assert_eq!(pf.total_open_contracts(), 5);
        assert_eq!(pf.held_contracts(), 5);
        assert_eq!(pf.primary().map(|p| p.contracts), Some(5));
        assert_eq!(pf.primary().map(|p| p.entry_price), Some(1200.0));
    }

    #[test]
    fn remove_indices_preserves_order() {
        let mut pf = Portfolio::new(0.0);
        pf.open(Side::Long, 1.0, 1);
        pf.open(Side::Long, 2.0, 1);
        pf.open(Side::Long, 3.0, 1);
        pf.remove_indices(&[0, 2]);
        assert_eq!(pf.positions().len(), 1);
        assert_eq!(pf.positions()[0].entry_price, 2.0);
    }

    #[test]
    fn realize_moves_asset_and_cumulative_together() {
        let mut pf = Portfolio::new(500.0);
        pf.realize(12.5);
        pf.realize(-2.5);
        assert_eq!(pf.asset_value(), 510.0);
        assert_eq!(pf.cumulative_pnl(), 10.0);
    }
}
