//! Position — one open block of contracts on one side.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }

    /// +1 for long, -1 for short. Multiplies a price move into a P&L move.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// An open position.
///
/// `contracts` stays within `1..=max_position_contracts` while the position
/// is held by a portfolio. `trailing_stop` is set exactly when
/// `partially_exited` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    pub entry_price: f64,
    pub contracts: u32,
    pub partially_exited: bool,
    pub trailing_stop: Option<f64>,
}

impl Position {
    pub fn new(side: Side, entry_price: f64, contracts: u32) -> Self {
        Self {
            side,
            entry_price,
            contracts,
            partially_exited: false,
            trailing_stop: None,
        }
    }

    /// Realized P&L for closing `contracts` at `exit_price`, net of the
    /// per-contract fee.
    pub fn realized_pnl(&self, exit_price: f64, contracts: u32, fee_per_contract: f64) -> f64 {
        let n = f64::from(contracts);
        self.side.sign() * (exit_price - self.entry_price) * n - fee_per_contract * n
    }
}
