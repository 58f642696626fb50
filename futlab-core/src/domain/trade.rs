//! Close records — every full or partial close the ledger performs.

use super::position::Side;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Which exit rule produced a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitKind {
    StopLoss,
    PartialTakeProfit,
    TrailingStop,
}

/// One close of some or all contracts of a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitRecord {
    /// Index into the post-warmup feature series.
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub side: Side,
    pub kind: ExitKind,
    pub contracts: u32,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Net of fees.
    pub pnl: f64,
}

impl ExitRecord {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}
