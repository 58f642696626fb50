//! Position ledger — the exit and entry state machines over a `Portfolio`.
//!
//! The driver calls `resolve_exits` then `resolve_entries` once per bar.
//! These are the only code paths that mutate open positions, the global
//! contract count, asset value and cumulative P&L.

pub mod entries;
pub mod exits;
pub mod ratchet;

pub use entries::{resolve_entries, EntryAction};
pub use exits::{partial_exit_contracts, resolve_exits, ExitOutcome, ExitRules};
pub use ratchet::{is_breached, ratchet_stop, trail_candidate};

use crate::domain::FeatureBar;
use chrono::NaiveDateTime;

/// The slice of a feature bar the ledger reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarContext {
    /// Index into the post-warmup feature series.
    pub index: usize,
    pub timestamp: NaiveDateTime,
    /// Close price; every fill happens here.
    pub price: f64,
    pub atr: f64,
}

impl BarContext {
    pub fn new(index: usize, bar: &FeatureBar) -> Self {
        Self {
            index,
            timestamp: bar.bar.timestamp,
            price: bar.close(),
            atr: bar.atr,
        }
    }
}
