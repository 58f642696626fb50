//! Bar — one time step of futures market data plus the reference index.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// OHLCV bar for the traded contract, carrying the reference index price
/// observed at the same timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Reference index level (VN30 for the VN30F1M contract).
    pub index_price: f64,
}

impl Bar {
    /// Name of the first field that is NaN or infinite, if any.
    pub fn first_non_finite_field(&self) -> Option<&'static str> {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
            ("index_price", self.index_price),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }

    /// Returns true if every numeric field is finite.
    pub fn is_finite(&self) -> bool {
        self.first_non_finite_field().is_none()
    }

    /// Basic OHLC sanity check: high >= low, high bounds open/close, low bounds open/close.
    pub fn is_sane(&self) -> bool {
        self.is_finite()
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= 0.0
    }
}
