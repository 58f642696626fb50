//! FeatureBar — a bar augmented with every derived series the entry and exit rules read.

use super::bar::Bar;
use serde::{Deserialize, Serialize};

/// Bar plus precomputed features. Every feature is finite once the preprocessor
/// has dropped the warmup rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBar {
    pub bar: Bar,
    /// Rolling mean of close over `sma_window_length`.
    pub sma: f64,
    /// close / sma.
    pub price_sma_ratio: f64,
    /// close - close `momentum_lookback` bars ago.
    pub acceleration: f64,
    /// close - previous close.
    pub short_acceleration: f64,
    /// index price - index price `momentum_lookback` bars ago.
    pub index_acceleration: f64,
    /// Rolling-mean RSI in [0, 100].
    pub rsi: f64,
    /// Rolling mean of true range.
    pub atr: f64,
    /// Rolling mean of volume over `quantity_window`.
    pub average_volume: f64,
}

impl FeatureBar {
    pub fn close(&self) -> f64 {
        self.bar.close
    }

    pub fn volume(&self) -> f64 {
        self.bar.volume
    }

    /// Name of the first non-finite feature, if any.
    pub fn first_non_finite_feature(&self) -> Option<&'static str> {
        [
            ("sma", self.sma),
            ("price_sma_ratio", self.price_sma_ratio),
            ("acceleration", self.acceleration),
            ("short_acceleration", self.short_acceleration),
            ("index_acceleration", self.index_acceleration),
            ("rsi", self.rsi),
            ("atr", self.atr),
            ("average_volume", self.average_volume),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }
}
