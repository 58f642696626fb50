//! Six-condition entry gates.
//!
//! Each side evaluates six boolean sub-conditions on a feature bar. The long
//! gate tolerates one failed condition, the short gate tolerates two. The
//! asymmetry is part of the strategy and must not be unified.

use crate::domain::{FeatureBar, Side};
use crate::params::StrategyParams;

/// Failed sub-conditions the long gate tolerates (needs 5 of 6).
pub const LONG_MAX_FAILURES: usize = 1;
/// Failed sub-conditions the short gate tolerates (needs 4 of 6).
pub const SHORT_MAX_FAILURES: usize = 2;

/// The parameter subset the gates and strength read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateThresholds {
    pub acceleration_threshold: f64,
    pub short_acceleration_threshold: f64,
    pub quantity_multiply: f64,
    pub sma_gap: f64,
    pub rsi_threshold: f64,
}

impl From<&StrategyParams> for GateThresholds {
    fn from(p: &StrategyParams) -> Self {
        Self {
            acceleration_threshold: p.acceleration_threshold,
            short_acceleration_threshold: p.short_acceleration_threshold,
            quantity_multiply: p.quantity_multiply,
            sma_gap: p.sma_gap,
            rsi_threshold: p.rsi_threshold,
        }
    }
}

/// Outcome of the six sub-conditions for one side on one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryConditions {
    /// (a) acceleration beyond the threshold in the trade direction
    pub momentum: bool,
    /// (b) reference index moving in the trade direction
    pub index_confirms: bool,
    /// (c) volume above average volume × quantity_multiply
    pub volume_surge: bool,
    /// (d) price stretched away from the SMA by more than sma_gap
    pub sma_stretch: bool,
    /// (e) one-bar acceleration beyond its threshold
    pub short_momentum: bool,
    /// (f) RSI beyond 50 ± rsi_threshold
    pub rsi: bool,
}

impl EntryConditions {
    pub fn as_array(&self) -> [bool; 6] {
        [
            self.momentum,
            self.index_confirms,
            self.volume_surge,
            self.sma_stretch,
            self.short_momentum,
            self.rsi,
        ]
    }

    pub fn failures(&self) -> usize {
        self.as_array().iter().filter(|ok| !**ok).count()
    }

    pub fn passes(&self, max_failures: usize) -> bool {
        self.failures() <= max_failures
    }
}

pub fn long_conditions(bar: &FeatureBar, t: &GateThresholds) -> EntryConditions {
    EntryConditions {
        momentum: bar.acceleration > t.acceleration_threshold,
        index_confirms: bar.index_acceleration > 0.0,
        volume_surge: bar.volume() > bar.average_volume * t.quantity_multiply,
        sma_stretch: bar.price_sma_ratio < 1.0 - t.sma_gap,
        short_momentum: bar.short_acceleration > t.short_acceleration_threshold,
        rsi: bar.rsi < 50.0 - t.rsi_threshold,
    }
}

pub fn short_conditions(bar: &FeatureBar, t: &GateThresholds) -> EntryConditions {
    EntryConditions {
        momentum: bar.acceleration < -t.acceleration_threshold,
        index_confirms: bar.index_acceleration < 0.0,
        volume_surge: bar.volume() > bar.average_volume * t.quantity_multiply,
        sma_stretch: bar.price_sma_ratio > 1.0 + t.sma_gap,
        short_momentum: bar.short_acceleration < -t.short_acceleration_threshold,
        rsi: bar.rsi > 50.0 + t.rsi_threshold,
    }
}

/// Evaluate the gate for one side.
pub fn gate_passes(side: Side, bar: &FeatureBar, t: &GateThresholds) -> bool {
    match side {
        Side::Long => long_conditions(bar, t).passes(LONG_MAX_FAILURES),
        Side::Short => short_conditions(bar, t).passes(SHORT_MAX_FAILURES),
    }
}
