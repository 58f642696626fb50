//! Entry signals — portfolio-agnostic per-bar decisions.
//!
//! Signals never look at portfolio state. They answer "would the strategy
//! enter long / short on this bar, and how strongly?". Whether the entry
//! actually happens (direction guard, caps) is the ledger's call.

pub mod gate;

pub use gate::{
    gate_passes, long_conditions, short_conditions, EntryConditions, GateThresholds,
    LONG_MAX_FAILURES, SHORT_MAX_FAILURES,
};

use crate::domain::{FeatureBar, Side};
use crate::params::StrategyParams;

/// A gated entry decision with its strength in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntrySignal {
    pub side: Side,
    pub strength: f64,
}

/// Both sides' decisions for one bar. A side is `Some` only if its gate passed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SignalEvaluation {
    pub long: Option<EntrySignal>,
    pub short: Option<EntrySignal>,
}

impl SignalEvaluation {
    /// Gated signals in evaluation order: long first, then short.
    pub fn in_order(&self) -> impl Iterator<Item = EntrySignal> {
        self.long.into_iter().chain(self.short)
    }
}

/// Long strength: 0 below the threshold, else acceleration / threshold capped at 1.
pub fn long_strength(acceleration: f64, threshold: f64) -> f64 {
    if acceleration < threshold {
        return 0.0;
    }
    (acceleration / threshold).min(1.0)
}

/// Short strength: 0 above -threshold, else |acceleration| / threshold capped at 1.
pub fn short_strength(acceleration: f64, threshold: f64) -> f64 {
    if acceleration > -threshold {
        return 0.0;
    }
    (acceleration.abs() / threshold).min(1.0)
}

/// Evaluates both gates and strengths for a bar.
#[derive(Debug, Clone, Copy)]
pub struct SignalEvaluator {
    thresholds: GateThresholds,
}

impl SignalEvaluator {
    pub fn new(params: &StrategyParams) -> Self {
        Self {
            thresholds: GateThresholds::from(params),
        }
    }

    pub fn thresholds(&self) -> &GateThresholds {
        &self.thresholds
    }

    pub fn evaluate(&self, bar: &FeatureBar) -> SignalEvaluation {
        let t = &self.thresholds;
        let long = gate_passes(Side::Long, bar, t).then(|| EntrySignal {
            side: Side::Long,
            strength: long_strength(bar.acceleration, t.acceleration_threshold),
        });
        let short = gate_passes(Side::Short, bar, t).then(|| EntrySignal {
            side: Side::Short,
            strength: short_strength(bar.acceleration, t.acceleration_threshold),
        });
        SignalEvaluation { long, short }
    }
}
