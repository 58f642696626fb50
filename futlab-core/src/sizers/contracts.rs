//! Volatility-scaled contract sizer.

use crate::params::EngineConstants;

/// Above `HIGH_VOL_RATIO × baseline_atr` the base size is halved.
pub const HIGH_VOL_RATIO: f64 = 1.5;
/// Below `LOW_VOL_RATIO × baseline_atr` the base size is scaled up.
pub const LOW_VOL_RATIO: f64 = 0.5;
/// Scale-up factor in calm markets.
pub const LOW_VOL_SCALE: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContractSizer {
    baseline_atr: f64,
    max_position_contracts: u32,
    max_total_contracts: u32,
}

impl ContractSizer {
    pub fn new(constants: &EngineConstants) -> Self {
        Self {
            baseline_atr: constants.baseline_atr,
            max_position_contracts: constants.max_position_contracts,
            max_total_contracts: constants.max_total_contracts,
        }
    }

    pub fn max_position_contracts(&self) -> u32 {
        self.max_position_contracts
    }

    /// Contracts the signal asks for, in `1..=max_position_contracts`.
    ///
    /// base = round(strength × 10) clamped to [1, max]. High volatility halves
    /// the base (floor, at least 1); low volatility scales it by 1.2 (rounded,
    /// capped at max). Rounding is half-to-even.
    pub fn desired_contracts(&self, volatility: f64, strength: f64) -> u32 {
        let max = self.max_position_contracts;
        let base = clamp_round(strength * 10.0, 1, max);

        if volatility > HIGH_VOL_RATIO * self.baseline_atr {
            (base / 2).max(1)
        } else if volatility < LOW_VOL_RATIO * self.baseline_atr {
            clamp_round(f64::from(base) * LOW_VOL_SCALE, 1, max)
        } else {
            base
        }
    }

    /// `max(0, min(desired, cap - current_total))`: the only gate on the
    /// global contract cap. Consulted on every size increase.
    pub fn allowed_additional(&self, desired: u32, current_total: u32) -> u32 {
        desired.min(self.max_total_contracts.saturating_sub(current_total))
    }
}

fn clamp_round(value: f64, min: u32, max: u32) -> u32 {
    let rounded = value.round_ties_even();
    if rounded.is_nan() || rounded < f64::from(min) {
        min
    } else if rounded > f64::from(max) {
        max
    } else {
        rounded as u32
    }
}
