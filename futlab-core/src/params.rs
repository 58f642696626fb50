//! Strategy parameters and engine constants.
//!
//! `StrategyParams` is the twelve-knob record the optimizer searches over.
//! `EngineConstants` holds the instrument-level constants that used to be
//! global: they are passed explicitly to every run so that independent runs
//! never share mutable state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Parameter names in canonical order.
pub const PARAM_NAMES: [&str; 12] = [
    "sma_window_length",
    "sma_gap",
    "momentum_lookback",
    "acceleration_threshold",
    "short_acceleration_threshold",
    "take_profit_threshold",
    "cut_loss_threshold",
    "quantity_window",
    "quantity_multiply",
    "short_extra_profit",
    "rsi_window",
    "rsi_threshold",
];

/// Error building or validating a parameter record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("missing parameter '{0}'")]
    Missing(String),

    #[error("unknown parameter '{0}'")]
    Unknown(String),

    #[error("parameter '{name}' must be a whole number, got {value}")]
    NotInteger { name: String, value: f64 },

    #[error("window '{name}' must be >= 1, got {value}")]
    NonPositiveWindow { name: String, value: f64 },

    #[error("parameter '{name}' must be > 0, got {value}")]
    NonPositive { name: String, value: f64 },

    #[error("parameter '{name}' must be finite, got {value}")]
    NonFinite { name: String, value: f64 },
}

/// The strategy's tunable parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyParams {
    pub sma_window_length: usize,
    pub sma_gap: f64,
    pub momentum_lookback: usize,
    pub acceleration_threshold: f64,
    pub short_acceleration_threshold: f64,
    pub take_profit_threshold: f64,
    pub cut_loss_threshold: f64,
    pub quantity_window: usize,
    pub quantity_multiply: f64,
    pub short_extra_profit: f64,
    pub rsi_window: usize,
    pub rsi_threshold: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            sma_window_length: 50,
            sma_gap: 0.01,
            momentum_lookback: 5,
            acceleration_threshold: 0.5,
            short_acceleration_threshold: 0.2,
            take_profit_threshold: 3.0,
            cut_loss_threshold: 1.5,
            quantity_window: 10,
            quantity_multiply: 1.0,
            short_extra_profit: 0.5,
            rsi_window: 14,
            rsi_threshold: 20.0,
        }
    }
}

impl StrategyParams {
    /// Build from a name → value map, as produced by the optimizer or read
    /// from a best-params JSON file. Every key in `PARAM_NAMES` is required;
    /// unrecognized keys are rejected.
    pub fn from_map(map: &BTreeMap<String, f64>) -> Result<Self, ParamError> {
        if let Some(unknown) = map.keys().find(|k| !PARAM_NAMES.contains(&k.as_str())) {
            return Err(ParamError::Unknown(unknown.clone()));
        }

        let get = |name: &str| -> Result<f64, ParamError> {
            map.get(name)
                .copied()
                .ok_or_else(|| ParamError::Missing(name.to_string()))
        };
        let window = |name: &str| -> Result<usize, ParamError> {
            let value = get(name)?;
            if !value.is_finite() {
                return Err(ParamError::NonFinite {
                    name: name.to_string(),
                    value,
                });
            }
            if value.fract() != 0.0 {
                return Err(ParamError::NotInteger {
                    name: name.to_string(),
                    value,
                });
            }
            if value < 1.0 {
                return Err(ParamError::NonPositiveWindow {
                    name: name.to_string(),
                    value,
                });
            }
            Ok(value as usize)
        };

        let params = Self {
            sma_window_length: window("sma_window_length")?,
            sma_gap: get("sma_gap")?,
            momentum_lookback: window("momentum_lookback")?,
            acceleration_threshold: get("acceleration_threshold")?,
            short_acceleration_threshold: get("short_acceleration_threshold")?,
            take_profit_threshold: get("take_profit_threshold")?,
            cut_loss_threshold: get("cut_loss_threshold")?,
            quantity_window: window("quantity_window")?,
            quantity_multiply: get("quantity_multiply")?,
            short_extra_profit: get("short_extra_profit")?,
            rsi_window: window("rsi_window")?,
            rsi_threshold: get("rsi_threshold")?,
        };
        params.validate()?;
        Ok(params)
    }

    /// Flatten to a sorted map. Windows become whole-number floats.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        map.insert("sma_window_length".into(), self.sma_window_length as f64);
        map.insert("sma_gap".into(), self.sma_gap);
        map.insert("momentum_lookback".into(), self.momentum_lookback as f64);
        map.insert("acceleration_threshold".into(), self.acceleration_threshold);
        map.insert(
            "short_acceleration_threshold".into(),
            self.short_acceleration_threshold,
        );
        map.insert("take_profit_threshold".into(), self.take_profit_threshold);
        map.insert("cut_loss_threshold".into(), self.cut_loss_threshold);
        map.insert("quantity_window".into(), self.quantity_window as f64);
        map.insert("quantity_multiply".into(), self.quantity_multiply);
        map.insert("short_extra_profit".into(), self.short_extra_profit);
        map.insert("rsi_window".into(), self.rsi_window as f64);
        map.insert("rsi_threshold".into(), self.rsi_threshold);
        map
    }

    /// Check windows are >= 1, every value is finite, and the acceleration
    /// threshold (a divisor in signal strength) is positive.
    pub fn validate(&self) -> Result<(), ParamError> {
        for (name, value) in [
            ("sma_window_length", self.sma_window_length),
            ("momentum_lookback", self.momentum_lookback),
            ("quantity_window", self.quantity_window),
            ("rsi_window", self.rsi_window),
        ] {
            if value == 0 {
                return Err(ParamError::NonPositiveWindow {
                    name: name.to_string(),
                    value: 0.0,
                });
            }
        }

        for (name, value) in [
            ("sma_gap", self.sma_gap),
            ("acceleration_threshold", self.acceleration_threshold),
            (
                "short_acceleration_threshold",
                self.short_acceleration_threshold,
            ),
            ("take_profit_threshold", self.take_profit_threshold),
            ("cut_loss_threshold", self.cut_loss_threshold),
            ("quantity_multiply", self.quantity_multiply),
            ("short_extra_profit", self.short_extra_profit),
            ("rsi_threshold", self.rsi_threshold),
        ] {
            if !value.is_finite() {
                return Err(ParamError::NonFinite {
                    name: name.to_string(),
                    value,
                });
            }
        }

        if self.acceleration_threshold <= 0.0 {
            return Err(ParamError::NonPositive {
                name: "acceleration_threshold".to_string(),
                value: self.acceleration_threshold,
            });
        }
        Ok(())
    }
}

/// Instrument-level constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConstants {
    /// Global cap on open contracts across all positions.
    pub max_total_contracts: u32,
    /// Cap on contracts in any single position.
    pub max_position_contracts: u32,
    /// Reference ATR the sizer compares current volatility against.
    pub baseline_atr: f64,
    /// Fee charged per contract on every close.
    pub fee_per_contract: f64,
    /// Trailing distance in ATRs.
    pub trail_multiplier: f64,
    pub atr_window: usize,
}

impl Default for EngineConstants {
    fn default() -> Self {
        Self {
            max_total_contracts: 45,
            max_position_contracts: 10,
            baseline_atr: 1.0,
            fee_per_contract: 0.47,
            trail_multiplier: 1.5,
            atr_window: 14,
        }
    }
}

impl EngineConstants {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.max_total_contracts == 0 {
            return Err(ParamError::NonPositive {
                name: "max_total_contracts".to_string(),
                value: 0.0,
            });
        }
        if self.max_position_contracts == 0 {
            return Err(ParamError::NonPositive {
                name: "max_position_contracts".to_string(),
                value: 0.0,
            });
        }
        if self.atr_window == 0 {
            return Err(ParamError::NonPositiveWindow {
                name: "atr_window".to_string(),
                value: 0.0,
            });
        }
        for (name, value) in [
            ("baseline_atr", self.baseline_atr),
            ("fee_per_contract", self.fee_per_contract),
            ("trail_multiplier", self.trail_multiplier),
        ] {
            if !value.is_finite() {
                return Err(ParamError::NonFinite {
                    name: name.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_roundtrip_preserves_params() {
        let params = StrategyParams::default();
        let back = StrategyParams::from_map(&params.to_map()).unwrap();
        assert_eq!(params, back);
    }

    #[test]
    fn missing_key_is_named() {
        let mut map = StrategyParams::default().to_map();
        map.remove("rsi_window");
        assert_eq!(
            StrategyParams::from_map(&map),
            Err(ParamError::Missing("rsi_window".into()))
        );
    }

    #[test]
    fn unknown_key_rejected() {
        let mut map = StrategyParams::default().to_map();
        map.insert("rsi_windw".into(), 14.0);
        assert!(matches!(
            StrategyParams::from_map(&map),
            Err(ParamError::Unknown(k)) if k == "rsi_windw"
        ));
    }

    #[test]
    fn zero_and_fractional_windows_rejected() {
        let mut map = StrategyParams::default().to_map();
        map.insert("quantity_window".into(), 0.0);
        assert!(matches!(
            StrategyParams::from_map(&map),
            Err(ParamError::NonPositiveWindow { .. })
        ));

        map.insert("quantity_window".into(), 7.5);
        assert!(matches!(
            StrategyParams::from_map(&map),
            Err(ParamError::NotInteger { .. })
        ));
    }

    #[test]
    fn acceleration_threshold_must_be_positive() {
        let params = StrategyParams {
            acceleration_threshold: 0.0,
            ..StrategyParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ParamError::NonPositive { .. })
        ));
    }

    #[test]
    fn default_constants() {
        let c = EngineConstants::default();
        assert_eq!(c.max_total_contracts, 45);
        assert_eq!(c.max_position_contracts, 10);
        assert_eq!(c.fee_per_contract, 0.47);
        assert_eq!(c.trail_multiplier, 1.5);
        assert_eq!(c.atr_window, 14);
        assert!(c.validate().is_ok());
    }
}
