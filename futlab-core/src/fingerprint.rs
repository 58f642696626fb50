//! Run fingerprinting — deterministic identification of backtest runs.
//!
//! - `ConfigHash`: params + constants + initial asset value.
//! - `DatasetHash`: content hash over every bar field.
//! - `RunFingerprint`: both, plus the run id derived from them.
//!
//! All hashes are BLAKE3 over canonical bytes, stable across builds and platforms.

use crate::domain::Bar;
use crate::params::{EngineConstants, StrategyParams};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// Hash of a run's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// Canonical serialization: the params map has sorted keys.
    pub fn of(params: &StrategyParams, constants: &EngineConstants, initial_asset_value: f64) -> Self {
        let canonical = json!({
            "params": params.to_map(),
            "constants": {
                "max_total_contracts": constants.max_total_contracts,
                "max_position_contracts": constants.max_position_contracts,
                "baseline_atr": constants.baseline_atr,
                "fee_per_contract": constants.fee_per_contract,
                "trail_multiplier": constants.trail_multiplier,
                "atr_window": constants.atr_window,
            },
            "initial_asset_value": initial_asset_value,
        });
        Self::from_bytes(canonical.to_string().as_bytes())
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content hash of a bar series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// Hash timestamps and the exact bit patterns of every numeric field.
    pub fn of(bars: &[Bar]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(bars.len() as u64).to_le_bytes());
        for bar in bars {
            hasher.update(&bar.timestamp.and_utc().timestamp().to_le_bytes());
            for v in [
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume,
                bar.index_price,
            ] {
                hasher.update(&v.to_bits().to_le_bytes());
            }
        }
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one run: same config on the same data gives the same run id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub run_id: String,
    pub config_hash: ConfigHash,
    pub dataset_hash: DatasetHash,
}

impl RunFingerprint {
    pub fn new(config_hash: ConfigHash, dataset_hash: DatasetHash) -> Self {
        let canonical = json!({
            "config_hash": &config_hash.0,
            "dataset_hash": &dataset_hash.0,
        });
        let run_id = blake3::hash(canonical.to_string().as_bytes())
            .to_hex()
            .to_string();
        Self {
            run_id,
            config_hash,
            dataset_hash,
        }
    }

    pub fn compute(
        bars: &[Bar],
        params: &StrategyParams,
        constants: &EngineConstants,
        initial_asset_value: f64,
    ) -> Self {
        Self::new(
            ConfigHash::of(params, constants, initial_asset_value),
            DatasetHash::of(bars),
        )
    }

    /// First 12 hex chars of the run id, for file names and log lines.
    pub fn short_id(&self) -> &str {
        &self.run_id[..12.min(self.run_id.len())]
    }
}
