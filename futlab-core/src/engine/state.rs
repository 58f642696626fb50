//! Engine output types and errors.

use crate::domain::{ExitRecord, Side};
use crate::params::ParamError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::precompute::FeatureError;

/// Why a run failed. A run either completes or fails before producing output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ParamError),

    #[error("data integrity: {0}")]
    Data(#[from] FeatureError),

    #[error("initial asset value must be finite, got {0}")]
    InitialAssetValue(f64),
}

/// End-of-bar snapshot. One per post-warmup bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    pub timestamp: NaiveDateTime,
    /// Asset value after this bar's exits.
    pub asset_value: f64,
    /// P&L realized on this bar.
    pub pnl: f64,
    pub cumulative_pnl: f64,
    /// Side of the primary position after entries.
    pub position: Option<Side>,
    /// Entry price of the primary position after entries.
    pub entry_price: Option<f64>,
    pub open_contracts: u32,
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub records: Vec<BarRecord>,
    /// Every full or partial close, in bar order.
    pub exits: Vec<ExitRecord>,
    /// Input bars dropped for insufficient indicator history.
    pub warmup_bars: usize,
    /// Number of input bars.
    pub bar_count: usize,
    /// New positions opened.
    pub entries_opened: usize,
    /// Size increases applied to existing positions.
    pub entries_added: usize,
    pub initial_asset_value: f64,
    pub final_asset_value: f64,
    pub final_cumulative_pnl: f64,
}

impl RunResult {
    /// The optimization objective. A run that processed no bars scores 0.
    pub fn objective(&self) -> f64 {
        self.final_cumulative_pnl
    }

    pub fn asset_curve(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.asset_value).collect()
    }
}
