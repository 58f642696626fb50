//! Backtest runner — wires together loading, the engine, and metrics.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads the bars named in the config, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded bars. Used by the optimizer and tests.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use futlab_core::domain::ExitRecord;
use futlab_core::fingerprint::{ConfigHash, RunFingerprint};
use futlab_core::{run_backtest, BarRecord, EngineConstants, EngineError, StrategyParams};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_bars, LoadError, LoadOptions, LoadedData};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub fingerprint: RunFingerprint,
    pub params: StrategyParams,
    pub constants: EngineConstants,
    pub initial_asset_value: f64,
    pub metrics: PerformanceMetrics,
    pub records: Vec<BarRecord>,
    pub exits: Vec<ExitRecord>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub has_synthetic: bool,
    pub bar_count: usize,
    pub warmup_bars: usize,
    pub entries_opened: usize,
    pub entries_added: usize,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn final_cumulative_pnl(&self) -> f64 {
        self.metrics.final_cumulative_pnl
    }

    pub fn final_asset_value(&self) -> f64 {
        self.records
            .last()
            .map_or(self.initial_asset_value, |r| r.asset_value)
    }
}

/// Load the configured data and run one backtest.
pub fn run_single_backtest(
    config: &BacktestConfig,
    synthetic: bool,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let opts = LoadOptions {
        index_column: config.backtest.index_column.clone(),
        synthetic,
        ..LoadOptions::default()
    };
    let loaded = load_bars(&config.backtest.data_path, &opts)?;
    run_backtest_from_data(
        &loaded,
        &config.params,
        &config.constants,
        config.backtest.initial_asset_value,
    )
}

/// Run a backtest on pre-loaded data. No I/O.
pub fn run_backtest_from_data(
    data: &LoadedData,
    params: &StrategyParams,
    constants: &EngineConstants,
    initial_asset_value: f64,
) -> Result<BacktestResult, RunError> {
    let run = run_backtest(&data.bars, params, constants, initial_asset_value)?;
    let fingerprint = RunFingerprint::new(
        ConfigHash::of(params, constants, initial_asset_value),
        data.dataset_hash.clone(),
    );
    let metrics = PerformanceMetrics::from_run(&run, constants.fee_per_contract);

    info!(
        run = fingerprint.short_id(),
        bars = run.records.len(),
        closes = metrics.close_count,
        pnl = metrics.final_cumulative_pnl,
        synthetic = data.has_synthetic,
        "run complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        fingerprint,
        params: params.clone(),
        constants: constants.clone(),
        initial_asset_value,
        metrics,
        start: run.records.first().map(|r| r.timestamp),
        end: run.records.last().map(|r| r.timestamp),
        records: run.records,
        exits: run.exits,
        has_synthetic: data.has_synthetic,
        bar_count: run.bar_count,
        warmup_bars: run.warmup_bars,
        entries_opened: run.entries_opened,
        entries_added: run.entries_added,
    })
}
