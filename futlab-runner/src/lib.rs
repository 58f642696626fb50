//! FutLab Runner — backtest orchestration on top of `futlab-core`.
//!
//! This crate provides:
//! - TOML run configuration
//! - CSV bar loading with a synthetic fallback for smoke runs
//! - Single-backtest runner with fingerprinting and metrics
//! - Parallel random-search parameter optimization
//! - JSON, CSV, and Markdown artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod optimize;
pub mod runner;

pub use config::{BacktestConfig, ConfigError};
pub use data_loader::{load_bars, DataSource, LoadError, LoadOptions, LoadedData};
pub use metrics::PerformanceMetrics;
pub use optimize::{
    load_best_params, optimize, save_best_params, OptimizationResult, OptimizeError, ParamRange,
    SearchSpace, Trial, TrialOutcome,
};
pub use runner::{run_backtest_from_data, run_single_backtest, BacktestResult, RunError};
