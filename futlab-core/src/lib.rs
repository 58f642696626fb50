//! FutLab Core — engine, domain types, indicators, signals, sizing, position ledger.
//!
//! This crate contains the heart of the futures backtester:
//! - Domain types (bars, feature bars, positions, portfolio, close records)
//! - Indicator precompute with warmup truncation
//! - Six-condition entry gates and signal strength
//! - Volatility-scaled sizing with a global contract cap
//! - Exit and entry state machines over the portfolio
//! - Bar-by-bar driver producing one record per bar

pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod indicators;
pub mod params;
pub mod position_management;
pub mod signals;
pub mod sizers;

pub use engine::{run_backtest, simulate, BarRecord, EngineError, RunResult};
pub use params::{EngineConstants, ParamError, StrategyParams};
