//! Backtesting engine — feature precompute plus the bar-by-bar driver.
//!
//! The engine consumes raw bars, builds the feature series once, then runs
//! the three-phase bar loop (exits, entries, snapshot).

pub mod loop_runner;
pub mod precompute;
pub mod state;

pub use loop_runner::{run_backtest, simulate};
pub use precompute::{build_features, compute_warmup, FeatureError, FeatureSeries, FeatureSpec};
pub use state::{BarRecord, EngineError, RunResult};
