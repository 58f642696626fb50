//! Bar-by-bar driver — the heart of the backtesting engine.
//!
//! Three phases per bar, strictly in order:
//! 1. Exits: stop-loss, partial take-profit, trailing stop (books realized P&L)
//! 2. Entries: gated signals, sized and admitted against the caps
//! 3. Snapshot: asset / P&L row plus the primary position's side and entry
//!
//! Each run owns a fresh `Portfolio`; nothing is shared between runs.

use crate::domain::{Bar, FeatureBar, Portfolio};
use crate::params::{EngineConstants, StrategyParams};
use crate::position_management::{
    resolve_entries, resolve_exits, BarContext, EntryAction, ExitRules,
};
use crate::signals::SignalEvaluator;
use crate::sizers::ContractSizer;

use super::precompute::{build_features, FeatureSpec};
use super::state::{BarRecord, EngineError, RunResult};

use tracing::debug;

/// Run a backtest on raw bars.
///
/// This is the main entry point for the engine. It:
/// 1. Validates params and constants (fails before any bar is processed)
/// 2. Builds the feature series and drops warmup rows
/// 3. Runs the bar loop via [`simulate`]
pub fn run_backtest(
    bars: &[Bar],
    params: &StrategyParams,
    constants: &EngineConstants,
    initial_asset_value: f64,
) -> Result<RunResult, EngineError> {
    params.validate()?;
    constants.validate()?;
    if !initial_asset_value.is_finite() {
        return Err(EngineError::InitialAssetValue(initial_asset_value));
    }

    let spec = FeatureSpec::new(params, constants);
    let features = build_features(bars, &spec)?;

    debug!(
        bars = bars.len(),
        warmup = features.warmup_bars,
        simulated = features.bars.len(),
        "backtest start"
    );

    let mut result = simulate(&features.bars, params, constants, initial_asset_value);
    result.warmup_bars = features.warmup_bars;
    result.bar_count = bars.len();

    debug!(
        exits = result.exits.len(),
        opened = result.entries_opened,
        final_cumulative_pnl = result.final_cumulative_pnl,
        "backtest finished"
    );
    Ok(result)
}

/// Run the bar loop over an already-built feature series.
///
/// Params and constants are assumed valid. Deterministic: the same inputs
/// always produce the same `RunResult`.
pub fn simulate(
    features: &[FeatureBar],
    params: &StrategyParams,
    constants: &EngineConstants,
    initial_asset_value: f64,
) -> RunResult {
    let evaluator = SignalEvaluator::new(params);
    let sizer = ContractSizer::new(constants);
    let exit_rules = ExitRules::new(params, constants);

    let mut portfolio = Portfolio::new(initial_asset_value);
    let mut records = Vec::with_capacity(features.len());
    let mut exits = Vec::new();
    let mut entries_opened = 0;
    let mut entries_added = 0;

    for (t, fb) in features.iter().enumerate() {
        let ctx = BarContext::new(t, fb);

        // ─── Phase 1: exits ───
        let outcome = resolve_exits(&mut portfolio, &ctx, &exit_rules);
        let bar_pnl = outcome.realized_pnl;
        exits.extend(outcome.records);

        // ─── Phase 2: entries ───
        let signals = evaluator.evaluate(fb);
        for action in resolve_entries(&mut portfolio, &signals, &ctx, &sizer) {
            match action {
                EntryAction::Opened { .. } => entries_opened += 1,
                EntryAction::Added { .. } => entries_added += 1,
                EntryAction::Blocked { .. } | EntryAction::Capped { .. } => {}
            }
        }

        debug_assert!(portfolio.total_open_contracts() <= constants.max_total_contracts);
        debug_assert_eq!(portfolio.total_open_contracts(), portfolio.held_contracts());

        // ─── Phase 3: snapshot ───
        let primary = portfolio.primary();
        records.push(BarRecord {
            timestamp: fb.bar.timestamp,
            asset_value: portfolio.asset_value(),
            pnl: bar_pnl,
            cumulative_pnl: portfolio.cumulative_pnl(),
            position: primary.map(|p| p.side),
            entry_price: primary.map(|p| p.entry_price),
            open_contracts: portfolio.total_open_contracts(),
        });
    }

    debug!(
        bars = features.len(),
        open_at_end = portfolio.total_open_contracts(),
        "bar loop done"
    );

    RunResult {
        records,
        exits,
        warmup_bars: 0,
        bar_count: features.len(),
        entries_opened,
        entries_added,
        initial_asset_value,
        final_asset_value: portfolio.asset_value(),
        final_cumulative_pnl: portfolio.cumulative_pnl(),
    }
}
