//! Integration tests for the bar loop.
//!
//! Tests:
//! 1. Full lifecycle: open → partial take-profit → trailing-stop exit, with per-bar records.
//! 2. Stop-loss P&L lands in the same bar's record.
//! 3. Direction guard and caps seen through the driver.
//! 4. Snapshot reports the primary position.
//! 5. Raw-bar entry point: warmup truncation, determinism, error paths.

use chrono::{NaiveDate, NaiveDateTime};
use futlab_core::domain::{Bar, ExitKind, FeatureBar, Side};
use futlab_core::engine::{run_backtest, simulate, EngineError, FeatureError};
use futlab_core::{EngineConstants, StrategyParams};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Mood {
    Neutral,
    Bullish,
    Bearish,
}

fn ts(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 6)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
        + chrono::Duration::minutes(i as i64)
}

fn params() -> StrategyParams {
    StrategyParams {
        acceleration_threshold: 0.5,
        short_acceleration_threshold: 0.2,
        quantity_multiply: 1.0,
        sma_gap: 0.01,
        rsi_threshold: 20.0,
        take_profit_threshold: 5.0,
        cut_loss_threshold: 3.0,
        short_extra_profit: 1.0,
        ..StrategyParams::default()
    }
}

/// Feature bar at `close` whose features make the given gate pass (or neither).
fn fb(i: usize, close: f64, mood: Mood) -> FeatureBar {
    let (acc, idx, ratio, short_acc, rsi, volume) = match mood {
        Mood::Neutral => (0.0, 0.0, 1.0, 0.0, 50.0, 100.0),
        Mood::Bullish => (1.0, 2.0, 0.98, 0.3, 25.0, 150.0),
        Mood::Bearish => (-1.0, -2.0, 1.02, -0.3, 75.0, 150.0),
    };
    FeatureBar {
        bar: Bar {
            timestamp: ts(i),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume,
            index_price: 1000.0,
        },
        sma: close / ratio,
        price_sma_ratio: ratio,
        acceleration: acc,
        short_acceleration: short_acc,
        index_acceleration: idx,
        rsi,
        atr: 1.0,
        average_volume: 100.0,
    }
}

fn series(steps: &[(f64, Mood)]) -> Vec<FeatureBar> {
    steps
        .iter()
        .enumerate()
        .map(|(i, &(close, mood))| fb(i, close, mood))
        .collect()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "actual={actual}, expected={expected}"
    );
}

// ──────────────────────────────────────────────
// Lifecycle
// ──────────────────────────────────────────────

#[test]
fn long_lifecycle_partial_then_trailing_exit() {
    let bars = series(&[
        (100.0, Mood::Bullish),
        (106.0, Mood::Neutral),
        (104.0, Mood::Neutral),
    ]);
    let r = simulate(&bars, &params(), &EngineConstants::default(), 10_000.0);

    // Bar 0: opens 10 long at 100 (strength 1, ATR at baseline).
    assert_eq!(r.records[0].position, Some(Side::Long));
    assert_eq!(r.records[0].entry_price, Some(100.0));
    assert_eq!(r.records[0].open_contracts, 10);
    assert_eq!(r.records[0].pnl, 0.0);

    // Bar 1: partial exit of 5 at 106.
    assert_close(r.records[1].pnl, 6.0 * 5.0 - 0.47 * 5.0);
    assert_eq!(r.records[1].open_contracts, 5);
    assert_eq!(r.exits[0].kind, ExitKind::PartialTakeProfit);

    // Bar 2: 104 breaches the trailing stop at 105.
    assert_eq!(r.exits[1].kind, ExitKind::TrailingStop);
    assert_close(r.records[2].pnl, 4.0 * 5.0 - 0.47 * 5.0);
    assert_eq!(r.records[2].position, None);
    assert_eq!(r.records[2].entry_price, None);
    assert_eq!(r.records[2].open_contracts, 0);

    let total = r.records[1].pnl + r.records[2].pnl;
    assert_close(r.final_cumulative_pnl, total);
    assert_close(r.final_asset_value, 10_000.0 + total);
    assert_close(r.records[2].cumulative_pnl, total);
    assert_close(r.records[2].asset_value, 10_000.0 + total);
    assert_eq!(r.entries_opened, 1);
}

#[test]
fn stop_loss_pnl_lands_in_same_bar() {
    let bars = series(&[(100.0, Mood::Bullish), (96.0, Mood::Neutral)]);
    let r = simulate(&bars, &params(), &EngineConstants::default(), 10_000.0);
    assert_eq!(r.exits.len(), 1);
    assert_eq!(r.exits[0].kind, ExitKind::StopLoss);
    assert_close(r.records[1].pnl, -4.0 * 10.0 - 0.47 * 10.0);
    assert_eq!(r.records[1].open_contracts, 0);
}

#[test]
fn entries_do_not_move_asset_value() {
    let bars = series(&[(100.0, Mood::Bullish), (100.5, Mood::Bullish)]);
    let r = simulate(&bars, &params(), &EngineConstants::default(), 10_000.0);
    for rec in &r.records {
        assert_eq!(rec.asset_value, 10_000.0);
        assert_eq!(rec.pnl, 0.0);
    }
}

// ──────────────────────────────────────────────
// Guard and caps
// ──────────────────────────────────────────────

#[test]
fn short_primary_blocks_long_entries() {
    let bars = series(&[
        (100.0, Mood::Bearish),
        (100.5, Mood::Bullish),
        (100.2, Mood::Bullish),
    ]);
    let r = simulate(&bars, &params(), &EngineConstants::default(), 10_000.0);
    for rec in &r.records {
        assert_eq!(rec.position, Some(Side::Short));
        assert_eq!(rec.entry_price, Some(100.0));
    }
    assert_eq!(r.entries_opened, 1);
}

#[test]
fn repeated_signals_never_exceed_position_cap() {
    let steps: Vec<(f64, Mood)> = (0..20).map(|_| (100.0, Mood::Bullish)).collect();
    let r = simulate(&series(&steps), &params(), &EngineConstants::default(), 10_000.0);
    assert!(r.records.iter().all(|rec| rec.open_contracts == 10));
    assert_eq!(r.entries_opened, 1);
    assert_eq!(r.entries_added, 0);
}

#[test]
fn global_cap_limits_new_positions() {
    let constants = EngineConstants {
        max_total_contracts: 3,
        ..EngineConstants::default()
    };
    let bars = series(&[(100.0, Mood::Bullish), (100.0, Mood::Bullish)]);
    let r = simulate(&bars, &params(), &constants, 10_000.0);
    assert_eq!(r.records[0].open_contracts, 3);
    assert_eq!(r.records[1].open_contracts, 3);
}

#[test]
fn additions_are_admitted_after_partial_exit() {
    // Partial exit frees 5 contracts; the next bullish bar tops the position back up to 10.
    let bars = series(&[(100.0, Mood::Bullish), (106.0, Mood::Bullish)]);
    let r = simulate(&bars, &params(), &EngineConstants::default(), 10_000.0);
    assert_eq!(r.records[1].open_contracts, 10);
    assert_eq!(r.records[1].entry_price, Some(100.0));
    assert_eq!(r.entries_added, 1);
}

// ──────────────────────────────────────────────
// Raw-bar entry point
// ──────────────────────────────────────────────

fn raw_bars(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            let close = 1200.0 + (x * 0.21).sin() * 6.0 + (x * 0.05).cos() * 3.0;
            let open = close - (x * 0.4).sin();
            Bar {
                timestamp: ts(i),
                open,
                high: open.max(close) + 0.8,
                low: open.min(close) - 0.8,
                close,
                volume: 500.0 + ((x * 0.9).sin() * 300.0).abs(),
                index_price: 1195.0 + (x * 0.19).sin() * 5.0,
            }
        })
        .collect()
}

fn small_window_params() -> StrategyParams {
    StrategyParams {
        sma_window_length: 10,
        momentum_lookback: 3,
        quantity_window: 5,
        rsi_window: 7,
        ..params()
    }
}

#[test]
fn warmup_rows_are_absent_from_output() {
    let bars = raw_bars(100);
    let r = run_backtest(&bars, &small_window_params(), &EngineConstants::default(), 10_000.0)
        .unwrap();
    // ATR(14) has the longest lookback: 13.
    assert_eq!(r.warmup_bars, 13);
    assert_eq!(r.bar_count, 100);
    assert_eq!(r.records.len(), 87);
    assert_eq!(r.records[0].timestamp, bars[13].timestamp);
}

#[test]
fn reruns_are_identical() {
    let bars = raw_bars(400);
    let p = small_window_params();
    let c = EngineConstants::default();
    let a = run_backtest(&bars, &p, &c, 10_000.0).unwrap();
    let b = run_backtest(&bars, &p, &c, 10_000.0).unwrap();
    assert_eq!(a, b);
}

#[test]
fn short_series_yields_empty_output() {
    let bars = raw_bars(10);
    let r = run_backtest(&bars, &small_window_params(), &EngineConstants::default(), 10_000.0)
        .unwrap();
    assert!(r.records.is_empty());
    assert_eq!(r.final_cumulative_pnl, 0.0);
    assert_eq!(r.final_asset_value, 10_000.0);
}

#[test]
fn nan_price_aborts_run() {
    let mut bars = raw_bars(50);
    bars[20].close = f64::NAN;
    let err = run_backtest(&bars, &small_window_params(), &EngineConstants::default(), 10_000.0)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Data(FeatureError::NonFiniteInput {
            index: 20,
            field: "close"
        })
    );
}

#[test]
fn non_positive_window_fails_fast() {
    let p = StrategyParams {
        rsi_window: 0,
        ..small_window_params()
    };
    let err = run_backtest(&raw_bars(50), &p, &EngineConstants::default(), 10_000.0).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
}
