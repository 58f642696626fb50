//! Look-ahead contamination tests.
//!
//! Invariant: nothing computed for bar t may depend on bar t+1 or later.
//!
//! Method: run on a truncated series (bars 0..150) and the full series
//! (bars 0..300). Everything the truncated run produced must be identical in
//! the full run. Any difference means future data leaked into the past.

use chrono::NaiveDate;
use futlab_core::domain::Bar;
use futlab_core::engine::{build_features, FeatureSpec};
use futlab_core::indicators::Indicator;
use futlab_core::{run_backtest, EngineConstants, StrategyParams};

/// Deterministic pseudo-random walk with an index that mostly tracks price.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let t0 = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let mut price = 1200.0;
    let mut index = 1190.0;

    (0..n)
        .map(|i| {
            let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
            let change = ((seed % 200) as f64 - 100.0) * 0.03;
            price += change;
            index += change * 0.9 + ((seed % 7) as f64 - 3.0) * 0.1;

            let open = price - 0.4;
            let close = price + 0.2;
            Bar {
                timestamp: t0 + chrono::Duration::minutes(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 500.0 + (seed % 1000) as f64,
                index_price: index,
            }
        })
        .collect()
}

fn params() -> StrategyParams {
    StrategyParams {
        sma_window_length: 20,
        momentum_lookback: 3,
        acceleration_threshold: 0.3,
        short_acceleration_threshold: 0.1,
        quantity_window: 5,
        quantity_multiply: 0.0,
        rsi_window: 10,
        ..StrategyParams::default()
    }
}

fn assert_same_prefix(name: &str, truncated: &[f64], full: &[f64]) {
    for (i, (t, f)) in truncated.iter().zip(full).enumerate() {
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            (t - f).abs() < 1e-10,
            "{name}: look-ahead contamination at bar {i}: truncated={t}, full={f}"
        );
    }
}

#[test]
fn lookahead_feature_indicators() {
    let bars = make_test_bars(300);
    let spec = FeatureSpec::new(&params(), &EngineConstants::default());
    for indicator in spec.indicators() {
        let truncated = indicator.compute(&bars[..150]);
        let full = indicator.compute(&bars);
        assert_eq!(truncated.len(), 150, "{}", indicator.name());
        assert_eq!(full.len(), 300, "{}", indicator.name());
        assert_same_prefix(indicator.name(), &truncated, &full);
    }
}

#[test]
fn lookahead_feature_series() {
    let bars = make_test_bars(300);
    let spec = FeatureSpec::new(&params(), &EngineConstants::default());
    let truncated = build_features(&bars[..150], &spec).unwrap();
    let full = build_features(&bars, &spec).unwrap();
    assert_eq!(truncated.warmup_bars, full.warmup_bars);
    assert_eq!(truncated.bars[..], full.bars[..truncated.bars.len()]);
}

#[test]
fn lookahead_bar_loop() {
    let bars = make_test_bars(300);
    let c = EngineConstants::default();
    let truncated = run_backtest(&bars[..150], &params(), &c, 10_000.0).unwrap();
    let full = run_backtest(&bars, &params(), &c, 10_000.0).unwrap();

    assert!(!truncated.records.is_empty());
    assert_eq!(
        truncated.records[..],
        full.records[..truncated.records.len()]
    );
    let n = truncated.exits.len();
    assert_eq!(truncated.exits[..], full.exits[..n]);
}
