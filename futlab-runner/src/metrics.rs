//! Performance metrics — pure functions over the asset curve and close log.
//!
//! The asset curve is the per-bar `asset_value` series, prefixed with the
//! initial asset value so the first bar's P&L counts. Closes are the
//! `ExitRecord`s of a run; a partial take-profit and the trailing-stop exit
//! of the same position count as two closes.

use futlab_core::domain::ExitRecord;
use futlab_core::RunResult;
use serde::{Deserialize, Serialize};

/// Aggregate performance metrics for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub final_cumulative_pnl: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    /// Mean over standard deviation of per-bar returns, not annualized.
    pub sharpe: f64,
    pub close_count: usize,
    pub contracts_closed: u64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub fees_paid: f64,
    pub max_consecutive_losses: usize,
}

impl PerformanceMetrics {
    pub fn compute(asset_curve: &[f64], closes: &[ExitRecord], fee_per_contract: f64) -> Self {
        let contracts_closed: u64 = closes.iter().map(|c| u64::from(c.contracts)).sum();
        Self {
            final_cumulative_pnl: closes.iter().map(|c| c.pnl).sum(),
            total_return: total_return(asset_curve),
            max_drawdown: max_drawdown(asset_curve),
            sharpe: sharpe_ratio(asset_curve),
            close_count: closes.len(),
            contracts_closed,
            win_rate: win_rate(closes),
            profit_factor: profit_factor(closes),
            fees_paid: contracts_closed as f64 * fee_per_contract,
            max_consecutive_losses: max_consecutive_losses(closes),
        }
    }

    /// Metrics for a finished run.
    pub fn from_run(run: &RunResult, fee_per_contract: f64) -> Self {
        let mut curve = Vec::with_capacity(run.records.len() + 1);
        curve.push(run.initial_asset_value);
        curve.extend(run.records.iter().map(|r| r.asset_value));
        let mut metrics = Self::compute(&curve, &run.exits, fee_per_contract);
        // The engine's running sum is authoritative.
        metrics.final_cumulative_pnl = run.final_cumulative_pnl;
        metrics
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(asset_curve: &[f64]) -> f64 {
    match (asset_curve.first(), asset_curve.last()) {
        (Some(&initial), Some(&last)) if asset_curve.len() >= 2 && initial > 0.0 => {
            (last - initial) / initial
        }
        _ => 0.0,
    }
}

/// Per-bar Sharpe: mean(bar returns) / std(bar returns).
///
/// Returns 0.0 if variance is zero or there are fewer than two returns.
pub fn sharpe_ratio(asset_curve: &[f64]) -> f64 {
    let returns = bar_returns(asset_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if the curve never falls below a previous peak.
pub fn max_drawdown(asset_curve: &[f64]) -> f64 {
    let Some(&first) = asset_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &value in asset_curve {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let dd = (value - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Fraction of closes with positive net P&L.
pub fn win_rate(closes: &[ExitRecord]) -> f64 {
    if closes.is_empty() {
        return 0.0;
    }
    let winners = closes.iter().filter(|c| c.is_win()).count();
    winners as f64 / closes.len() as f64
}

/// Gross profit / gross loss.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(closes: &[ExitRecord]) -> f64 {
    if closes.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = closes.iter().filter(|c| c.pnl > 0.0).map(|c| c.pnl).sum();
    let gross_loss: f64 = closes
        .iter()
        .filter(|c| c.pnl < 0.0)
        .map(|c| c.pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Longest run of non-winning closes.
pub fn max_consecutive_losses(closes: &[ExitRecord]) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for close in closes {
        if close.is_win() {
            current = 0;
        } else {
            current += 1;
            max_streak = max_streak.max(current);
        }
    }
    max_streak
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive curve points.
pub fn bar_returns(asset_curve: &[f64]) -> Vec<f64> {
    asset_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
