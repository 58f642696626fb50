//! Exit state machine.
//!
//! Runs once per bar over every open position, before any entry logic.
//! Per position, in priority order:
//! 1. stop-loss (level inclusive): full close, no further rules this bar
//! 2. take-profit: close half (round-half-up, at least 1), seed the trailing stop
//! 3. trailing-stop breach: close the remainder
//! 4. otherwise ratchet the trailing stop by `trail_multiplier × ATR`
//!
//! Decisions are made in one pass over the positions; removals are applied
//! afterwards in a second pass.

use super::ratchet::{is_breached, ratchet_stop, trail_candidate};
use super::BarContext;
use crate::domain::{ExitKind, ExitRecord, Portfolio, Position, Side};
use crate::params::{EngineConstants, StrategyParams};
use tracing::debug;

/// Thresholds the exit rules read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitRules {
    pub cut_loss_threshold: f64,
    pub take_profit_threshold: f64,
    pub short_extra_profit: f64,
    pub fee_per_contract: f64,
    pub trail_multiplier: f64,
}

impl ExitRules {
    pub fn new(params: &StrategyParams, constants: &EngineConstants) -> Self {
        Self {
            cut_loss_threshold: params.cut_loss_threshold,
            take_profit_threshold: params.take_profit_threshold,
            short_extra_profit: params.short_extra_profit,
            fee_per_contract: constants.fee_per_contract,
            trail_multiplier: constants.trail_multiplier,
        }
    }

    /// Stop-loss level: `cut_loss_threshold` against the position.
    pub fn stop_loss_level(&self, side: Side, entry_price: f64) -> f64 {
        entry_price - side.sign() * self.cut_loss_threshold
    }

    /// True once price reaches the stop-loss level. The level itself counts.
    pub fn stop_loss_hit(&self, side: Side, entry_price: f64, price: f64) -> bool {
        let level = self.stop_loss_level(side, entry_price);
        match side {
            Side::Long => price <= level,
            Side::Short => price >= level,
        }
    }

    /// True once price reaches the take-profit trigger. Shorts need the
    /// extra `short_extra_profit` beyond the take-profit distance.
    pub fn take_profit_hit(&self, side: Side, entry_price: f64, price: f64) -> bool {
        match side {
            Side::Long => price >= entry_price + self.take_profit_threshold,
            Side::Short => {
                price <= entry_price - (self.take_profit_threshold + self.short_extra_profit)
            }
        }
    }

    /// Trailing stop level right after the partial exit.
    pub fn seed_trailing_stop(&self, side: Side, entry_price: f64) -> f64 {
        entry_price + side.sign() * self.take_profit_threshold
    }
}

/// Contracts closed by a partial take-profit: half, rounded half-up, at least 1.
pub fn partial_exit_contracts(contracts: u32) -> u32 {
    contracts.div_ceil(2).max(1)
}

/// Every close made on one bar and the P&L they realized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExitOutcome {
    pub records: Vec<ExitRecord>,
    pub realized_pnl: f64,
    pub closed_contracts: u32,
}

/// Apply the exit rules to every open position on one bar.
///
/// Realized P&L is booked into the portfolio and closed contracts are
/// released from the global count before this returns.
pub fn resolve_exits(portfolio: &mut Portfolio, ctx: &BarContext, rules: &ExitRules) -> ExitOutcome {
    let mut outcome = ExitOutcome::default();
    let mut to_remove = Vec::new();

    for (idx, pos) in portfolio.positions_mut().iter_mut().enumerate() {
        if step_position(pos, ctx, rules, &mut outcome.records) {
            to_remove.push(idx);
        }
    }

    for record in &outcome.records {
        outcome.realized_pnl += record.pnl;
        outcome.closed_contracts += record.contracts;
    }

    portfolio.remove_indices(&to_remove);
    portfolio.release_contracts(outcome.closed_contracts);
    portfolio.realize(outcome.realized_pnl);
    outcome
}

/// Run the four rules for one position. Returns true if the position is
/// now fully closed and must be removed.
fn step_position(
    pos: &mut Position,
    ctx: &BarContext,
    rules: &ExitRules,
    records: &mut Vec<ExitRecord>,
) -> bool {
    let side = pos.side;
    let price = ctx.price;

    // ─── 1. Stop-loss ───
    if rules.stop_loss_hit(side, pos.entry_price, price) {
        records.push(close(pos, ExitKind::StopLoss, pos.contracts, ctx, rules));
        return true;
    }

    // ─── 2. Partial take-profit ───
    if !pos.partially_exited && rules.take_profit_hit(side, pos.entry_price, price) {
        let closed = partial_exit_contracts(pos.contracts);
        records.push(close(pos, ExitKind::PartialTakeProfit, closed, ctx, rules));
        pos.contracts -= closed;
        pos.partially_exited = true;
        pos.trailing_stop = Some(rules.seed_trailing_stop(side, pos.entry_price));
        if pos.contracts == 0 {
            return true;
        }
    }

    // ─── 3/4. Trailing stop: breach or ratchet ───
    if pos.partially_exited {
        if let Some(stop) = pos.trailing_stop {
            if is_breached(side, price, stop) {
                records.push(close(pos, ExitKind::TrailingStop, pos.contracts, ctx, rules));
                return true;
            }
            let candidate = trail_candidate(side, price, rules.trail_multiplier * ctx.atr);
            pos.trailing_stop = Some(ratchet_stop(side, stop, candidate));
        }
    }

    false
}

fn close(
    pos: &Position,
    kind: ExitKind,
    contracts: u32,
    ctx: &BarContext,
    rules: &ExitRules,
) -> ExitRecord {
    let pnl = pos.realized_pnl(ctx.price, contracts, rules.fee_per_contract);
    debug!(
        bar = ctx.index,
        side = %pos.side,
        ?kind,
        contracts,
        entry = pos.entry_price,
        exit = ctx.price,
        pnl,
        "close"
    );
    ExitRecord {
        bar_index: ctx.index,
        timestamp: ctx.timestamp,
        side: pos.side,
        kind,
        contracts,
        entry_price: pos.entry_price,
        exit_price: ctx.price,
        pnl,
    }
}
