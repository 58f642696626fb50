//! Entry state machine.
//!
//! Runs after exits on each bar. For each gated signal (long first, then
//! short):
//! - skip it if the primary position is on the opposite side;
//! - size it, then admit it against the global cap;
//! - add to the same-side position (clamped to the per-position cap, cost
//!   basis unchanged) or open a new one.
//!
//! The direction guard only inspects the primary position. It is kept as
//! that exact check and not widened to "any opposite position".

use super::BarContext;
use crate::domain::{Portfolio, Side};
use crate::signals::SignalEvaluation;
use crate::sizers::ContractSizer;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// What the ledger did with one gated signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EntryAction {
    Opened { side: Side, contracts: u32, price: f64 },
    Added { side: Side, contracts: u32 },
    /// The primary position is on the opposite side.
    Blocked { side: Side },
    /// No room under the global or per-position cap.
    Capped { side: Side },
}

/// Apply the gated signals for one bar to the portfolio.
pub fn resolve_entries(
    portfolio: &mut Portfolio,
    signals: &SignalEvaluation,
    ctx: &BarContext,
    sizer: &ContractSizer,
) -> Vec<EntryAction> {
    signals
        .in_order()
        .map(|signal| enter(portfolio, signal.side, signal.strength, ctx, sizer))
        .collect()
}

fn enter(
    portfolio: &mut Portfolio,
    side: Side,
    strength: f64,
    ctx: &BarContext,
    sizer: &ContractSizer,
) -> EntryAction {
    if portfolio.primary().is_some_and(|p| p.side == side.opposite()) {
        trace!(bar = ctx.index, %side, "entry blocked by opposite primary");
        return EntryAction::Blocked { side };
    }

    let desired = sizer.desired_contracts(ctx.atr, strength);
    let mut allowed = sizer.allowed_additional(desired, portfolio.total_open_contracts());

    match portfolio.position(side).map(|p| p.contracts) {
        Some(current) => {
            allowed = allowed.min(sizer.max_position_contracts().saturating_sub(current));
            if allowed > 0 && portfolio.add_contracts(side, allowed) {
                EntryAction::Added {
                    side,
                    contracts: allowed,
                }
            } else {
                EntryAction::Capped { side }
            }
        }
        None if allowed > 0 => {
            portfolio.open(side, ctx.price, allowed);
            EntryAction::Opened {
                side,
                contracts: allowed,
                price: ctx.price,
            }
        }
        None => EntryAction::Capped { side },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::EngineConstants;
    use crate::signals::EntrySignal;

    fn ctx(price: f64, atr: f64) -> BarContext {
        BarContext {
            index: 3,
            timestamp: chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            price,
            atr,
        }
    }

    fn long(strength: f64) -> SignalEvaluation {
        SignalEvaluation {
            long: Some(EntrySignal {
                side: Side::Long,
                strength,
            }),
            short: None,
        }
    }

    fn sizer() -> ContractSizer {
        ContractSizer::new(&EngineConstants::default())
    }

    #[test]
    fn opens_new_position_at_current_price() {
        let mut pf = Portfolio::new(10_000.0);
        let actions = resolve_entries(&mut pf, &long(0.37), &ctx(1250.0, 1.0), &sizer());
        assert_eq!(
            actions,
            vec![EntryAction::Opened {
                side: Side::Long,
                contracts: 4,
                price: 1250.0
            }]
        );
        assert_eq!(pf.total_open_contracts(), 4);
    }

    #[test]
    fn add_is_clamped_to_position_cap_and_keeps_entry_price() {
        let mut pf = Portfolio::new(10_000.0);
        pf.open(Side::Long, 1200.0, 8);
        let actions = resolve_entries(&mut pf, &long(1.0), &ctx(1250.0, 1.0), &sizer());
        assert_eq!(
            actions,
            vec![EntryAction::Added {
                side: Side::Long,
                contracts: 2
            }]
        );
        let pos = pf.position(Side::Long).unwrap();
        assert_eq!(pos.contracts, 10);
        assert_eq!(pos.entry_price, 1200.0);
    }

    #[test]
    fn full_position_is_capped() {
        let mut pf = Portfolio::new(10_000.0);
        pf.open(Side::Long, 1200.0, 10);
        let actions = resolve_entries(&mut pf, &long(1.0), &ctx(1250.0, 1.0), &sizer());
        assert_eq!(actions, vec![EntryAction::Capped { side: Side::Long }]);
        assert_eq!(pf.total_open_contracts(), 10);
    }

    #[test]
    fn opposite_primary_blocks_entry() {
        let mut pf = Portfolio::new(10_000.0);
        pf.open(Side::Short, 1260.0, 3);
        let actions = resolve_entries(&mut pf, &long(1.0), &ctx(1250.0, 1.0), &sizer());
        assert_eq!(actions, vec![EntryAction::Blocked { side: Side::Long }]);
        assert!(pf.position(Side::Long).is_none());
    }

    #[test]
    fn guard_ignores_opposite_position_behind_the_primary() {
        let mut pf = Portfolio::new(10_000.0);
        pf.open(Side::Long, 100.0, 2);
        pf.open(Side::Short, 101.0, 2);
        let both = SignalEvaluation {
            long: Some(EntrySignal {
                side: Side::Long,
                strength: 0.3,
            }),
            short: Some(EntrySignal {
                side: Side::Short,
                strength: 0.3,
            }),
        };
        let actions = resolve_entries(&mut pf, &both, &ctx(102.0, 1.0), &sizer());
        assert_eq!(
            actions,
            vec![
                EntryAction::Added {
                    side: Side::Long,
                    contracts: 3
                },
                EntryAction::Blocked { side: Side::Short },
            ]
        );

        let positions = pf.positions();
        assert_eq!(positions[0].side, Side::Long);
        assert_eq!(positions[0].contracts, 5);
        assert_eq!(positions[0].entry_price, 100.0);
        assert_eq!(positions[1].side, Side::Short);
        assert_eq!(positions[1].contracts, 2);
        assert_eq!(positions[1].entry_price, 101.0);
        assert_eq!(pf.total_open_contracts(), 7);
    }

    #[test]
    fn both_gates_long_wins_and_short_is_blocked() {
        let mut pf = Portfolio::new(10_000.0);
        let both = SignalEvaluation {
            long: Some(EntrySignal {
                side: Side::Long,
                strength: 0.5,
            }),
            short: Some(EntrySignal {
                side: Side::Short,
                strength: 0.5,
            }),
        };
        let actions = resolve_entries(&mut pf, &both, &ctx(1250.0, 1.0), &sizer());
        assert!(matches!(actions[0], EntryAction::Opened { side: Side::Long, .. }));
        assert_eq!(actions[1], EntryAction::Blocked { side: Side::Short });
        assert_eq!(pf.positions().len(), 1);
    }
}
