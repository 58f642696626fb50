//! Ratchet invariant enforcement
//!
//! **Core Rule:** trailing stops may tighten, never loosen (even if ATR expands).
//!
//! - Long positions: the stop can only rise.
//! - Short positions: the stop can only fall.

use crate::domain::Side;

/// Apply the ratchet to a proposed stop level.
///
/// # Example
/// ```
/// use futlab_core::domain::Side;
/// use futlab_core::position_management::ratchet_stop;
///
/// // Tightening: 95 → 100 (allowed)
/// assert_eq!(ratchet_stop(Side::Long, 95.0, 100.0), 100.0);
/// // Loosening: 100 → 90 (blocked)
/// assert_eq!(ratchet_stop(Side::Long, 100.0, 90.0), 100.0);
/// ```
pub fn ratchet_stop(side: Side, current: f64, proposed: f64) -> f64 {
    match side {
        Side::Long => current.max(proposed),
        Side::Short => current.min(proposed),
    }
}

/// Stop level `distance` away from `price`, on the losing side of the trade.
pub fn trail_candidate(side: Side, price: f64, distance: f64) -> f64 {
    match side {
        Side::Long => price - distance,
        Side::Short => price + distance,
    }
}

/// True if `price` has crossed the stop against the position.
pub fn is_breached(side: Side, price: f64, stop: f64) -> bool {
    match side {
        Side::Long => price < stop,
        Side::Short => price > stop,
    }
}
