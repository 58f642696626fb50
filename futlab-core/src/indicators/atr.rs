//! Average True Range (ATR), rolling-mean variant.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR is the simple rolling mean of TR over `period` bars.
//! Lookback: period - 1 (TR[0] = high - low, so the first window is complete at period-1).

use super::sma::rolling_mean;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// Compute the True Range series from bars.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let hl = bar.high - bar.low;
            if i == 0 {
                return hl;
            }
            let pc = bars[i - 1].close;
            if hl.is_nan() || pc.is_nan() {
                return f64::NAN;
            }
            hl.max((bar.high - pc).abs()).max((bar.low - pc).abs())
        })
        .collect()
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rolling_mean(&true_range(bars), self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn true_range_uses_gap_to_previous_close() {
        let mut bars = make_bars(&[100.0, 100.0]);
        bars[0].high = 101.0;
        bars[0].low = 99.0;
        bars[1].high = 106.0;
        bars[1].low = 104.0;
        let tr = true_range(&bars);
        assert_approx(tr[0], 2.0, DEFAULT_EPSILON);
        assert_approx(tr[1], 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_constant_range() {
        // make_bars: high = max(open,close)+1, low = min(open,close)-1; flat closes → TR = 2
        let bars = make_bars(&[50.0; 6]);
        let result = Atr::new(3).compute(&bars);
        assert!(result[1].is_nan());
        for v in &result[2..] {
            assert_approx(*v, 2.0, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn atr_lookback_is_period_minus_one() {
        assert_eq!(Atr::new(14).lookback(), 13);
    }
}
