//! Relative Strength Index (RSI), rolling-mean variant.
//!
//! avg_gain / avg_loss are simple rolling means of close-to-close gains and
//! losses. The first bar has no previous close; its change counts as zero.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period - 1.
//! Edge case: avg_loss == 0 → RSI = 100 (flat windows included).

use super::sma::rolling_mean;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut gains = vec![0.0; n];
        let mut losses = vec![0.0; n];
        for i in 1..n {
            let change = bars[i].close - bars[i - 1].close;
            if change.is_nan() {
                gains[i] = f64::NAN;
                losses[i] = f64::NAN;
            } else {
                gains[i] = change.max(0.0);
                losses[i] = (-change).max(0.0);
            }
        }

        let avg_gain = rolling_mean(&gains, self.period);
        let avg_loss = rolling_mean(&losses, self.period);

        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&g, &l)| rsi_from_averages(g, l))
            .collect()
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        return f64::NAN;
    }
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn rsi_all_gains_is_100() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let result = Rsi::new(3).compute(&bars);
        assert!(result[1].is_nan());
        assert_eq!(result[2], 100.0);
        assert_eq!(result[4], 100.0);
    }

    #[test]
    fn rsi_flat_window_is_100_not_nan() {
        let bars = make_bars(&[10.0, 10.0, 10.0, 10.0]);
        let result = Rsi::new(3).compute(&bars);
        assert_eq!(result[3], 100.0);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let bars = make_bars(&[5.0, 4.0, 3.0, 2.0]);
        let result = Rsi::new(2).compute(&bars);
        assert_approx(result[2], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_mixed_window() {
        // changes: 0, +2, -1, +1 ; window 3 at index 3: gains 2,0,1 losses 0,1,0
        let bars = make_bars(&[10.0, 12.0, 11.0, 12.0]);
        let result = Rsi::new(3).compute(&bars);
        let rs = (3.0 / 3.0) / (1.0 / 3.0);
        assert_approx(result[3], 100.0 - 100.0 / (1.0 + rs), DEFAULT_EPSILON);
        assert_approx(result[3], 75.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_first_value_counts_first_change_as_zero() {
        // window 2 at index 1: gains 0 (first bar), 3 ; losses 0, 0
        let bars = make_bars(&[10.0, 13.0]);
        let result = Rsi::new(2).compute(&bars);
        assert_eq!(result[1], 100.0);
    }
}
