//! Simple Moving Average (SMA) over a selectable bar field.
//!
//! Rolling mean over a lookback window. The same indicator serves the close
//! SMA and the average-volume feature.
//! Lookback: period - 1 (first valid value at index period-1).

use super::{Indicator, Source};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    source: Source,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self::of(Source::Close, period)
    }

    pub fn of(source: Source, period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            source,
            name: format!("sma_{}_{period}", source.label()),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let values: Vec<f64> = bars.iter().map(|b| self.source.value(b)).collect();
        rolling_mean(&values, self.period)
    }
}

/// Rolling mean with a full window. Any NaN inside a window makes that
/// output NaN; the first `period - 1` outputs are NaN.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let mut sum = 0.0;
    let mut nan_count = 0usize;
    for (i, &entering) in values.iter().enumerate() {
        if entering.is_nan() {
            nan_count += 1;
        } else {
            sum += entering;
        }

        if i >= period {
            let leaving = values[i - period];
            if leaving.is_nan() {
                nan_count -= 1;
            } else {
                sum -= leaving;
            }
        }

        if i + 1 >= period && nan_count == 0 {
            result[i] = sum / period as f64;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn sma_basic() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let result = Sma::new(3).compute(&bars);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
        assert_approx(result[4], 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_of_volume() {
        let mut bars = make_bars(&[10.0, 10.0, 10.0]);
        bars[0].volume = 100.0;
        bars[1].volume = 200.0;
        bars[2].volume = 600.0;
        let sma = Sma::of(Source::Volume, 2);
        assert_eq!(sma.name(), "sma_volume_2");
        let result = sma.compute(&bars);
        assert!(result[0].is_nan());
        assert_approx(result[1], 150.0, DEFAULT_EPSILON);
        assert_approx(result[2], 400.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_period_one_is_identity() {
        let bars = make_bars(&[5.0, 7.0]);
        let result = Sma::new(1).compute(&bars);
        assert_eq!(result, vec![5.0, 7.0]);
    }

    #[test]
    fn rolling_mean_nan_poisons_only_its_windows() {
        let result = rolling_mean(&[1.0, f64::NAN, 3.0, 5.0, 7.0], 2);
        assert!(result[1].is_nan());
        assert!(result[2].is_nan());
        assert_approx(result[3], 4.0, DEFAULT_EPSILON);
        assert_approx(result[4], 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_short_series_all_nan() {
        let bars = make_bars(&[1.0, 2.0]);
        assert!(Sma::new(3).compute(&bars).iter().all(|v| v.is_nan()));
    }
}
