//! Momentum — lookback difference (not percentage) of a bar field.
//!
//! momentum[t] = x[t] - x[t-period]
//! Lookback: period.
//!
//! The engine calls this "acceleration": period `momentum_lookback` on close,
//! period 1 on close (short acceleration), and `momentum_lookback` on the
//! reference index.

use super::{Indicator, Source};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Momentum {
    period: usize,
    source: Source,
    name: String,
}

impl Momentum {
    pub fn new(period: usize) -> Self {
        Self::of(Source::Close, period)
    }

    pub fn of(source: Source, period: usize) -> Self {
        assert!(period >= 1, "Momentum period must be >= 1");
        Self {
            period,
            source,
            name: format!("momentum_{}_{period}", source.label()),
        }
    }
}

impl Indicator for Momentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        for i in self.period..n {
            let prev = self.source.value(&bars[i - self.period]);
            let curr = self.source.value(&bars[i]);
            result[i] = curr - prev;
        }

        result
    }
}
