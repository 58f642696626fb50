//! Indicator precomputation and warmup truncation.
//!
//! All indicators are computed once before the bar loop begins. Rows before
//! the longest lookback are dropped, so the driver only ever sees bars whose
//! features are fully defined.

use crate::domain::{Bar, FeatureBar};
use crate::indicators::{Atr, Indicator, Momentum, Rsi, Sma, Source};
use crate::params::{EngineConstants, StrategyParams};
use thiserror::Error;
use tracing::debug;

/// Data-integrity failure while building features.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("bar {index}: non-finite {field}")]
    NonFiniteInput { index: usize, field: &'static str },

    #[error("bar {index}: feature {feature} is not finite after warmup")]
    NonFinite { index: usize, feature: &'static str },
}

/// The indicator set the strategy reads, sized from one parameter record.
#[derive(Debug, Clone)]
pub struct FeatureSpec {
    pub sma: Sma,
    pub average_volume: Sma,
    pub acceleration: Momentum,
    pub short_acceleration: Momentum,
    pub index_acceleration: Momentum,
    pub rsi: Rsi,
    pub atr: Atr,
}

impl FeatureSpec {
    /// Windows must already be validated (>= 1).
    pub fn new(params: &StrategyParams, constants: &EngineConstants) -> Self {
        Self {
            sma: Sma::of(Source::Close, params.sma_window_length),
            average_volume: Sma::of(Source::Volume, params.quantity_window),
            acceleration: Momentum::of(Source::Close, params.momentum_lookback),
            short_acceleration: Momentum::of(Source::Close, 1),
            index_acceleration: Momentum::of(Source::Index, params.momentum_lookback),
            rsi: Rsi::new(params.rsi_window),
            atr: Atr::new(constants.atr_window),
        }
    }

    pub fn indicators(&self) -> [&dyn Indicator; 7] {
        [
            &self.sma,
            &self.average_volume,
            &self.acceleration,
            &self.short_acceleration,
            &self.index_acceleration,
            &self.rsi,
            &self.atr,
        ]
    }

    /// Maximum lookback across the indicator set.
    pub fn warmup(&self) -> usize {
        compute_warmup(&self.indicators())
    }
}

/// Compute the warmup length from a set of indicators.
pub fn compute_warmup(indicators: &[&dyn Indicator]) -> usize {
    indicators.iter().map(|i| i.lookback()).max().unwrap_or(0)
}

/// Features for the bars past warmup.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSeries {
    pub bars: Vec<FeatureBar>,
    /// Leading input bars dropped for insufficient history.
    pub warmup_bars: usize,
}

/// Build the feature series: validate inputs, compute every indicator,
/// drop the warmup rows, and reject anything non-finite that remains.
///
/// A series no longer than the warmup yields an empty feature series.
pub fn build_features(bars: &[Bar], spec: &FeatureSpec) -> Result<FeatureSeries, FeatureError> {
    for (index, bar) in bars.iter().enumerate() {
        if let Some(field) = bar.first_non_finite_field() {
            return Err(FeatureError::NonFiniteInput { index, field });
        }
    }

    let warmup = spec.warmup();
    if bars.len() <= warmup {
        debug!(bars = bars.len(), warmup, "series shorter than warmup");
        return Ok(FeatureSeries {
            bars: Vec::new(),
            warmup_bars: bars.len(),
        });
    }

    let sma = spec.sma.compute(bars);
    let average_volume = spec.average_volume.compute(bars);
    let acceleration = spec.acceleration.compute(bars);
    let short_acceleration = spec.short_acceleration.compute(bars);
    let index_acceleration = spec.index_acceleration.compute(bars);
    let rsi = spec.rsi.compute(bars);
    let atr = spec.atr.compute(bars);

    let mut features = Vec::with_capacity(bars.len() - warmup);
    for i in warmup..bars.len() {
        let bar = &bars[i];
        let fb = FeatureBar {
            bar: bar.clone(),
            sma: sma[i],
            price_sma_ratio: bar.close / sma[i],
            acceleration: acceleration[i],
            short_acceleration: short_acceleration[i],
            index_acceleration: index_acceleration[i],
            rsi: rsi[i],
            atr: atr[i],
            average_volume: average_volume[i],
        };
        if let Some(feature) = fb.first_non_finite_feature() {
            return Err(FeatureError::NonFinite { index: i, feature });
        }
        features.push(fb);
    }

    debug!(
        input = bars.len(),
        warmup,
        output = features.len(),
        "features built"
    );
    Ok(FeatureSeries {
        bars: features,
        warmup_bars: warmup,
    })
}
