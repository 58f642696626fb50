//! Random-search hyperparameter optimization.
//!
//! Each trial draws one value per strategy parameter from a [`SearchSpace`],
//! runs a full backtest, and scores it by final cumulative P&L. Trial `i`
//! samples from its own RNG seeded with `blake3(master_seed, i)`, so the set
//! of trials is identical however rayon schedules them.
//!
//! Selection: highest score wins, ties go to the lower trial number, and a
//! failed trial is kept in the log but never selected.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use futlab_core::domain::Bar;
use futlab_core::params::PARAM_NAMES;
use futlab_core::{run_backtest, EngineConstants, StrategyParams};

/// Default number of trials.
pub const DEFAULT_TRIALS: usize = 1000;

/// Default master seed.
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("search space: {0}")]
    Space(String),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("params JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no trial completed")]
    NoCompletedTrial,
}

/// Range one parameter is drawn from. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamRange {
    Int { low: i64, high: i64 },
    Float { low: f64, high: f64 },
}

impl ParamRange {
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        match *self {
            ParamRange::Int { low, high } => rng.gen_range(low..=high) as f64,
            ParamRange::Float { low, high } => rng.gen_range(low..=high),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        match *self {
            ParamRange::Int { low, high } => {
                value.fract() == 0.0 && value >= low as f64 && value <= high as f64
            }
            ParamRange::Float { low, high } => value >= low && value <= high,
        }
    }

    fn is_valid(&self) -> bool {
        match *self {
            ParamRange::Int { low, high } => low <= high,
            ParamRange::Float { low, high } => low.is_finite() && high.is_finite() && low <= high,
        }
    }
}

/// One range per strategy parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub ranges: BTreeMap<String, ParamRange>,
}

impl Default for SearchSpace {
    fn default() -> Self {
        use ParamRange::{Float, Int};
        let ranges = [
            ("sma_window_length", Int { low: 10, high: 100 }),
            ("sma_gap", Float { low: 0.0005, high: 0.1 }),
            ("momentum_lookback", Int { low: 2, high: 10 }),
            ("acceleration_threshold", Float { low: 0.1, high: 1.0 }),
            ("short_acceleration_threshold", Float { low: 0.05, high: 0.5 }),
            ("take_profit_threshold", Float { low: 1.0, high: 5.0 }),
            ("cut_loss_threshold", Float { low: 1.0, high: 2.0 }),
            ("quantity_window", Int { low: 2, high: 20 }),
            ("quantity_multiply", Int { low: 0, high: 5 }),
            ("short_extra_profit", Float { low: 0.0, high: 2.0 }),
            ("rsi_window", Int { low: 5, high: 100 }),
            ("rsi_threshold", Int { low: 5, high: 45 }),
        ];
        Self {
            ranges: ranges
                .into_iter()
                .map(|(name, range)| (name.to_string(), range))
                .collect(),
        }
    }
}

impl SearchSpace {
    /// Every strategy parameter needs exactly one well-formed range.
    pub fn validate(&self) -> Result<(), OptimizeError> {
        for name in PARAM_NAMES {
            if !self.ranges.contains_key(name) {
                return Err(OptimizeError::Space(format!("no range for '{name}'")));
            }
        }
        for (name, range) in &self.ranges {
            if !PARAM_NAMES.contains(&name.as_str()) {
                return Err(OptimizeError::Space(format!("unknown parameter '{name}'")));
            }
            if !range.is_valid() {
                return Err(OptimizeError::Space(format!("empty range for '{name}'")));
            }
        }
        Ok(())
    }

    /// Draw one value per parameter, in name order.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> BTreeMap<String, f64> {
        self.ranges
            .iter()
            .map(|(name, range)| (name.clone(), range.sample(rng)))
            .collect()
    }
}

/// RNG for one trial, derived from the master seed and the trial number.
pub fn trial_rng(master_seed: u64, trial: usize) -> StdRng {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(&(trial as u64).to_le_bytes());
    StdRng::from_seed(*hasher.finalize().as_bytes())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrialOutcome {
    Complete { value: f64 },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub number: usize,
    pub params: BTreeMap<String, f64>,
    pub outcome: TrialOutcome,
}

impl Trial {
    pub fn value(&self) -> Option<f64> {
        match self.outcome {
            TrialOutcome::Complete { value } => Some(value),
            TrialOutcome::Failed { .. } => None,
        }
    }
}

/// Every trial in number order, plus the winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub master_seed: u64,
    pub trials: Vec<Trial>,
    /// Number of the best completed trial.
    pub best: Option<usize>,
}

impl OptimizationResult {
    pub fn best_trial(&self) -> Option<&Trial> {
        self.best.and_then(|n| self.trials.get(n))
    }

    pub fn best_params(&self) -> Option<&BTreeMap<String, f64>> {
        self.best_trial().map(|t| &t.params)
    }

    pub fn best_value(&self) -> Option<f64> {
        self.best_trial().and_then(Trial::value)
    }

    pub fn failed_count(&self) -> usize {
        self.trials.iter().filter(|t| t.value().is_none()).count()
    }
}

/// Run `n_trials` random-search trials over `bars` in parallel.
pub fn optimize(
    bars: &[Bar],
    space: &SearchSpace,
    n_trials: usize,
    master_seed: u64,
    constants: &EngineConstants,
    initial_asset_value: f64,
) -> Result<OptimizationResult, OptimizeError> {
    space.validate()?;
    info!(trials = n_trials, seed = master_seed, bars = bars.len(), "starting search");

    let trials: Vec<Trial> = (0..n_trials)
        .into_par_iter()
        .map(|number| {
            let params = space.sample(&mut trial_rng(master_seed, number));
            let outcome = evaluate(bars, &params, constants, initial_asset_value);
            debug!(trial = number, ?outcome, "trial finished");
            Trial {
                number,
                params,
                outcome,
            }
        })
        .collect();

    let mut best: Option<(usize, f64)> = None;
    for trial in &trials {
        match trial.value() {
            Some(value) if best.map_or(true, |(_, b)| value > b) => {
                info!(trial = trial.number, value, "new best");
                best = Some((trial.number, value));
            }
            Some(_) => {}
            None => warn!(trial = trial.number, "trial failed"),
        }
    }

    let result = OptimizationResult {
        master_seed,
        trials,
        best: best.map(|(n, _)| n),
    };
    info!(
        best_trial = ?result.best,
        best_value = ?result.best_value(),
        failed = result.failed_count(),
        "search complete"
    );
    Ok(result)
}

/// Score one parameter set. Any configuration or data error fails the trial.
fn evaluate(
    bars: &[Bar],
    params: &BTreeMap<String, f64>,
    constants: &EngineConstants,
    initial_asset_value: f64,
) -> TrialOutcome {
    let run = StrategyParams::from_map(params)
        .map_err(|e| e.to_string())
        .and_then(|p| {
            run_backtest(bars, &p, constants, initial_asset_value).map_err(|e| e.to_string())
        });
    match run {
        Ok(run) if run.objective().is_finite() => TrialOutcome::Complete {
            value: run.objective(),
        },
        Ok(run) => TrialOutcome::Failed {
            error: format!("non-finite objective {}", run.objective()),
        },
        Err(error) => TrialOutcome::Failed { error },
    }
}

/// Write a params map as JSON indented by four spaces.
pub fn save_best_params(path: &Path, params: &BTreeMap<String, f64>) -> Result<(), OptimizeError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    params.serialize(&mut ser)?;
    std::fs::write(path, buf).map_err(|source| OptimizeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a params map written by [`save_best_params`].
pub fn load_best_params(path: &Path) -> Result<BTreeMap<String, f64>, OptimizeError> {
    let content = std::fs::read_to_string(path).map_err(|source| OptimizeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_space_covers_every_param() {
        let space = SearchSpace::default();
        space.validate().unwrap();
        assert_eq!(space.ranges.len(), PARAM_NAMES.len());
    }

    #[test]
    fn samples_stay_in_range_and_build_params() {
        let space = SearchSpace::default();
        for trial in 0..200 {
            let sample = space.sample(&mut trial_rng(42, trial));
            for (name, value) in &sample {
                assert!(space.ranges[name].contains(*value), "{name}={value}");
            }
            StrategyParams::from_map(&sample).unwrap();
        }
    }

    #[test]
    fn trial_rng_depends_on_seed_and_number() {
        let a: u64 = trial_rng(42, 0).gen();
        let b: u64 = trial_rng(42, 0).gen();
        let c: u64 = trial_rng(42, 1).gen();
        let d: u64 = trial_rng(7, 0).gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn incomplete_space_is_rejected() {
        let mut space = SearchSpace::default();
        space.ranges.remove("rsi_window");
        assert!(matches!(space.validate(), Err(OptimizeError::Space(_))));

        let mut space = SearchSpace::default();
        space
            .ranges
            .insert("sma_gap".into(), ParamRange::Float { low: 1.0, high: 0.0 });
        assert!(space.validate().is_err());
    }

    #[test]
    fn empty_bar_series_scores_zero() {
        let result = optimize(
            &[],
            &SearchSpace::default(),
            5,
            42,
            &EngineConstants::default(),
            10_000.0,
        )
        .unwrap();
        assert_eq!(result.trials.len(), 5);
        assert!(result.trials.iter().all(|t| t.value() == Some(0.0)));
        // Every trial ties; the lowest number wins.
        assert_eq!(result.best, Some(0));
    }

    #[test]
    fn zero_quantity_multiply_samples_are_legal() {
        let range = SearchSpace::default().ranges["quantity_multiply"];
        assert!(range.contains(0.0));
        assert!(!range.contains(2.5));
    }
}
