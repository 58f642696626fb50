//! TOML run configuration.
//!
//! ```toml
//! [backtest]
//! data_path = "train.csv"
//! initial_asset_value = 10000.0
//! index_column = "vn30"
//!
//! [params]
//! sma_window_length = 50
//! # ... all twelve strategy params
//!
//! [constants]        # optional, every field defaults
//! fee_per_contract = 0.47
//! ```

use std::path::{Path, PathBuf};

use futlab_core::{EngineConstants, ParamError, StrategyParams};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default starting capital.
pub const DEFAULT_INITIAL_ASSET_VALUE: f64 = 10_000.0;

/// Default CSV column holding the index price.
pub const DEFAULT_INDEX_COLUMN: &str = "vn30";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error(transparent)]
    Params(#[from] ParamError),
    #[error("initial_asset_value must be finite, got {0}")]
    InitialAssetValue(f64),
}

/// `[backtest]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BacktestSection {
    /// Bar CSV. Relative paths resolve against the config file's directory.
    pub data_path: PathBuf,
    #[serde(default = "default_initial_asset_value")]
    pub initial_asset_value: f64,
    #[serde(default = "default_index_column")]
    pub index_column: String,
}

fn default_initial_asset_value() -> f64 {
    DEFAULT_INITIAL_ASSET_VALUE
}

fn default_index_column() -> String {
    DEFAULT_INDEX_COLUMN.to_string()
}

/// A complete, reproducible run description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub params: StrategyParams,
    #[serde(default)]
    pub constants: EngineConstants,
}

impl BacktestConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if config.backtest.data_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.backtest.data_path = dir.join(&config.backtest.data_path);
            }
        }
        Ok(config)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.backtest.initial_asset_value.is_finite() {
            return Err(ConfigError::InitialAssetValue(
                self.backtest.initial_asset_value,
            ));
        }
        self.params.validate()?;
        self.constants.validate()?;
        Ok(())
    }

    /// Starter config with default params, written by `futlab params`.
    pub fn template(data_path: impl Into<PathBuf>) -> Self {
        Self {
            backtest: BacktestSection {
                data_path: data_path.into(),
                initial_asset_value: DEFAULT_INITIAL_ASSET_VALUE,
                index_column: default_index_column(),
            },
            params: StrategyParams::default(),
            constants: EngineConstants::default(),
        }
    }
}
