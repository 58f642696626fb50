//! Bar loading for the runner.
//!
//! Two sources:
//! 1. A CSV file with `datetime, open, high, low, close, volume` and an
//!    index-price column (named by config, `vn30` by default)
//! 2. A deterministic synthetic random walk (`--synthetic`), tagged so its
//!    results are never mistaken for real ones
//!
//! Rows must be strictly increasing in time. Values are taken as written;
//! non-finite values are left for the engine to reject.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use futlab_core::domain::Bar;
use futlab_core::fingerprint::DatasetHash;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing column '{0}'")]
    MissingColumn(String),
    #[error("row {row}: unparseable datetime '{value}'")]
    BadTimestamp { row: usize, value: String },
    #[error("row {row}: column '{column}' is not a number: '{value}'")]
    BadValue {
        row: usize,
        column: String,
        value: String,
    },
    #[error("row {row}: timestamp {current} is not after {previous}")]
    Unordered {
        row: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },
}

/// Where a bar series came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    Csv { path: PathBuf },
    Synthetic { label: String },
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Name of the index-price column.
    pub index_column: String,
    /// Generate synthetic bars instead of reading the file.
    pub synthetic: bool,
    /// Length of the synthetic series.
    pub synthetic_bars: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            index_column: crate::config::DEFAULT_INDEX_COLUMN.to_string(),
            synthetic: false,
            synthetic_bars: 5_000,
        }
    }
}

/// Loaded bars with provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    pub source: DataSource,
    /// BLAKE3 over every bar field.
    pub dataset_hash: DatasetHash,
    pub has_synthetic: bool,
}

impl LoadedData {
    fn new(bars: Vec<Bar>, source: DataSource) -> Self {
        let has_synthetic = matches!(source, DataSource::Synthetic { .. });
        Self {
            dataset_hash: DatasetHash::of(&bars),
            bars,
            source,
            has_synthetic,
        }
    }
}

/// Load bars from `path`, or synthesize them when `opts.synthetic` is set.
pub fn load_bars(path: &Path, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    if opts.synthetic {
        let label = path.display().to_string();
        warn!(%label, bars = opts.synthetic_bars, "generating synthetic data; results will be tagged");
        let bars = generate_synthetic_bars(&label, opts.synthetic_bars);
        return Ok(LoadedData::new(bars, DataSource::Synthetic { label }));
    }

    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bars = read_csv_bars(file, &opts.index_column)?;
    info!(path = %path.display(), bars = bars.len(), "loaded bars");
    Ok(LoadedData::new(
        bars,
        DataSource::Csv {
            path: path.to_path_buf(),
        },
    ))
}

/// Parse bars from CSV. Column names are matched case-insensitively and
/// extra columns are ignored. Row numbers in errors are 1-based data rows.
pub fn read_csv_bars<R: Read>(reader: R, index_column: &str) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| -> Result<usize, LoadError> {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
    };
    let datetime_col = column("datetime")?;
    let value_cols = [
        ("open", column("open")?),
        ("high", column("high")?),
        ("low", column("low")?),
        ("close", column("close")?),
        ("volume", column("volume")?),
        (index_column, column(index_column)?),
    ];

    let mut bars: Vec<Bar> = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;

        let raw_ts = record.get(datetime_col).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| LoadError::BadTimestamp {
            row,
            value: raw_ts.to_string(),
        })?;

        let mut values = [0.0_f64; 6];
        for (slot, (name, idx)) in values.iter_mut().zip(value_cols.iter()) {
            let raw = record.get(*idx).unwrap_or_default();
            *slot = raw.parse().map_err(|_| LoadError::BadValue {
                row,
                column: name.to_string(),
                value: raw.to_string(),
            })?;
        }

        if let Some(prev) = bars.last() {
            if timestamp <= prev.timestamp {
                return Err(LoadError::Unordered {
                    row,
                    previous: prev.timestamp,
                    current: timestamp,
                });
            }
        }

        let [open, high, low, close, volume, index_price] = values;
        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            index_price,
        });
    }

    Ok(bars)
}

/// Accepts `YYYY-MM-DD HH:MM:SS` (optionally with fractional seconds or a
/// `T` separator) and bare `YYYY-MM-DD`, which maps to midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    let s = s.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Generate a synthetic minute-bar series.
///
/// A random walk from 1200.0 with an index that follows the same moves plus
/// its own noise. Seeded from the BLAKE3 hash of `label`, so the same label
/// always gives the same series.
pub fn generate_synthetic_bars(label: &str, n: usize) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(label.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let Some(start) = NaiveDate::from_ymd_opt(2024, 1, 2).and_then(|d| d.and_hms_opt(9, 0, 0))
    else {
        return Vec::new();
    };

    let mut bars = Vec::with_capacity(n);
    let mut price = 1200.0_f64;
    let mut index = 1195.0_f64;

    for i in 0..n {
        let step: f64 = rng.gen_range(-2.0..2.0);
        let open = price;
        let close = (price + step).max(1.0);
        let high = open.max(close) + rng.gen_range(0.0..1.0);
        let low = (open.min(close) - rng.gen_range(0.0..1.0)).max(0.5);
        let volume = rng.gen_range(200..3_000u32) as f64;
        index = (index + step * 0.8 + rng.gen_range(-0.5..0.5)).max(1.0);

        bars.push(Bar {
            timestamp: start + chrono::Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
            volume,
            index_price: index,
        });
        price = close;
    }

    bars
}
