//! Bar loading for the runner.
//!
//! Two sources:
//! 1. CSV with a `timestamp,open,high,low,close,volume` header
//! 2. Seeded synthetic random walk (demos and tests)
//!
//! Gap repair is not attempted. A missing price field loads as NaN and the
//! engine treats that bar as non-finite.

use crate::config::{DataConfig, SyntheticConfig};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use replaylab_core::domain::{Bar, BarSeries, SeriesError};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: unrecognised timestamp '{value}'")]
    Timestamp { row: usize, value: String },

    #[error("row {row}: column '{column}' is not a number: '{value}'")]
    Number {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: inconsistent OHLC (open {open}, high {high}, low {low}, close {close})")]
    Ohlc {
        row: usize,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("bad ordering: {0}")]
    Series(#[from] SeriesError),
}

/// Load bars for a run: CSV when configured, otherwise synthetic.
pub fn load_series(config: &DataConfig) -> Result<BarSeries, LoadError> {
    match &config.csv {
        Some(path) => load_csv(path, &config.symbol),
        None => Ok(synthetic_series(&config.symbol, &config.synthetic)?),
    }
}

pub fn load_csv(path: impl AsRef<Path>, symbol: &str) -> Result<BarSeries, LoadError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let series = read_csv(file, symbol)?;
    info!(path = %path.display(), symbol, bars = series.len(), "loaded csv bars");
    Ok(series)
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: String,
    high: String,
    low: String,
    close: String,
    #[serde(default)]
    volume: String,
}

/// Parse CSV bars from any reader. Rows are numbered from 1 (header excluded).
pub fn read_csv<R: Read>(reader: R, symbol: &str) -> Result<BarSeries, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for (i, record) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = i + 1;
        let r = record?;
        let bar = Bar::new(
            parse_timestamp(row, &r.timestamp)?,
            parse_price(row, "open", &r.open)?,
            parse_price(row, "high", &r.high)?,
            parse_price(row, "low", &r.low)?,
            parse_price(row, "close", &r.close)?,
            parse_price(row, "volume", &r.volume)?,
        );
        // Non-finite bars load and are skipped by the engine; finite ones must be coherent.
        if bar.has_finite_prices() && !bar.is_sane() {
            return Err(LoadError::Ohlc {
                row,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
            });
        }
        bars.push(bar);
    }
    Ok(BarSeries::new(symbol, bars)?)
}

/// RFC 3339, or integer Unix milliseconds.
fn parse_timestamp(row: usize, value: &str) -> Result<DateTime<Utc>, LoadError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    value
        .parse::<i64>()
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .ok_or_else(|| LoadError::Timestamp {
            row,
            value: value.to_string(),
        })
}

/// Empty fields load as NaN.
fn parse_price(row: usize, column: &'static str, value: &str) -> Result<f64, LoadError> {
    if value.is_empty() {
        return Ok(f64::NAN);
    }
    value.parse::<f64>().map_err(|_| LoadError::Number {
        row,
        column,
        value: value.to_string(),
    })
}

/// Deterministic random walk: same seed, same bars.
///
/// Close follows `close *= 1 + N(0, volatility)` (Box-Muller); open is the
/// previous close; high/low extend the body by a random wick.
pub fn synthetic_series(symbol: &str, config: &SyntheticConfig) -> Result<BarSeries, SeriesError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default();
    let mut close = config.start_price;

    let bars = (0..config.bars)
        .map(|i| {
            let open = close;
            let ret = gaussian(&mut rng) * config.volatility;
            close = (open * (1.0 + ret)).max(open * 0.5);
            let wick = open.max(close) * config.volatility * rng.gen_range(0.0..1.0);
            let high = open.max(close) + wick;
            let low = (open.min(close) - wick).max(f64::MIN_POSITIVE);
            // Volume spikes with the size of the move.
            let volume = 1_000.0 * (1.0 + rng.gen_range(0.0..1.0) + ret.abs() * 50.0);
            Bar::new(t0 + Duration::minutes(config.interval_minutes * i as i64), open, high, low, close, volume)
        })
        .collect();
    BarSeries::new(symbol, bars)
}

fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
