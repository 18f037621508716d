//! Bar loading and validation for the runner.
//!
//! One CSV per symbol (`timestamp,open,high,low,close,volume`, RFC 3339
//! timestamps), file name derived from the symbol. Timestamp ordering is
//! validated here rather than in the engine: duplicates and out-of-order
//! rows are rejected at load time, while gaps pass through — the engine
//! indexes bars positionally and is timeframe-agnostic.

use chrono::{DateTime, Utc};
use papertrade_core::domain::Bar;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no bar file for '{symbol}' (expected {path})")]
    MissingFile { symbol: String, path: PathBuf },

    #[error("failed to read bars for '{symbol}': {source}")]
    Csv {
        symbol: String,
        #[source]
        source: csv::Error,
    },

    #[error(
        "non-monotonic timestamp in '{symbol}' at row {row}: {timestamp} \
         does not increase over the previous bar"
    )]
    NonMonotonicTimestamp {
        symbol: String,
        row: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("insane OHLC values in '{symbol}' at row {row}")]
    InsaneBar { symbol: String, row: usize },
}

#[derive(Debug, Deserialize)]
struct BarRow {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// CSV file name for a symbol: path separators are not welcome in file
/// names, so `BTC/USDT` becomes `BTC-USDT.csv`.
pub fn symbol_file_name(symbol: &str) -> String {
    format!("{}.csv", symbol.replace('/', "-"))
}

/// Load one symbol's bars, validating ordering and OHLC sanity.
pub fn load_symbol_bars(dir: &Path, symbol: &str) -> Result<Vec<Bar>, LoadError> {
    let path = dir.join(symbol_file_name(symbol));
    if !path.exists() {
        return Err(LoadError::MissingFile {
            symbol: symbol.to_string(),
            path,
        });
    }

    let mut reader = csv::Reader::from_path(&path).map_err(|source| LoadError::Csv {
        symbol: symbol.to_string(),
        source,
    })?;

    let mut bars: Vec<Bar> = Vec::new();
    for (i, row) in reader.deserialize::<BarRow>().enumerate() {
        let row = row.map_err(|source| LoadError::Csv {
            symbol: symbol.to_string(),
            source,
        })?;
        let bar = Bar {
            timestamp: row.timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        };
        if !bar.is_sane() {
            return Err(LoadError::InsaneBar {
                symbol: symbol.to_string(),
                row: i,
            });
        }
        if let Some(prev) = bars.last() {
            if bar.timestamp <= prev.timestamp {
                return Err(LoadError::NonMonotonicTimestamp {
                    symbol: symbol.to_string(),
                    row: i,
                    timestamp: bar.timestamp,
                });
            }
        }
        bars.push(bar);
    }

    Ok(bars)
}

/// Load every configured symbol. Any missing or invalid series is fatal:
/// a backtest with a partial universe would silently change meaning.
pub fn load_all_bars(
    dir: &Path,
    symbols: &[String],
) -> Result<BTreeMap<String, Vec<Bar>>, LoadError> {
    let mut series = BTreeMap::new();
    for symbol in symbols {
        let bars = load_symbol_bars(dir, symbol)?;
        tracing::info!(symbol = %symbol, bars = bars.len(), "loaded bar series");
        series.insert(symbol.clone(), bars);
    }
    Ok(series)
}
