//! Ingest driver — fetch, validate, and store each symbol in turn.

use super::provider::{DataError, IngestProgress, KlineProvider};
use super::store::ParquetStore;
use super::validate::validate;
use crate::domain::Interval;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Symbols ingested when none are given.
pub const DEFAULT_SYMBOLS: [&str; 2] = ["BTCUSDT", "ETHUSDT"];

/// Outcome of ingesting one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub symbol: String,
    pub rows: usize,
    pub path: PathBuf,
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} rows ingested", self.symbol, self.rows)
    }
}

/// A failure while ingesting a particular symbol.
#[derive(Debug, Error)]
#[error("ingest failed for {symbol}: {source}")]
pub struct IngestError {
    pub symbol: String,
    #[source]
    pub source: DataError,
}

/// Ingest a single symbol: fetch → validate → store.
pub fn ingest_symbol(
    provider: &dyn KlineProvider,
    store: &ParquetStore,
    symbol: &str,
    interval: Interval,
    limit: u32,
) -> Result<IngestReport, DataError> {
    let candles = provider.fetch(symbol, interval, limit)?;
    if let Some(other) = candles.iter().find(|c| c.symbol != symbol) {
        return Err(DataError::SymbolMismatch {
            requested: symbol.to_string(),
            returned: other.symbol.clone(),
        });
    }
    validate(&candles, interval)?;
    let path = store.write(&candles)?;

    tracing::info!(
        symbol,
        rows = candles.len(),
        path = %path.display(),
        "partition written"
    );

    Ok(IngestReport {
        symbol: symbol.to_string(),
        rows: candles.len(),
        path,
    })
}

/// Ingest symbols strictly in order. The first failure ends the run;
/// later symbols are not attempted.
pub fn ingest_symbols(
    provider: &dyn KlineProvider,
    store: &ParquetStore,
    symbols: &[&str],
    interval: Interval,
    limit: u32,
    progress: &dyn IngestProgress,
) -> Result<Vec<IngestReport>, IngestError> {
    let total = symbols.len();
    let mut reports = Vec::with_capacity(total);

    tracing::info!(
        provider = provider.name(),
        base_dir = %store.base_dir().display(),
        %interval,
        limit,
        total,
        "starting ingest"
    );

    for (i, symbol) in symbols.iter().enumerate() {
        tracing::debug!(symbol, index = i + 1, total, "fetching");

        let report =
            ingest_symbol(provider, store, symbol, interval, limit).map_err(|source| {
                tracing::error!(symbol, error = %source, "ingest halted");
                IngestError {
                    symbol: symbol.to_string(),
                    source,
                }
            })?;

        progress.on_complete(&report);
        reports.push(report);
    }

    Ok(reports)
}
