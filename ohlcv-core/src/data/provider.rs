//! Kline provider trait and structured error types.
//!
//! The KlineProvider trait abstracts over where candles come from (the public
//! REST endpoint, or an in-memory source in tests) so the ingest driver never
//! touches HTTP directly.

use super::pipeline::IngestReport;
use super::validate::ValidationError;
use crate::domain::{Candle, Interval};
use thiserror::Error;

/// Largest `limit` the kline endpoint accepts in a single request.
pub const MAX_LIMIT: u32 = 1000;

/// Structured error types for data operations.
///
/// These are designed to be displayable directly by the CLI.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status} from kline endpoint for {symbol}")]
    HttpStatus { status: u16, symbol: String },

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("requested {requested} but provider returned rows for {returned}")]
    SymbolMismatch { requested: String, returned: String },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("no stored partition for symbol '{symbol}' on {date}")]
    NoStoredData { symbol: String, date: String },
}

/// Source of kline data.
///
/// Implementations must return candles sorted ascending by timestamp with no
/// duplicate timestamps, every row tagged with the requested symbol.
pub trait KlineProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the most recent `limit` candles of `interval` for `symbol`.
    fn fetch(&self, symbol: &str, interval: Interval, limit: u32)
        -> Result<Vec<Candle>, DataError>;
}

/// Symbols become path components, so only ASCII alphanumerics are allowed.
pub fn check_symbol(symbol: &str) -> Result<(), DataError> {
    if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(DataError::InvalidRequest(format!(
            "symbol '{symbol}' must be non-empty ASCII alphanumeric"
        )));
    }
    Ok(())
}

/// Reject request parameters the endpoint would refuse anyway.
pub fn check_request(symbol: &str, limit: u32) -> Result<(), DataError> {
    check_symbol(symbol)?;
    if limit == 0 || limit > MAX_LIMIT {
        return Err(DataError::InvalidRequest(format!(
            "limit {limit} outside 1..={MAX_LIMIT}"
        )));
    }
    Ok(())
}

/// Stable-sort by timestamp and drop repeated timestamps, keeping the first.
///
/// Returns the number of rows dropped.
pub fn normalize(candles: &mut Vec<Candle>) -> usize {
    let before = candles.len();
    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);
    before - candles.len()
}

/// Progress callback for multi-symbol ingest runs.
pub trait IngestProgress {
    /// Called once a symbol's partition is on disk.
    fn on_complete(&self, report: &IngestReport);
}

/// Prints the one-line row count per symbol to stdout.
pub struct StdoutProgress;

impl IngestProgress for StdoutProgress {
    fn on_complete(&self, report: &IngestReport) {
        println!("{report}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle(minute: u32, open: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, minute, 0).unwrap(),
            open,
            high: open,
            low: open,
            close: open,
            volume: 1.0,
            symbol: "BTCUSDT".into(),
        }
    }

    #[test]
    fn normalize_sorts_ascending() {
        let mut candles = vec![candle(2, 3.0), candle(0, 1.0), candle(1, 2.0)];
        assert_eq!(normalize(&mut candles), 0);
        let opens: Vec<f64> = candles.iter().map(|c| c.open).collect();
        assert_eq!(opens, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn normalize_keeps_first_duplicate() {
        let mut candles = vec![candle(1, 10.0), candle(0, 1.0), candle(1, 20.0)];
        assert_eq!(normalize(&mut candles), 1);
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].open, 10.0);
    }

    #[test]
    fn limit_bounds_are_enforced() {
        assert!(check_request("BTCUSDT", 1).is_ok());
        assert!(check_request("BTCUSDT", MAX_LIMIT).is_ok());
        assert!(matches!(
            check_request("BTCUSDT", 0),
            Err(DataError::InvalidRequest(_))
        ));
        assert!(matches!(
            check_request("BTCUSDT", MAX_LIMIT + 1),
            Err(DataError::InvalidRequest(_))
        ));
    }

    #[test]
    fn path_like_symbols_are_rejected() {
        assert!(check_request("../etc", 10).is_err());
        assert!(check_request("", 10).is_err());
        assert!(check_request("BTC/USDT", 10).is_err());
    }
}
