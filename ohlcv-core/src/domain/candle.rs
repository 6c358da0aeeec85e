//! Candle — one OHLCV row for a single symbol and interval.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candle for a single symbol, keyed by the instant the interval opens.
///
/// Prices and volume come off the wire as decimal strings and are stored as
/// `f64`; no rounding is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub symbol: String,
}

impl Candle {
    /// UTC calendar date of the candle's open.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Open time as milliseconds since the Unix epoch.
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}
