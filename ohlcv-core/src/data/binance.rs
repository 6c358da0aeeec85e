//! Binance spot kline provider.
//!
//! One blocking GET per call against `/api/v3/klines`. There is no retry and
//! no backoff: a non-2xx status or a transport error surfaces immediately.

use super::provider::{check_request, normalize, DataError, KlineProvider};
use crate::domain::{Candle, Interval};
use chrono::DateTime;
use serde_json::Value;
use std::time::Duration;

/// Public spot kline endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.binance.com/api/v3/klines";

/// Request timeout applied to every call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Kline provider backed by the Binance REST API.
pub struct BinanceProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl BinanceProvider {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Provider against the public endpoint with the default timeout.
    pub fn public() -> Result<Self, DataError> {
        Self::new(DEFAULT_ENDPOINT, DEFAULT_TIMEOUT)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl KlineProvider for BinanceProvider {
    fn name(&self) -> &str {
        "binance_spot"
    }

    fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        limit: u32,
    ) -> Result<Vec<Candle>, DataError> {
        check_request(symbol, limit)?;

        let limit = limit.to_string();
        tracing::debug!(endpoint = %self.endpoint, symbol, %interval, %limit, "requesting klines");

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("symbol", symbol),
                ("interval", interval.code()),
                ("limit", limit.as_str()),
            ])
            .send()
            .map_err(|e| DataError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                symbol: symbol.to_string(),
            });
        }

        let rows: Vec<Vec<Value>> = resp.json().map_err(|e| {
            DataError::ResponseFormat(format!("failed to parse response for {symbol}: {e}"))
        })?;

        let mut candles = parse_klines(symbol, &rows)?;
        let dropped = normalize(&mut candles);
        if dropped > 0 {
            tracing::warn!(symbol, dropped, "dropped klines with repeated open time");
        }
        Ok(candles)
    }
}

/// Parse raw kline rows into candles tagged with `symbol`.
///
/// Each row is `[open_time_ms, open, high, low, close, volume, ...]`; the
/// vendor sends prices and volume as decimal strings. Trailing fields (close
/// time, quote volume, trade count, taker volumes) are ignored.
pub fn parse_klines(symbol: &str, rows: &[Vec<Value>]) -> Result<Vec<Candle>, DataError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| parse_row(symbol, i, row))
        .collect()
}

fn parse_row(symbol: &str, i: usize, row: &[Value]) -> Result<Candle, DataError> {
    if row.len() < 6 {
        return Err(DataError::ResponseFormat(format!(
            "kline row {i} has {} fields, expected at least 6",
            row.len()
        )));
    }

    let open_ms = row[0].as_i64().ok_or_else(|| {
        DataError::ResponseFormat(format!("kline row {i}: open time is not an integer"))
    })?;
    let timestamp = DateTime::from_timestamp_millis(open_ms).ok_or_else(|| {
        DataError::ResponseFormat(format!("kline row {i}: open time {open_ms} out of range"))
    })?;

    Ok(Candle {
        timestamp,
        open: decimal(&row[1], i, "open")?,
        high: decimal(&row[2], i, "high")?,
        low: decimal(&row[3], i, "low")?,
        close: decimal(&row[4], i, "close")?,
        volume: decimal(&row[5], i, "volume")?,
        symbol: symbol.to_string(),
    })
}

/// Decimal field sent either as a JSON string or a bare number.
fn decimal(value: &Value, i: usize, field: &str) -> Result<f64, DataError> {
    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.ok_or_else(|| DataError::ResponseFormat(format!("kline row {i}: bad {field} {value}")))
}
