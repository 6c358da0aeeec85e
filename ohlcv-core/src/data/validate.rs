//! Sequence validation for a candle batch.
//!
//! A batch is accepted only when it belongs to one symbol and its timestamps
//! are sorted, unique, and spaced by exactly one interval. Checks run in a
//! fixed order and the first failure is reported.

use crate::domain::{Candle, Interval};
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("empty batch")]
    Empty,

    #[error("batch mixes symbols '{first}' and '{other}'")]
    MixedSymbols { first: String, other: String },

    #[error("timestamps not sorted at row {index}")]
    Unsorted { index: usize },

    #[error("duplicate timestamp {timestamp}")]
    DuplicateTimestamp { timestamp: DateTime<Utc> },

    #[error("missing or irregular candle at row {index}: expected step {expected}, got {actual}")]
    IrregularSpacing {
        index: usize,
        expected: Duration,
        actual: Duration,
    },
}

/// Validate a fetched batch against `interval`.
pub fn validate(candles: &[Candle], interval: Interval) -> Result<(), ValidationError> {
    let first = candles.first().ok_or(ValidationError::Empty)?;

    if let Some(other) = candles.iter().find(|c| c.symbol != first.symbol) {
        return Err(ValidationError::MixedSymbols {
            first: first.symbol.clone(),
            other: other.symbol.clone(),
        });
    }

    if let Some(i) = candles
        .windows(2)
        .position(|w| w[1].timestamp < w[0].timestamp)
    {
        return Err(ValidationError::Unsorted { index: i + 1 });
    }

    // Sorted at this point, so any duplicate is adjacent.
    if let Some(w) = candles
        .windows(2)
        .find(|w| w[1].timestamp == w[0].timestamp)
    {
        return Err(ValidationError::DuplicateTimestamp {
            timestamp: w[0].timestamp,
        });
    }

    let expected = interval.duration();
    for (i, w) in candles.windows(2).enumerate() {
        let actual = w[1].timestamp - w[0].timestamp;
        if actual != expected {
            return Err(ValidationError::IrregularSpacing {
                index: i + 1,
                expected,
                actual,
            });
        }
    }

    Ok(())
}
