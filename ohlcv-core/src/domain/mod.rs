//! Domain types: candles and kline intervals.

pub mod candle;
pub mod interval;

pub use candle::Candle;
pub use interval::{Interval, IntervalParseError};
