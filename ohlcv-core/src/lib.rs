//! OHLCV Core — kline fetch, sequence validation, partitioned Parquet storage.
//!
//! The ingest path per symbol is three sequential steps:
//! - fetch recent klines from the REST endpoint (sorted, deduplicated)
//! - validate that timestamps are unique and exactly one interval apart
//! - write the batch to `symbol=…/date=…/ohlcv.parquet`
//!
//! Everything is blocking and single-threaded.

pub mod config;
pub mod data;
pub mod domain;
