//! Kline fetch, validation, and partitioned Parquet storage

pub mod binance;
pub mod pipeline;
pub mod provider;
pub mod store;
pub mod validate;

pub use binance::BinanceProvider;
pub use pipeline::{ingest_symbol, ingest_symbols, IngestError, IngestReport, DEFAULT_SYMBOLS};
pub use provider::{DataError, IngestProgress, KlineProvider, StdoutProgress};
pub use store::{ParquetStore, PartitionInfo};
pub use validate::{validate, ValidationError};
