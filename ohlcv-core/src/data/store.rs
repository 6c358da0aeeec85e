//! Parquet store with Hive-style partitioning.
//!
//! Layout: `{base_dir}/symbol={SYMBOL}/date={YYYY-MM-DD}/ohlcv.parquet`
//!
//! - The partition date is the UTC date of the batch's last candle.
//! - Writes are atomic (write to .tmp, rename into place) and replace any
//!   existing file for the same partition.
//! - The symbol column is not stored; it is recovered from the path on load.

use super::provider::{check_symbol, DataError};
use crate::domain::Candle;
use chrono::{DateTime, NaiveDate};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Default root of the raw market data tree, relative to the working directory.
pub const DEFAULT_BASE_DIR: &str = "data/raw/market";

/// File name inside each partition directory.
pub const PARTITION_FILE: &str = "ohlcv.parquet";

const COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

/// The partitioned Parquet store.
pub struct ParquetStore {
    base_dir: PathBuf,
}

impl ParquetStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Root directory of the store.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Partition directory: `{base_dir}/symbol={SYMBOL}/date={YYYY-MM-DD}/`
    fn partition_dir(&self, symbol: &str, date: NaiveDate) -> PathBuf {
        self.base_dir
            .join(format!("symbol={symbol}"))
            .join(format!("date={}", date.format("%Y-%m-%d")))
    }

    /// Path of the Parquet file holding a (symbol, date) partition.
    pub fn partition_path(&self, symbol: &str, date: NaiveDate) -> PathBuf {
        self.partition_dir(symbol, date).join(PARTITION_FILE)
    }

    /// Write a validated batch to its partition and return the file path.
    ///
    /// Symbol and date are taken from the first and last candle respectively.
    pub fn write(&self, candles: &[Candle]) -> Result<PathBuf, DataError> {
        let (first, last) = match (candles.first(), candles.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(DataError::StorageError("no candles to store".into())),
        };

        check_symbol(&first.symbol)?;
        let dir = self.partition_dir(&first.symbol, last.date());
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::StorageError(format!("failed to create dir: {e}")))?;

        let mut df = candles_to_dataframe(candles)?;
        let path = dir.join(PARTITION_FILE);

        // Removed on any early return below
        let tmp = TempFile::new(path.with_extension("parquet.tmp"));
        write_parquet(&mut df, tmp.path())?;

        // Atomic rename; replaces any previous file for this partition
        fs::rename(tmp.path(), &path)
            .map_err(|e| DataError::StorageError(format!("atomic rename failed: {e}")))?;
        tmp.keep();

        Ok(path)
    }

    /// Load one partition back as candles, sorted as written.
    pub fn load(&self, symbol: &str, date: NaiveDate) -> Result<Vec<Candle>, DataError> {
        let path = self.partition_path(symbol, date);
        if !path.exists() {
            return Err(DataError::NoStoredData {
                symbol: symbol.to_string(),
                date: date.to_string(),
            });
        }

        let df = read_and_check_parquet(&path)?;
        dataframe_to_candles(&df, symbol)
    }

    /// List every stored partition, ordered by symbol then date.
    pub fn partitions(&self) -> Result<Vec<PartitionInfo>, DataError> {
        let mut out = Vec::new();
        if !self.base_dir.exists() {
            return Ok(out);
        }

        for sym_entry in read_dir(&self.base_dir)? {
            let Some(symbol) = strip_key(&sym_entry, "symbol=") else {
                continue;
            };

            for date_entry in read_dir(&sym_entry)? {
                let Some(date) = strip_key(&date_entry, "date=")
                    .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
                else {
                    continue;
                };

                let file = date_entry.join(PARTITION_FILE);
                let Ok(meta) = fs::metadata(&file) else {
                    continue;
                };

                let rows = read_and_check_parquet(&file)?.height();
                out.push(PartitionInfo {
                    symbol: symbol.clone(),
                    date,
                    rows,
                    bytes: meta.len(),
                    path: file,
                });
            }
        }

        out.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.date.cmp(&b.date)));
        Ok(out)
    }
}

impl Default for ParquetStore {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DIR)
    }
}

/// One stored (symbol, date) partition.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionInfo {
    pub symbol: String,
    pub date: NaiveDate,
    pub rows: usize,
    pub bytes: u64,
    pub path: PathBuf,
}

/// Temp file path deleted on drop unless `keep` is called.
struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn read_dir(dir: &Path) -> Result<Vec<PathBuf>, DataError> {
    let entries =
        fs::read_dir(dir).map_err(|e| DataError::StorageError(format!("read dir: {e}")))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DataError::StorageError(format!("dir entry: {e}")))?;
        if entry.path().is_dir() {
            paths.push(entry.path());
        }
    }
    Ok(paths)
}

/// `symbol=BTCUSDT` → `BTCUSDT` for a directory named `{key}{value}`.
fn strip_key(dir: &Path, key: &str) -> Option<String> {
    dir.file_name()?
        .to_str()?
        .strip_prefix(key)
        .map(str::to_string)
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

/// Convert candles to a DataFrame, dropping the symbol column.
fn candles_to_dataframe(candles: &[Candle]) -> Result<DataFrame, DataError> {
    let timestamps: Vec<i64> = candles.iter().map(Candle::timestamp_millis).collect();
    let opens: Vec<f64> = candles.iter().map(|c| c.open).collect();
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

    DataFrame::new(vec![
        Column::new("timestamp".into(), timestamps)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| DataError::ParquetError(format!("timestamp cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

/// Read a partition file and check it carries the expected columns and types.
fn read_and_check_parquet(path: &Path) -> Result<DataFrame, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read {}: {e}", path.display())))?;

    for name in COLUMNS {
        let column = df.column(name).map_err(|_| {
            DataError::ParquetError(format!("{}: missing column '{name}'", path.display()))
        })?;
        let ok = match name {
            "timestamp" => matches!(
                column.dtype(),
                DataType::Datetime(TimeUnit::Milliseconds, _)
            ),
            _ => column.dtype() == &DataType::Float64,
        };
        if !ok {
            return Err(DataError::ParquetError(format!(
                "{}: column '{name}' has type {:?}",
                path.display(),
                column.dtype()
            )));
        }
    }

    Ok(df)
}

/// Convert a partition DataFrame back to candles tagged with `symbol`.
fn dataframe_to_candles(df: &DataFrame, symbol: &str) -> Result<Vec<Candle>, DataError> {
    let map_err = |e: PolarsError| DataError::ParquetError(format!("column read: {e}"));

    let timestamps = df
        .column("timestamp")
        .map_err(map_err)?
        .cast(&DataType::Int64)
        .map_err(map_err)?;
    let ts_ca = timestamps.i64().map_err(map_err)?;
    let open_ca = df.column("open").map_err(map_err)?.f64().map_err(map_err)?;
    let high_ca = df.column("high").map_err(map_err)?.f64().map_err(map_err)?;
    let low_ca = df.column("low").map_err(map_err)?.f64().map_err(map_err)?;
    let close_ca = df.column("close").map_err(map_err)?.f64().map_err(map_err)?;
    let vol_ca = df.column("volume").map_err(map_err)?.f64().map_err(map_err)?;

    let n = df.height();
    let mut candles = Vec::with_capacity(n);

    for i in 0..n {
        let millis = ts_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null timestamp at row {i}")))?;
        let timestamp = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
            DataError::ParquetError(format!("timestamp {millis} out of range at row {i}"))
        })?;

        candles.push(Candle {
            timestamp,
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close: close_ca.get(i).unwrap_or(f64::NAN),
            volume: vol_ca.get(i).unwrap_or(f64::NAN),
            symbol: symbol.to_string(),
        });
    }

    Ok(candles)
}
