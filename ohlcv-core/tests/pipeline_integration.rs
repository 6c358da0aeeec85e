//! End-to-end ingest against an in-memory provider and a temp directory.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use ohlcv_core::data::binance::parse_klines;
use ohlcv_core::data::{
    ingest_symbols, DataError, IngestProgress, IngestReport, KlineProvider, ParquetStore,
    ValidationError,
};
use ohlcv_core::domain::{Candle, Interval};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Mutex;

/// Serves canned batches per symbol and records which symbols were asked for.
struct CannedProvider {
    batches: HashMap<String, Vec<Candle>>,
    calls: Mutex<Vec<String>>,
}

impl CannedProvider {
    fn new(batches: Vec<(&str, Vec<Candle>)>) -> Self {
        Self {
            batches: batches
                .into_iter()
                .map(|(s, b)| (s.to_string(), b))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl KlineProvider for CannedProvider {
    fn name(&self) -> &str {
        "canned"
    }

    fn fetch(&self, symbol: &str, _interval: Interval, _limit: u32) -> Result<Vec<Candle>, DataError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        self.batches
            .get(symbol)
            .cloned()
            .ok_or_else(|| DataError::HttpStatus {
                status: 400,
                symbol: symbol.to_string(),
            })
    }
}

#[derive(Default)]
struct RecordingProgress {
    lines: RefCell<Vec<String>>,
}

impl IngestProgress for RecordingProgress {
    fn on_complete(&self, report: &IngestReport) {
        self.lines
            .borrow_mut()
            .push(report.to_string());
    }
}

fn fixture_candles(symbol: &str) -> Vec<Candle> {
    let rows: Vec<Vec<serde_json::Value>> =
        serde_json::from_str(include_str!("fixtures/btcusdt_1m_klines.json")).unwrap();
    parse_klines(symbol, &rows).unwrap()
}

fn minute_batch(symbol: &str, n: i64) -> Vec<Candle> {
    let origin = Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap();
    (0..n)
        .map(|i| Candle {
            timestamp: origin + Duration::minutes(i),
            open: 3000.0 + i as f64,
            high: 3001.0 + i as f64,
            low: 2999.0 + i as f64,
            close: 3000.5 + i as f64,
            volume: 0.75,
            symbol: symbol.to_string(),
        })
        .collect()
}

#[test]
fn two_symbol_run_writes_one_file_each() {
    let dir = tempfile::tempdir().unwrap();
    let store = ParquetStore::new(dir.path());
    let provider = CannedProvider::new(vec![
        ("BTCUSDT", fixture_candles("BTCUSDT")),
        ("ETHUSDT", minute_batch("ETHUSDT", 60)),
    ]);
    let progress = RecordingProgress::default();

    let reports = ingest_symbols(
        &provider,
        &store,
        &["BTCUSDT", "ETHUSDT"],
        Interval::OneMinute,
        1000,
        &progress,
    )
    .unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(
        *progress.lines.borrow(),
        vec!["BTCUSDT: 5 rows ingested", "ETHUSDT: 60 rows ingested"]
    );

    // The fixture crosses midnight, so its partition is the next day.
    let parts = store.partitions().unwrap();
    let keys: Vec<(&str, NaiveDate)> = parts.iter().map(|p| (p.symbol.as_str(), p.date)).collect();
    assert_eq!(
        keys,
        vec![
            ("BTCUSDT", NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()),
            ("ETHUSDT", NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()),
        ]
    );

    let reloaded = store
        .load("BTCUSDT", NaiveDate::from_ymd_opt(2024, 5, 2).unwrap())
        .unwrap();
    assert_eq!(reloaded, fixture_candles("BTCUSDT"));
}

#[test]
fn first_failure_halts_remaining_symbols() {
    let dir = tempfile::tempdir().unwrap();
    let store = ParquetStore::new(dir.path());

    let mut gappy = minute_batch("BTCUSDT", 10);
    gappy.remove(4);
    let provider = CannedProvider::new(vec![
        ("BTCUSDT", gappy),
        ("ETHUSDT", minute_batch("ETHUSDT", 10)),
    ]);

    let err = ingest_symbols(
        &provider,
        &store,
        &["BTCUSDT", "ETHUSDT"],
        Interval::OneMinute,
        10,
        &RecordingProgress::default(),
    )
    .unwrap_err();

    assert_eq!(err.symbol, "BTCUSDT");
    assert!(matches!(
        err.source,
        DataError::Validation(ValidationError::IrregularSpacing { index: 4, .. })
    ));
    assert_eq!(provider.calls(), vec!["BTCUSDT"]);
    assert!(store.partitions().unwrap().is_empty());
}

#[test]
fn http_failure_surfaces_with_symbol() {
    let dir = tempfile::tempdir().unwrap();
    let store = ParquetStore::new(dir.path());
    let provider = CannedProvider::new(vec![("BTCUSDT", minute_batch("BTCUSDT", 3))]);

    let err = ingest_symbols(
        &provider,
        &store,
        &["BTCUSDT", "DOGEUSDT"],
        Interval::OneMinute,
        3,
        &RecordingProgress::default(),
    )
    .unwrap_err();

    assert_eq!(err.symbol, "DOGEUSDT");
    assert!(err.to_string().contains("HTTP 400"), "got {err}");
    // The symbol before the failure was already written.
    assert_eq!(store.partitions().unwrap().len(), 1);
}

#[test]
fn rerun_same_day_replaces_partition() {
    let dir = tempfile::tempdir().unwrap();
    let store = ParquetStore::new(dir.path());

    for n in [30, 45] {
        let provider = CannedProvider::new(vec![("ETHUSDT", minute_batch("ETHUSDT", n))]);
        ingest_symbols(
            &provider,
            &store,
            &["ETHUSDT"],
            Interval::OneMinute,
            1000,
            &RecordingProgress::default(),
        )
        .unwrap();
    }

    let parts = store.partitions().unwrap();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].rows, 45);
}
