//! OHLCV CLI — ingest and status commands.
//!
//! Commands:
//! - `ingest` — fetch recent klines per symbol, validate, write Parquet
//! - `status` — list stored partitions with row counts and sizes

mod logging;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ohlcv_core::config::IngestConfig;
use ohlcv_core::data::{ingest_symbols, BinanceProvider, ParquetStore, StdoutProgress};
use ohlcv_core::domain::Interval;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "ohlcv",
    about = "OHLCV CLI — fetch kline candles and store them as partitioned Parquet"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Ingest settings given on the command line. Unset fields fall through to
/// the config file, then to built-in defaults.
#[derive(Args, Debug, Default)]
struct IngestOverrides {
    /// Symbols to ingest (e.g., BTCUSDT ETHUSDT). Defaults to BTCUSDT ETHUSDT.
    symbols: Vec<String>,

    /// Kline interval (1m, 5m, 1h, ...). Defaults to 1m.
    #[arg(long)]
    interval: Option<Interval>,

    /// Candles per symbol (1-1000). Defaults to 1000.
    #[arg(long)]
    limit: Option<u32>,

    /// Root of the partitioned store. Defaults to ./data/raw/market.
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Kline endpoint URL.
    #[arg(long)]
    endpoint: Option<String>,

    /// Request timeout in seconds. Defaults to 10.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, validate, and store recent candles for each symbol.
    Ingest {
        /// TOML config file; flags given on the command line take precedence.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: IngestOverrides,
    },
    /// Report stored partitions: symbol, date, rows, size.
    Status {
        /// Root of the partitioned store. Defaults to ./data/raw/market.
        #[arg(long, default_value = ohlcv_core::data::store::DEFAULT_BASE_DIR)]
        base_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { config, overrides } => {
            let file = config
                .map(|path| {
                    IngestConfig::from_file(&path)
                        .with_context(|| format!("loading {}", path.display()))
                })
                .transpose()?;
            run_ingest(&resolve_config(file, overrides)?)
        }
        Commands::Status { base_dir } => run_status(&base_dir),
    }
}

/// Layer command-line flags over the config file (or defaults when absent).
fn resolve_config(file: Option<IngestConfig>, overrides: IngestOverrides) -> Result<IngestConfig> {
    let mut cfg = file.unwrap_or_default();
    if !overrides.symbols.is_empty() {
        cfg.symbols = overrides.symbols;
    }
    if let Some(interval) = overrides.interval {
        cfg.interval = interval;
    }
    if let Some(limit) = overrides.limit {
        cfg.limit = limit;
    }
    if let Some(base_dir) = overrides.base_dir {
        cfg.base_dir = base_dir;
    }
    if let Some(endpoint) = overrides.endpoint {
        cfg.endpoint = endpoint;
    }
    if let Some(timeout_secs) = overrides.timeout_secs {
        cfg.timeout_secs = timeout_secs;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn run_ingest(cfg: &IngestConfig) -> Result<()> {
    tracing::debug!(?cfg, "resolved ingest config");
    let provider = BinanceProvider::new(cfg.endpoint.clone(), cfg.timeout())?;
    let store = ParquetStore::new(&cfg.base_dir);
    let sym_refs: Vec<&str> = cfg.symbols.iter().map(|s| s.as_str()).collect();

    ingest_symbols(
        &provider,
        &store,
        &sym_refs,
        cfg.interval,
        cfg.limit,
        &StdoutProgress,
    )?;

    Ok(())
}

fn run_status(base_dir: &Path) -> Result<()> {
    let store = ParquetStore::new(base_dir);
    let parts = store.partitions()?;

    if parts.is_empty() {
        println!("No partitions under {}", base_dir.display());
        return Ok(());
    }

    let total: u64 = parts.iter().map(|p| p.bytes).sum();
    println!("Store: {}", base_dir.display());
    println!("Partitions: {}", parts.len());
    println!("Total size: {}", format_size(total));
    println!();
    println!("{:<12} {:<12} {:>8} {:>10}", "Symbol", "Date", "Rows", "Size");
    println!("{}", "-".repeat(45));
    for p in &parts {
        println!(
            "{:<12} {:<12} {:>8} {:>10}",
            p.symbol,
            p.date.to_string(),
            p.rows,
            format_size(p.bytes)
        );
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
