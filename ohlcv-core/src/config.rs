//! Ingest configuration loaded from TOML.
//!
//! Every field is optional; omitted fields take the defaults that reproduce
//! the plain two-symbol minute-candle run.

use crate::data::binance::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
use crate::data::pipeline::DEFAULT_SYMBOLS;
use crate::data::provider::MAX_LIMIT;
use crate::data::store::DEFAULT_BASE_DIR;
use crate::domain::Interval;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value: {0}")]
    Invalid(String),
}

/// Settings for one ingest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Kline endpoint URL.
    pub endpoint: String,
    pub symbols: Vec<String>,
    pub interval: Interval,
    /// Candles requested per symbol (1..=1000).
    pub limit: u32,
    /// Root of the partitioned Parquet tree.
    pub base_dir: PathBuf,
    pub timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            interval: Interval::default(),
            limit: MAX_LIMIT,
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl IngestConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("symbols must not be empty".into()));
        }
        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "limit {} outside 1..={MAX_LIMIT}",
                self.limit
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be > 0".into()));
        }
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint must not be empty".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
