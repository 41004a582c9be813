use std::{fs, path::{Path, PathBuf}, time::Duration};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::{feature::OVERPASS_URL, index::IndexKind, ledger::Ledger};

/// First year with ACS 5-year estimates.
const FIRST_YEAR: u16 = 2009;

fn default_concurrency() -> usize { 4 }
fn default_timeout_secs() -> u64 { 60 }
fn default_overpass_url() -> String { OVERPASS_URL.to_string() }

/// Settings of one run. Built from command-line arguments or loaded from a JSON file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Census API key (PDI only).
    #[serde(default)]
    pub api_key: Option<String>,

    /// Local population table used for PDI instead of the Census service.
    #[serde(default)]
    pub population_csv: Option<PathBuf>,

    /// Unit collection (GeoJSON or shapefile, lon/lat).
    pub input_path: PathBuf,

    /// Outputs go to `{output_prefix}_{year}_{INDEX}.{csv,geojson}`.
    pub output_prefix: String,

    pub year: u16,

    /// Directory holding the per-index ledgers (`{INDEX}_aggregate.csv`).
    pub aggregate_path: PathBuf,

    /// Worker threads for per-unit fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Timeout of each external request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_overpass_url")]
    pub overpass_url: String,
}

impl Config {
    pub fn new(input_path: impl Into<PathBuf>, output_prefix: impl Into<String>, year: u16, aggregate_path: impl Into<PathBuf>) -> Self {
        Self {
            api_key: None,
            population_csv: None,
            input_path: input_path.into(),
            output_prefix: output_prefix.into(),
            year,
            aggregate_path: aggregate_path.into(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            overpass_url: default_overpass_url(),
        }
    }

    /// Load a config from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("[config] Failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("[config] Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Check ranges and required paths.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.year >= FIRST_YEAR && self.year <= 2099,
            "[config] Year {} out of range ({FIRST_YEAR}..=2099)", self.year);
        ensure!(!self.input_path.as_os_str().is_empty(), "[config] input_path must not be empty");
        ensure!(!self.output_prefix.trim().is_empty(), "[config] output_prefix must not be empty");
        ensure!(!self.aggregate_path.as_os_str().is_empty(), "[config] aggregate_path must not be empty");
        ensure!(self.concurrency > 0, "[config] concurrency must be at least 1");
        ensure!(self.timeout_secs > 0, "[config] timeout_secs must be at least 1");
        if let Some(path) = &self.population_csv {
            ensure!(!path.as_os_str().is_empty(), "[config] population_csv must not be empty when given");
        }
        Ok(())
    }

    #[inline] pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

    /// Output file of one index for the configured year, e.g. `tracts_2013_CDI.csv`.
    pub fn output_path(&self, code: &str, ext: &str) -> PathBuf {
        PathBuf::from(format!("{}_{}_{}.{}", self.output_prefix, self.year, code, ext))
    }

    /// Cross-year ledger of one sub-index.
    pub fn ledger(&self, kind: IndexKind) -> Ledger {
        Ledger::in_dir(&self.aggregate_path, kind)
    }
}
