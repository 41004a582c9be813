//! Append-only per-index ledger of `(GEOID+year, value)` rows across runs.

use std::{
    collections::HashMap,
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{debug, info};

use crate::{
    index::IndexKind,
    io::{self, GEOID_COLUMN},
    unit::UnitStore,
};

/// One ledger row: composite `GEOID+year` key and the recorded value.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub key: String,
    pub value: Option<f64>,
}

impl LedgerRow {
    /// Ledger rows of one batch: each unit's density (entropy for LDI), in batch order.
    pub fn from_store(store: &UnitStore, year: u16) -> Vec<Self> {
        store.iter()
            .map(|(unit, record)| Self { key: unit.geo_id.with_year(year), value: record.density })
            .collect()
    }
}

/// A ledger file for one sub-index.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    value_column: &'static str,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>, kind: IndexKind) -> Self {
        Self { path: path.into(), value_column: kind.ledger_column() }
    }

    /// The ledger of `kind` inside `dir`, e.g. `CDI_aggregate.csv`.
    pub fn in_dir(dir: impl AsRef<Path>, kind: IndexKind) -> Self {
        Self::new(dir.as_ref().join(format!("{}_aggregate.csv", kind.code())), kind)
    }

    #[inline] pub fn path(&self) -> &Path { &self.path }

    #[inline] pub fn value_column(&self) -> &str { self.value_column }

    fn frame(&self, rows: &[LedgerRow]) -> Result<DataFrame> {
        let keys = rows.iter().map(|r| r.key.as_str()).collect::<Vec<_>>();
        let values = rows.iter().map(|r| r.value).collect::<Vec<_>>();
        Ok(DataFrame::new(vec![
            Series::new(GEOID_COLUMN.into(), keys).into(),
            Series::new(self.value_column.into(), values).into(),
        ])?)
    }

    /// Append rows. The header is written only when the file is new (or empty).
    /// Rows are never deduplicated here; re-running a year repeats its keys.
    pub fn append(&self, rows: &[LedgerRow]) -> Result<()> {
        io::ensure_parent_exists(&self.path)?;
        let fresh = std::fs::metadata(&self.path).map_or(true, |m| m.len() == 0);

        let bytes = io::write_csv_bytes(&mut self.frame(rows)?, fresh)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("[ledger] Failed to open {} for append", self.path.display()))?;
        file.write_all(&bytes)
            .with_context(|| format!("[ledger] Failed to append to {}", self.path.display()))?;

        debug!(path = %self.path.display(), rows = rows.len(), header = fresh, "appended ledger rows");
        Ok(())
    }

    /// Read every row, in file order.
    pub fn read(&self) -> Result<Vec<LedgerRow>> {
        let df = io::read_csv(&self.path)?;
        let keys = io::string_column(&df, GEOID_COLUMN)?;
        let values = io::f64_column(&df, self.value_column)?;

        Ok(keys.into_iter().zip(values)
            .filter_map(|(key, value)| key.map(|key| LedgerRow { key, value }))
            .collect())
    }

    /// Rewrite the ledger keeping the last row of every key, in order of first appearance.
    /// Returns the number of rows removed.
    pub fn dedup(&self) -> Result<usize> {
        let rows = self.read()?;
        let kept = dedup_rows(&rows);
        let removed = rows.len() - kept.len();

        let bytes = io::write_csv_bytes(&mut self.frame(&kept)?, true)?;
        io::write_atomic(&self.path, &bytes)?;

        info!(path = %self.path.display(), kept = kept.len(), removed, "deduplicated ledger");
        Ok(removed)
    }
}

/// Last row per key, ordered by each key's first appearance.
fn dedup_rows(rows: &[LedgerRow]) -> Vec<LedgerRow> {
    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut kept: Vec<LedgerRow> = Vec::new();
    for row in rows {
        match slot.get(row.key.as_str()) {
            Some(&i) => kept[i] = row.clone(),
            None => {
                slot.insert(&row.key, kept.len());
                kept.push(row.clone());
            }
        }
    }
    kept
}
