use std::{fmt, str::FromStr};

use anyhow::{bail, Result};

use crate::feature::FeatureFilter;

/// The four sub-indices of the Pedestrian Environment Index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKind {
    Population,     // PDI
    Commercial,     // CDI
    Intersection,   // IDI
    LandUse,        // LDI
}

impl IndexKind {
    /// Composite join order.
    pub const ALL: [IndexKind; 4] = [
        IndexKind::Population,
        IndexKind::Commercial,
        IndexKind::Intersection,
        IndexKind::LandUse,
    ];

    /// Column and file suffix, e.g. "CDI".
    pub fn code(&self) -> &'static str {
        match self {
            IndexKind::Population => "PDI",
            IndexKind::Commercial => "CDI",
            IndexKind::Intersection => "IDI",
            IndexKind::LandUse => "LDI",
        }
    }

    /// Column holding the raw measure.
    pub fn measure_column(&self) -> &'static str {
        match self {
            IndexKind::Population => "Population Count",
            IndexKind::Commercial => "Commercial Count",
            IndexKind::Intersection => "Intersection Count",
            IndexKind::LandUse => "Entropy",
        }
    }

    /// Column holding the density, if the index divides by area.
    pub fn density_column(&self) -> Option<&'static str> {
        match self {
            IndexKind::Population => Some("Population Density"),
            IndexKind::Commercial => Some("Commercial Density"),
            IndexKind::Intersection => Some("Intersection Density"),
            IndexKind::LandUse => None,
        }
    }

    /// Column of the value accumulated in the cross-year ledger.
    pub fn ledger_column(&self) -> &'static str {
        self.density_column().unwrap_or(self.measure_column())
    }

    /// Upper bound of the index: 100 for PDI, 1 otherwise.
    pub fn scale(&self) -> f64 {
        match self {
            IndexKind::Population => 100.0,
            _ => 1.0,
        }
    }

    /// LDI uses entropy directly; every other index divides its measure by area.
    #[inline] pub fn uses_area(&self) -> bool { !matches!(self, IndexKind::LandUse) }

    /// Feature family aggregated by this index, None for the population lookup.
    pub fn filter(&self) -> Option<FeatureFilter> {
        match self {
            IndexKind::Population => None,
            IndexKind::Commercial => Some(FeatureFilter::Commercial),
            IndexKind::Intersection => Some(FeatureFilter::Roads),
            IndexKind::LandUse => Some(FeatureFilter::LandUse),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for IndexKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PDI" => Ok(IndexKind::Population),
            "CDI" => Ok(IndexKind::Commercial),
            "IDI" => Ok(IndexKind::Intersection),
            "LDI" => Ok(IndexKind::LandUse),
            _ => bail!("Unknown sub-index: {s} (expected PDI, CDI, IDI or LDI)"),
        }
    }
}
