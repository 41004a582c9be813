use std::{fmt, sync::Arc};

use anyhow::{ensure, Result};

use super::geo_type::GeoType;

/// Stable key for an areal unit, used for every join in the crate.
/// Keeps the GEOID text as read (with leading zeros) but avoids repeated owned Strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeoId(Arc<str>);

impl GeoId {
    /// Wrap a GEOID string. Surrounding whitespace is stripped; empty ids are rejected.
    pub fn new(id: impl AsRef<str>) -> Result<Self> {
        let id = id.as_ref().trim();
        ensure!(!id.is_empty(), "[unit::geo_id] GEOID must not be empty");
        Ok(Self(Arc::from(id)))
    }

    /// Assemble a GEOID from its FIPS components.
    pub fn from_parts(state: &str, county: &str, tract: &str, group: Option<&str>) -> Result<Self> {
        let mut id = format!("{state}{county}{tract}");
        if let Some(group) = group { id.push_str(group) }
        Self::new(id)
    }

    #[inline] pub fn id(&self) -> &str { &self.0 }

    /// Summary level implied by the id length, if it is a standard tract or block group id.
    #[inline] pub fn ty(&self) -> Option<GeoType> { GeoType::from_id_len(self.0.len()) }

    /// Two-digit state FIPS prefix.
    #[inline] pub fn state(&self) -> Option<&str> { self.0.get(..2) }

    /// Three-digit county FIPS code (within the state).
    #[inline] pub fn county(&self) -> Option<&str> { self.0.get(2..5) }

    /// Six-digit tract code (within the county).
    #[inline] pub fn tract(&self) -> Option<&str> { self.0.get(5..11) }

    /// One-digit block group code (within the tract).
    #[inline] pub fn group(&self) -> Option<&str> { self.0.get(11..12) }

    /// Composite ledger key, e.g. `06001400100+2013`.
    pub fn with_year(&self, year: u16) -> String {
        format!("{}+{}", self.0, year)
    }
}

impl fmt::Display for GeoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
