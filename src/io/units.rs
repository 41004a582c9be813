use std::path::Path;

use anyhow::{bail, Result};

use crate::unit::{GeoId, UnitSource};
use super::{geojson, shp};

/// TIGER vintages suffix attribute names with the census year (`GEOID20`, `ALAND10`, ...).
const FIELD_SUFFIXES: [&str; 3] = ["", "20", "10"];

/// Look up an attribute under its plain or year-suffixed name.
pub(crate) fn lookup<T>(base: &str, mut get: impl FnMut(&str) -> Result<Option<T>>) -> Result<Option<T>> {
    for suffix in FIELD_SUFFIXES {
        if let Some(value) = get(&format!("{base}{suffix}"))? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Read the identifying attributes through a per-format accessor for text and numeric fields.
pub(crate) fn read_fields(
    mut text: impl FnMut(&str) -> Result<Option<String>>,
    mut number: impl FnMut(&str) -> Result<Option<f64>>,
) -> Result<UnitFields> {
    let geo_id = match lookup("GEOID", &mut text)? {
        Some(id) => Some(id),
        None => text("geoid")?,
    };

    Ok(UnitFields {
        geo_id,
        state: lookup("STATEFP", &mut text)?,
        county: lookup("COUNTYFP", &mut text)?,
        tract: lookup("TRACTCE", &mut text)?,
        group: lookup("BLKGRPCE", &mut text)?,
        land_area_m2: lookup("ALAND", &mut number)?,
    })
}

/// Identifying attributes of one unit, however the source format stores them.
#[derive(Debug, Default, Clone)]
pub(crate) struct UnitFields {
    pub geo_id: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    pub tract: Option<String>,
    pub group: Option<String>,
    pub land_area_m2: Option<f64>,
}

impl UnitFields {
    /// GEOID attribute if present, else assembled from the FIPS component attributes.
    pub(crate) fn geo_id(&self, row: usize) -> Result<GeoId> {
        if let Some(id) = self.geo_id.as_deref().filter(|s| !s.trim().is_empty()) {
            return GeoId::new(id);
        }
        match (&self.state, &self.county, &self.tract) {
            (Some(state), Some(county), Some(tract)) =>
                GeoId::from_parts(state, county, tract, self.group.as_deref()),
            _ => bail!("[io::units] Feature {row} has neither a GEOID nor STATEFP/COUNTYFP/TRACTCE attributes"),
        }
    }

    pub(crate) fn into_source(self, row: usize, lonlat: geo::MultiPolygon<f64>) -> Result<UnitSource> {
        Ok(UnitSource {
            geo_id: self.geo_id(row)?,
            lonlat,
            land_area_m2: self.land_area_m2.filter(|a| a.is_finite()),
        })
    }
}

/// Read a unit collection (tracts or block groups) in lon/lat, dispatching on the file extension.
pub fn read_unit_collection(path: &Path) -> Result<Vec<UnitSource>> {
    let ext = path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("geojson" | "json") => geojson::read_units(path),
        Some("shp") => shp::read_units(path),
        _ => bail!("[io::units] Unsupported unit collection format: {}", path.display()),
    }
}
