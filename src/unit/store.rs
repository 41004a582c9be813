use std::collections::{BTreeSet, HashMap};

use anyhow::{bail, Result};

use crate::geom::{Geometries, Projector};
use super::{geo_id::GeoId, record::UnitRecord, unit::{Unit, UnitSource}};

/// The polygon collection of one batch plus the per-unit records produced for it.
#[derive(Debug)]
pub struct UnitStore {
    index: HashMap<GeoId, u32>, // Map between geo_ids and contiguous batch indices.
    units: Vec<Unit>,
    records: Vec<UnitRecord>,
    geoms: Geometries,          // Planar shapes with an R-tree, in batch order.
}

impl UnitStore {
    /// Build a store from units already in the working CRS. GEOIDs must be unique.
    pub fn new(units: Vec<Unit>) -> Result<Self> {
        let mut index = HashMap::with_capacity(units.len());
        for (i, unit) in units.iter().enumerate() {
            if index.insert(unit.geo_id.clone(), i as u32).is_some() {
                bail!("[unit::store] Duplicate GEOID in unit collection: {}", unit.geo_id);
            }
        }

        let shapes = units.iter().map(|unit| unit.shape.clone()).collect::<Vec<_>>();

        Ok(Self {
            index,
            records: vec![UnitRecord::default(); units.len()],
            geoms: Geometries::new(&shapes),
            units,
        })
    }

    /// Build a store from lon/lat unit sources, projecting them to Web Mercator.
    pub fn from_sources(sources: Vec<UnitSource>) -> Result<Self> {
        let proj = Projector::web_mercator()?;
        let units = sources.into_iter()
            .map(|source| Unit::project(source, &proj))
            .collect::<Result<Vec<_>>>()?;
        Self::new(units)
    }

    /// Get the number of units.
    #[inline] pub fn len(&self) -> usize { self.units.len() }

    /// Check if the batch is empty.
    #[inline] pub fn is_empty(&self) -> bool { self.units.is_empty() }

    #[inline] pub fn units(&self) -> &[Unit] { &self.units }

    #[inline] pub fn records(&self) -> &[UnitRecord] { &self.records }

    #[inline] pub(crate) fn geoms(&self) -> &Geometries { &self.geoms }

    /// Batch index of the unit with the given GEOID.
    #[inline]
    pub fn position(&self, geo_id: &GeoId) -> Option<usize> {
        self.index.get(geo_id).map(|&i| i as usize)
    }

    /// Look up a unit and its record by GEOID.
    pub fn get(&self, geo_id: &GeoId) -> Option<(&Unit, &UnitRecord)> {
        self.position(geo_id).map(|i| (&self.units[i], &self.records[i]))
    }

    /// Iterate units with their records in batch order.
    pub fn iter(&self) -> impl Iterator<Item = (&Unit, &UnitRecord)> {
        self.units.iter().zip(self.records.iter())
    }

    /// Replace the records of the whole batch (one per unit, in batch order).
    pub fn attach(&mut self, records: Vec<UnitRecord>) -> Result<()> {
        if records.len() != self.units.len() {
            bail!("[unit::store] Expected {} records, got {}", self.units.len(), records.len());
        }
        self.records = records;
        Ok(())
    }

    /// Distinct (state, county) FIPS pairs covered by the batch, derived from GEOIDs.
    pub fn counties(&self) -> Result<Vec<(String, String)>> {
        let mut counties = BTreeSet::new();
        for unit in &self.units {
            match (unit.geo_id.state(), unit.geo_id.county()) {
                (Some(state), Some(county)) => { counties.insert((state.to_string(), county.to_string())); }
                _ => bail!("[unit::store] GEOID {} is too short to carry state and county codes", unit.geo_id),
            }
        }
        Ok(counties.into_iter().collect())
    }
}
