use anyhow::Result;
use geo::{Area, MultiPolygon};

use crate::geom::{LonLatBox, Projector};
use super::geo_id::GeoId;

/// An areal unit as read from a unit collection, before projection.
#[derive(Debug, Clone)]
pub struct UnitSource {
    pub geo_id: GeoId,
    pub lonlat: MultiPolygon<f64>,
    pub land_area_m2: Option<f64>,  // TIGER ALAND, if present
}

/// An areal unit with its geometry in lon/lat (for queries and output)
/// and in the planar CRS (for areas and containment).
#[derive(Debug, Clone)]
pub struct Unit {
    pub geo_id: GeoId,
    pub lonlat: MultiPolygon<f64>,
    pub shape: MultiPolygon<f64>,
    pub area: f64,                  // planar area (m²), 0 when degenerate
    pub land_area_m2: Option<f64>,
}

impl Unit {
    /// Build a unit from a planar shape that is already in the working CRS.
    pub fn new(geo_id: GeoId, lonlat: MultiPolygon<f64>, shape: MultiPolygon<f64>, land_area_m2: Option<f64>) -> Self {
        let area = shape.unsigned_area();
        Self {
            geo_id,
            lonlat,
            shape,
            area: if area.is_finite() { area } else { 0.0 },
            land_area_m2,
        }
    }

    /// Project a unit source into the working CRS.
    pub(crate) fn project(source: UnitSource, proj: &Projector) -> Result<Self> {
        let shape = proj.geometry(&source.lonlat)?;
        Ok(Self::new(source.geo_id, source.lonlat, shape, source.land_area_m2))
    }

    /// Lon/lat bounding box used to query feature sources.
    #[inline] pub fn bbox(&self) -> Option<LonLatBox> { LonLatBox::of(&self.lonlat) }

    /// Area in km² used for population density: land area when known, else the polygon area.
    pub fn area_km2(&self) -> f64 {
        self.land_area_m2
            .filter(|a| a.is_finite() && *a > 0.0)
            .unwrap_or(self.area) / 1e6
    }
}
