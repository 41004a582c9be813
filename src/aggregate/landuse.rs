use std::collections::BTreeMap;

use anyhow::Result;
use geo::{Area, BooleanOps, BoundingRect, Intersects, MultiPolygon};

use crate::{feature::{LandParcel, ParcelGeometry}, geom::Projector};

/// Normalized Shannon entropy of an area distribution.
///
/// With k categories of positive area and shares pᵢ, returns −Σ pᵢ·ln(pᵢ) / ln(k).
/// Zero or one category, or zero total area, yields 0.
pub fn shannon_entropy<I>(areas: I) -> f64
where I: IntoIterator<Item = f64>
{
    let areas = areas.into_iter()
        .filter(|a| a.is_finite() && *a > 0.0)
        .collect::<Vec<_>>();
    let k = areas.len();
    let total: f64 = areas.iter().sum();
    if k <= 1 || total <= 0.0 { return 0.0 }

    let entropy: f64 = areas.iter()
        .map(|a| {
            let p = a / total;
            -p * p.ln()
        })
        .sum();
    (entropy / (k as f64).ln()).clamp(0.0, 1.0)
}

/// Total planar area per land-use category, clipped to `shape`.
/// Line parcels and parcels outside the unit contribute nothing.
pub(crate) fn category_areas<'a, I>(parcels: I, shape: &MultiPolygon<f64>, proj: &Projector) -> Result<BTreeMap<String, f64>>
where I: IntoIterator<Item = &'a LandParcel>
{
    let mut areas = BTreeMap::new();
    let Some(unit_bounds) = shape.bounding_rect() else { return Ok(areas) };

    for parcel in parcels {
        let ParcelGeometry::Polygon(polygon) = &parcel.geometry else { continue };
        let polygon = proj.geometry(polygon)?;
        let Some(bounds) = polygon.bounding_rect() else { continue };
        if !bounds.intersects(&unit_bounds) { continue }

        let clipped = polygon.intersection(shape).unsigned_area();
        if clipped.is_finite() && clipped > 0.0 {
            *areas.entry(parcel.category.clone()).or_insert(0.0) += clipped;
        }
    }
    Ok(areas)
}

/// Land-use entropy of one unit from its fetched parcels.
pub(crate) fn land_use_entropy<'a, I>(parcels: I, shape: &MultiPolygon<f64>, proj: &Projector) -> Result<f64>
where I: IntoIterator<Item = &'a LandParcel>
{
    let areas = category_areas(parcels, shape, proj)?;
    Ok(shannon_entropy(areas.into_values()))
}
