use std::path::Path;

use anyhow::{bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile::{self as shp, dbase::{FieldValue, Record}, Reader, Shape};

use crate::unit::UnitSource;
use super::units::{read_fields, UnitFields};

/// Read a TIGER unit shapefile (NAD83 lon/lat) with its attribute table.
pub(crate) fn read_units(path: &Path) -> Result<Vec<UnitSource>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("[io::shp] Failed to open shapefile: {}", path.display()))?;

    let mut units = Vec::new();
    for (row, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result
            .with_context(|| format!("[io::shp] Error reading shape+record {row} of {}", path.display()))?;

        let lonlat = match shape {
            Shape::Polygon(polygon) => shp_to_geo(&polygon),
            other => bail!("[io::shp] Feature {row} is a {:?}, expected Polygon", other.shapetype()),
        };
        units.push(record_fields(&record)?.into_source(row, lonlat)?);
    }
    Ok(units)
}

/// Identifying attributes of one dBase record.
fn record_fields(record: &Record) -> Result<UnitFields> {
    read_fields(
        |name| Ok(match record.get(name) {
            Some(FieldValue::Character(Some(s))) => Some(s.trim().to_string()),
            _ => None,
        }),
        |name| Ok(match record.get(name) {
            Some(FieldValue::Numeric(Some(n))) => Some(*n),
            Some(FieldValue::Double(n)) => Some(*n),
            Some(FieldValue::Float(Some(n))) => Some(f64::from(*n)),
            Some(FieldValue::Integer(n)) => Some(f64::from(*n)),
            Some(FieldValue::Character(Some(s))) => s.trim().parse().ok(),
            _ => None,
        }),
    )
}

/// Convert a shapefile polygon to a MultiPolygon, grouping each outer ring with the
/// inner rings that follow it.
fn shp_to_geo(p: &shp::Polygon) -> MultiPolygon<f64> {
    fn ring(points: &[shp::Point]) -> LineString<f64> {
        let mut coords = points.iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect::<Vec<_>>();
        if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
            if first != last { coords.push(first) }
        }
        LineString(coords)
    }

    let mut polys = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes = Vec::new();

    for r in p.rings() {
        match r {
            shp::PolygonRing::Outer(points) => {
                if let Some(ext) = exterior.replace(ring(points)) {
                    polys.push(Polygon::new(ext, std::mem::take(&mut holes)));
                }
            }
            shp::PolygonRing::Inner(points) => holes.push(ring(points)),
        }
    }
    if let Some(ext) = exterior {
        polys.push(Polygon::new(ext, holes));
    }

    MultiPolygon(polys)
}
