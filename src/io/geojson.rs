use std::{collections::HashMap, fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Map, Value};

use crate::{
    index::{CompositeRecord, IndexKind},
    unit::{GeoId, UnitSource, UnitStore},
};
use super::{
    csv::{AREA_COLUMN, COORDINATES_COLUMN, GEOID_COLUMN, PEI_COLUMN},
    fs::write_atomic,
    units::{read_fields, UnitFields},
};

/// Read a unit collection from a GeoJSON FeatureCollection in lon/lat.
pub(crate) fn read_units(path: &Path) -> Result<Vec<UnitSource>> {
    let bytes = fs::read(path)
        .with_context(|| format!("[io::geojson] Failed to read {}", path.display()))?;
    read_units_bytes(&bytes)
        .with_context(|| format!("[io::geojson] Failed to parse {}", path.display()))
}

/// Read a unit collection from GeoJSON bytes.
pub(crate) fn read_units_bytes(bytes: &[u8]) -> Result<Vec<UnitSource>> {
    let value: Value = serde_json::from_slice(bytes).context("[io::geojson] Invalid JSON")?;
    let features = value["features"].as_array()
        .ok_or_else(|| anyhow!("[io::geojson] Expected a FeatureCollection with a 'features' array"))?;

    features.iter().enumerate()
        .map(|(row, feature)| {
            let lonlat = parse_geometry(&feature["geometry"])
                .with_context(|| format!("[io::geojson] Feature {row} has no usable polygon geometry"))?;
            unit_fields(&feature["properties"], row)?.into_source(row, lonlat)
        })
        .collect()
}

/// Pull the identifying attributes out of a feature's properties.
/// A numeric GEOID is rejected: it has already lost its leading zeros.
fn unit_fields(properties: &Value, row: usize) -> Result<UnitFields> {
    read_fields(
        |name| match properties.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => bail!("[io::geojson] Feature {row}: attribute {name} must be text, found {other}"),
        },
        |name| Ok(match properties.get(name) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }),
    )
}

/// Parse a GeoJSON Polygon or MultiPolygon geometry.
fn parse_geometry(geometry: &Value) -> Result<MultiPolygon<f64>> {
    let coords = geometry["coordinates"].as_array()
        .ok_or_else(|| anyhow!("[io::geojson] Geometry has no coordinates"))?;

    match geometry["type"].as_str() {
        Some("Polygon") => Ok(MultiPolygon(vec![parse_polygon(coords)?])),
        Some("MultiPolygon") => coords.iter()
            .map(|p| p.as_array()
                .ok_or_else(|| anyhow!("[io::geojson] Invalid MultiPolygon member"))
                .and_then(|rings| parse_polygon(rings)))
            .collect::<Result<Vec<_>>>()
            .map(MultiPolygon),
        other => bail!("[io::geojson] Unsupported geometry type: {other:?}"),
    }
}

/// Parse polygon rings: exterior first, then holes.
fn parse_polygon(rings: &[Value]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter()
        .map(|ring| ring.as_array()
            .ok_or_else(|| anyhow!("[io::geojson] Invalid polygon ring"))
            .and_then(|r| parse_ring(r)));

    let exterior = rings.next()
        .ok_or_else(|| anyhow!("[io::geojson] Polygon is missing its exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Parse a ring of `[x, y]` positions, closing it if needed.
fn parse_ring(coords: &[Value]) -> Result<LineString<f64>> {
    let mut points = coords.iter()
        .map(|pair| match pair.as_array().map(Vec::as_slice) {
            Some([x, y, ..]) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => bail!("[io::geojson] Invalid coordinate: x and y must be numbers"),
            },
            _ => bail!("[io::geojson] Invalid position: {pair}"),
        })
        .collect::<Result<Vec<_>>>()?;

    if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
        if first != last { points.push(first) }
    }
    Ok(LineString(points))
}

/// GeoJSON coordinates of a unit: Polygon nesting for a single part, MultiPolygon otherwise.
pub(crate) fn coordinates_value(mp: &MultiPolygon<f64>) -> Value {
    fn polygon(p: &Polygon<f64>) -> Value {
        let ring = |ls: &LineString<f64>| ls.coords().map(|c| vec![c.x, c.y]).collect::<Vec<_>>();
        Value::Array(std::iter::once(p.exterior()).chain(p.interiors())
            .map(|ls| json!(ring(ls)))
            .collect())
    }

    match mp.0.as_slice() {
        [single] => polygon(single),
        parts => Value::Array(parts.iter().map(polygon).collect()),
    }
}

/// GeoJSON geometry object of a unit.
pub(crate) fn geometry_value(mp: &MultiPolygon<f64>) -> Value {
    let ty = if mp.0.len() == 1 { "Polygon" } else { "MultiPolygon" };
    json!({ "type": ty, "coordinates": coordinates_value(mp) })
}

fn feature_collection(features: Vec<Value>) -> Value {
    json!({ "type": "FeatureCollection", "features": features })
}

fn write_value(path: &Path, value: &Value) -> Result<()> {
    let bytes = serde_json::to_vec(value).context("[io::geojson] Failed to serialize GeoJSON")?;
    write_atomic(path, &bytes)
        .with_context(|| format!("[io::geojson] Failed to write {}", path.display()))
}

/// Write the per-unit output of one sub-index batch, with lon/lat geometry.
pub(crate) fn write_index(path: &Path, store: &UnitStore, kind: IndexKind) -> Result<()> {
    let features = store.iter()
        .map(|(unit, record)| {
            let mut properties = Map::new();
            properties.insert(GEOID_COLUMN.into(), json!(unit.geo_id.id()));
            properties.insert(kind.measure_column().into(), json!(record.measure));
            if let Some(name) = kind.density_column() {
                properties.insert(name.into(), json!(record.density));
            }
            properties.insert(kind.code().into(), json!(record.index));
            properties.insert(AREA_COLUMN.into(), json!(record.area));
            properties.insert(COORDINATES_COLUMN.into(), coordinates_value(&unit.lonlat));

            json!({
                "type": "Feature",
                "id": unit.geo_id.id(),
                "geometry": geometry_value(&unit.lonlat),
                "properties": properties,
            })
        })
        .collect();

    write_value(path, &feature_collection(features))
}

/// Read unit geometries keyed by GEOID (used to attach geometry to the composite output).
pub(crate) fn read_geometries(path: &Path) -> Result<HashMap<GeoId, MultiPolygon<f64>>> {
    Ok(read_units(path)?.into_iter()
        .map(|source| (source.geo_id, source.lonlat))
        .collect())
}

/// Write the composite output. Units without a known geometry get a null geometry.
pub(crate) fn write_pei(path: &Path, records: &[CompositeRecord], geometries: &HashMap<GeoId, MultiPolygon<f64>>) -> Result<()> {
    let features = records.iter()
        .map(|record| {
            let geometry = geometries.get(&record.geo_id)
                .map(geometry_value)
                .unwrap_or(Value::Null);
            json!({
                "type": "Feature",
                "id": record.geo_id.id(),
                "geometry": geometry,
                "properties": {
                    GEOID_COLUMN: record.geo_id.id(),
                    PEI_COLUMN: record.pei(),
                },
            })
        })
        .collect();

    write_value(path, &feature_collection(features))
}
