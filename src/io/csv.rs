//! Flat tables: per-index outputs, composite output, ledgers.

use std::{fs::File, path::Path, sync::Arc};

use anyhow::{bail, Context, Result};
use polars::prelude::*;

use crate::{
    index::{CompositeRecord, IndexKind, SubIndexTable},
    unit::{GeoId, UnitStore},
};
use super::{fs::write_atomic, geojson::coordinates_value};

/// Key column of every table.
pub(crate) const GEOID_COLUMN: &str = "GEOID";

/// Column of the planar area each density was computed from.
pub(crate) const AREA_COLUMN: &str = "Polygon Area";

/// Column of the lon/lat polygon coordinates (JSON text).
pub(crate) const COORDINATES_COLUMN: &str = "Coordinates";

/// Column of the composite score.
pub(crate) const PEI_COLUMN: &str = "PEI";

/// Force GEOID to be read as text, preserving leading zeros and avoiding numeric coercion.
fn geoid_schema() -> SchemaRef {
    Arc::new(Schema::from_iter([
        Field::new(GEOID_COLUMN.into(), DataType::String),
    ]))
}

/// Reads a CSV file from `path` into a Polars DataFrame, with GEOID as text.
pub(crate) fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv] Failed to open CSV file: {}", path.display()))?;
    CsvReadOptions::default()
        .with_has_header(true)
        .with_schema_overwrite(Some(geoid_schema()))
        .into_reader_with_file_handle(file)
        .finish()
        .with_context(|| format!("[io::csv] Failed to read CSV from {:?}", path))
}

/// Write a DataFrame to CSV bytes, with or without the header row.
pub(crate) fn write_csv_bytes(df: &mut DataFrame, header: bool) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    CsvWriter::new(&mut out)
        .include_header(header)
        .finish(df)
        .context("[io::csv] Failed to write CSV to bytes")?;
    Ok(out)
}

/// Write a DataFrame to a CSV file (write-then-rename).
pub(crate) fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let bytes = write_csv_bytes(df, true)?;
    write_atomic(path, &bytes)
        .with_context(|| format!("[io::csv] Failed to write CSV to {:?}", path))
}

/// Read a column as optional strings.
pub(crate) fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column.str()?.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Read a column as optional floats.
pub(crate) fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

/// Per-unit output table of one sub-index batch.
pub(crate) fn index_frame(store: &UnitStore, kind: IndexKind) -> Result<DataFrame> {
    let (mut geo_ids, mut measures, mut densities) = (Vec::new(), Vec::new(), Vec::new());
    let (mut indices, mut areas, mut coordinates) = (Vec::new(), Vec::new(), Vec::new());

    for (unit, record) in store.iter() {
        geo_ids.push(unit.geo_id.id().to_string());
        measures.push(record.measure);
        densities.push(record.density);
        indices.push(record.index);
        areas.push(record.area);
        coordinates.push(serde_json::to_string(&coordinates_value(&unit.lonlat))?);
    }

    let mut columns: Vec<Column> = vec![
        Series::new(GEOID_COLUMN.into(), geo_ids).into(),
        Series::new(kind.measure_column().into(), measures).into(),
    ];
    if let Some(name) = kind.density_column() {
        columns.push(Series::new(name.into(), densities).into());
    }
    columns.extend([
        Series::new(kind.code().into(), indices).into(),
        Series::new(AREA_COLUMN.into(), areas).into(),
        Series::new(COORDINATES_COLUMN.into(), coordinates).into(),
    ]);

    Ok(DataFrame::new(columns)?)
}

/// Composite output table: GEOID and PEI.
pub(crate) fn pei_frame(records: &[CompositeRecord]) -> Result<DataFrame> {
    let (geo_ids, scores) = records.iter()
        .map(|r| (r.geo_id.id().to_string(), r.pei()))
        .unzip::<_, _, Vec<_>, Vec<_>>();

    Ok(DataFrame::new(vec![
        Series::new(GEOID_COLUMN.into(), geo_ids).into(),
        Series::new(PEI_COLUMN.into(), scores).into(),
    ])?)
}

/// Read one sub-index column back from a per-index table.
/// A table without its index column is a fatal precondition failure.
pub(crate) fn read_index_table(path: &Path, kind: IndexKind) -> Result<SubIndexTable> {
    let df = read_csv(path)?;
    for name in [GEOID_COLUMN, kind.code()] {
        if df.column(name).is_err() {
            bail!("[io::csv] Missing required column '{name}' for PEI calculation in {}", path.display());
        }
    }

    let geo_ids = string_column(&df, GEOID_COLUMN)?;
    let values = f64_column(&df, kind.code())?;

    let rows = geo_ids.into_iter().zip(values)
        .enumerate()
        .map(|(i, (geo_id, value))| {
            let Some(geo_id) = geo_id else {
                bail!("[io::csv] Empty GEOID on row {} of {}", i + 1, path.display());
            };
            Ok((GeoId::new(geo_id)?, value.filter(|v| v.is_finite())))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SubIndexTable { kind, rows })
}
