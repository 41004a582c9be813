//! Format-specific reading and writing: unit collections (GeoJSON, shapefile),
//! per-unit tables (CSV) and GeoJSON outputs.

mod csv;
mod fs;
mod geojson;
mod shp;
mod units;

pub use units::read_unit_collection;

pub(crate) use csv::{
    f64_column, index_frame, pei_frame, read_csv, read_index_table, string_column,
    write_csv, write_csv_bytes, GEOID_COLUMN,
};
pub(crate) use fs::{ensure_parent_exists, write_atomic};
pub(crate) use geojson::{read_geometries, write_index as write_index_geojson, write_pei as write_pei_geojson};
