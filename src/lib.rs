#![doc = "Pedestrian Environment Index: per-unit sub-indices and their composite"]
mod aggregate;
mod batch;
mod config;
mod feature;
mod geom;
mod index;
mod io;
mod ledger;
mod unit;

#[doc(inline)]
pub use unit::{GeoId, GeoType, MeasureStatus, Unit, UnitRecord, UnitSource, UnitStore};

#[doc(inline)]
pub use geom::LonLatBox;

#[doc(inline)]
pub use feature::{
    build_query, decode, decode_census_rows, AsOf, Feature, FeatureCollection, FeatureFilter,
    FeatureSource, FetchError, LandParcel, NodeId, ParcelGeometry, PointFeature, PopulationRow,
    PopulationSource, PopulationTable, RoadElement, OVERPASS_URL, POPULATION_VARIABLE,
};

#[cfg(feature = "download")]
#[doc(inline)]
pub use feature::{CensusSource, OverpassSource};

#[doc(inline)]
pub use aggregate::{shannon_entropy, NodeDegrees};

#[doc(inline)]
pub use index::{combine, density, normalize, pei, CompositeRecord, IndexKind, Normalized, SubIndexTable, MISSING_FALLBACK};

#[doc(inline)]
pub use io::read_unit_collection;

#[doc(inline)]
pub use ledger::{Ledger, LedgerRow};

#[doc(inline)]
pub use config::Config;

#[doc(inline)]
pub use batch::{
    compute_population_index, compute_spatial_index, dedup_ledger, load_units, run_composite,
    run_index, run_population, write_batch, BatchReport, CompositeReport,
};
