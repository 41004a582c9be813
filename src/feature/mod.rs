mod feature;
mod overpass;
mod population;
mod source;

pub use feature::{Feature, FeatureCollection, LandParcel, NodeId, ParcelGeometry, PointFeature, RoadElement};
pub use overpass::{build_query, decode, OVERPASS_URL};
pub use population::{
    decode_census_rows, PopulationRow, PopulationSource, PopulationTable, POPULATION_VARIABLE,
    TABLE_LAND_COLUMN, TABLE_POPULATION_COLUMN,
};
pub use source::{AsOf, FeatureFilter, FeatureSource, FetchError};

#[cfg(feature = "download")]
pub use overpass::OverpassSource;
#[cfg(feature = "download")]
pub use population::CensusSource;
