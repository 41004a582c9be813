mod landuse;
mod points;
mod population;
mod roads;

pub use landuse::shannon_entropy;
pub use roads::NodeDegrees;

pub(crate) use landuse::land_use_entropy;
pub(crate) use points::{count_points, dedup_points};
pub(crate) use population::merge_population;
pub(crate) use roads::count_intersections_within;
