mod geo_id;
mod geo_type;
mod record;
mod store;
mod unit;

pub use geo_id::GeoId;
pub use geo_type::GeoType;
pub use record::{MeasureStatus, UnitRecord};
pub use store::UnitStore;
pub use unit::{Unit, UnitSource};
