mod bbox;
mod geom;
mod proj;

pub use bbox::LonLatBox;
pub(crate) use geom::Geometries;
pub(crate) use proj::Projector;
