mod composite;
mod kind;
mod normalize;

pub use composite::{combine, pei, CompositeRecord, SubIndexTable, MISSING_FALLBACK};
pub use kind::IndexKind;
pub use normalize::{density, normalize, Normalized};
