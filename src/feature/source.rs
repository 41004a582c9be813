use std::time::Duration;

use thiserror::Error;

use crate::geom::LonLatBox;
use super::feature::FeatureCollection;

/// Which feature family to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureFilter {
    /// Shop nodes, selected amenity and leisure nodes.
    Commercial,
    /// Highway nodes and ways.
    Roads,
    /// Land-use ways and relations, with geometry.
    LandUse,
}

/// Point-in-time cutoff for a fetch, as an ISO-8601 UTC timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsOf(String);

impl AsOf {
    /// The first instant of `year`.
    pub fn year(year: u16) -> Self {
        Self(format!("{year:04}-01-01T00:00:00Z"))
    }

    #[inline] pub fn as_str(&self) -> &str { &self.0 }
}

/// A failed fetch. All variants are transient from the batch's point of view.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("service returned status {0}")]
    Status(u16),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// A remote (or in-memory) provider of tagged features.
///
/// An empty collection is a successful fetch; errors only signal that the
/// features for this polygon could not be obtained.
pub trait FeatureSource: Send + Sync {
    fn fetch(&self, bbox: &LonLatBox, as_of: &AsOf, filter: FeatureFilter) -> Result<FeatureCollection, FetchError>;
}
