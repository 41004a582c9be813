use geo::{BoundingRect, MultiPolygon, Rect};
use rstar::{RTreeObject, AABB};

/// A bounding box in an R-tree, associated with a unit polygon by index.
#[derive(Debug, Clone)]
pub(super) struct BoundingBox {
    idx: usize, // Index of corresponding MultiPolygon in the batch
    bbox: Rect<f64>,
}

impl BoundingBox {
    pub(super) fn new(idx: usize, bbox: Rect<f64>) -> Self {
        Self { idx, bbox }
    }

    /// Get the index of the corresponding MultiPolygon.
    pub(super) fn idx(&self) -> usize { self.idx }
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// Geographic (lon/lat, degrees) bounding box used to query feature services.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLatBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl LonLatBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self { west, south, east, north }
    }

    /// Bounding box of a lon/lat shape, or None if it has no coordinates.
    pub fn of(shape: &MultiPolygon<f64>) -> Option<Self> {
        shape.bounding_rect()
            .map(|r| Self::new(r.min().x, r.min().y, r.max().x, r.max().y))
    }
}
