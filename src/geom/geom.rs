use geo::{BoundingRect, Intersects, MultiPolygon, Point};
use rstar::{RTree, AABB};

use super::bbox::BoundingBox;

/// Geometries is a collection of unit MultiPolygons with an R-tree over their bounding boxes.
#[derive(Debug, Clone)]
pub(crate) struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<BoundingBox>,
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    /// Empty polygons are kept (so indices line up) but never match a query.
    pub(crate) fn new(polygons: &[MultiPolygon<f64>]) -> Self {
        Self {
            rtree: RTree::bulk_load(
                polygons.iter().enumerate()
                    .filter_map(|(i, polygon)| Some(BoundingBox::new(i, polygon.bounding_rect()?)))
                    .collect()
            ),
            shapes: polygons.to_vec(),
        }
    }

    /// Get the number of MultiPolygons.
    #[inline] pub(crate) fn len(&self) -> usize { self.shapes.len() }

    /// Check if there are no MultiPolygons.
    #[inline] pub(crate) fn is_empty(&self) -> bool { self.shapes.is_empty() }

    /// Get a reference to the list of MultiPolygons.
    #[inline] pub(crate) fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    /// Find the unit that owns `point`.
    ///
    /// A point belongs to every polygon it intersects (interior or boundary); when more than
    /// one qualifies, e.g. on an edge shared by two neighbours, the lowest index wins.
    pub(crate) fn locate(&self, point: &Point<f64>) -> Option<usize> {
        let envelope = AABB::from_point([point.x(), point.y()]);
        self.rtree.locate_in_envelope_intersecting(&envelope)
            .map(|bbox| bbox.idx())
            .filter(|&idx| self.shapes[idx].intersects(point))
            .min()
    }

    /// Count the points owned by each unit. Points outside every unit are dropped.
    pub(crate) fn count_points<I>(&self, points: I) -> Vec<u64>
    where I: IntoIterator<Item = Point<f64>>
    {
        let mut counts = vec![0u64; self.len()];
        for point in points {
            if let Some(idx) = self.locate(&point) { counts[idx] += 1 }
        }
        counts
    }
}
