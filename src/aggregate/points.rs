use ahash::AHashSet;
use anyhow::Result;

use crate::{feature::PointFeature, geom::{Geometries, Projector}};

/// Drop copies of the same source point fetched through overlapping unit boxes.
/// Points without a source id are always kept.
pub(crate) fn dedup_points(points: Vec<PointFeature>) -> Vec<PointFeature> {
    let mut seen = AHashSet::with_capacity(points.len());
    points.into_iter()
        .filter(|p| p.id.is_none_or(|id| seen.insert(id)))
        .collect()
}

/// Count commercial points per unit: project the pooled lon/lat points and join them
/// against the unit polygons through the R-tree.
pub(crate) fn count_points(geoms: &Geometries, points: &[PointFeature], proj: &Projector) -> Result<Vec<u64>> {
    let projected = points.iter()
        .map(|p| proj.point(p.location))
        .collect::<Result<Vec<_>>>()?;
    Ok(geoms.count_points(projected))
}

#[cfg(test)]
mod tests {
    use geo::Point;

    use super::*;

    fn poi(id: Option<u64>, x: f64) -> PointFeature {
        PointFeature { id, location: Point::new(x, 0.0), category: "shop=bakery".into() }
    }

    #[test]
    fn dedup_by_source_id() {
        let points = vec![poi(Some(1), 0.0), poi(Some(2), 1.0), poi(Some(1), 0.0), poi(None, 2.0), poi(None, 2.0)];
        let kept = dedup_points(points);
        assert_eq!(kept.len(), 4);
        assert_eq!(kept.iter().filter(|p| p.id == Some(1)).count(), 1);
    }
}
