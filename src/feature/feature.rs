use geo::{Coord, LineString, Point, Polygon};

/// OpenStreetMap node id.
pub type NodeId = u64;

/// A tagged point of interest (shop, amenity, leisure).
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub id: Option<u64>,    // Source id, used to drop copies fetched by overlapping boxes
    pub location: Point<f64>,
    pub category: String,   // e.g. "shop=bakery"
}

/// An element of the road network.
#[derive(Debug, Clone, PartialEq)]
pub enum RoadElement {
    Node { id: NodeId, location: Point<f64> },
    Way { id: u64, nodes: Vec<NodeId> },
}

/// Geometry of a land-use feature. Lines carry no area.
#[derive(Debug, Clone, PartialEq)]
pub enum ParcelGeometry {
    Polygon(Polygon<f64>),
    Line(LineString<f64>),
}

/// A land-use polygon (or degenerate line) with its category tag.
#[derive(Debug, Clone, PartialEq)]
pub struct LandParcel {
    pub category: String,   // e.g. "residential", may be empty
    pub geometry: ParcelGeometry,
}

impl LandParcel {
    /// Build a parcel from a vertex list: three or more vertices form a polygon, fewer a line.
    pub fn from_coords(category: impl Into<String>, coords: Vec<Coord<f64>>) -> Self {
        let geometry = if coords.len() < 3 {
            ParcelGeometry::Line(LineString(coords))
        } else {
            ParcelGeometry::Polygon(Polygon::new(LineString(coords), vec![]))
        };
        Self { category: category.into(), geometry }
    }

    /// A parcel from an assembled polygon (e.g. a multipolygon relation with holes).
    pub fn from_polygon(category: impl Into<String>, polygon: Polygon<f64>) -> Self {
        Self { category: category.into(), geometry: ParcelGeometry::Polygon(polygon) }
    }
}

/// One fetched feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Point(PointFeature),
    Road(RoadElement),
    LandParcel(LandParcel),
}

/// The features fetched for one polygon and one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self { Self { features } }

    #[inline] pub fn len(&self) -> usize { self.features.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    #[inline] pub fn push(&mut self, feature: Feature) { self.features.push(feature) }

    #[inline] pub fn iter(&self) -> impl Iterator<Item = &Feature> { self.features.iter() }

    pub fn points(&self) -> impl Iterator<Item = &PointFeature> {
        self.features.iter().filter_map(|f| match f {
            Feature::Point(p) => Some(p),
            _ => None,
        })
    }

    /// Node id lists of every way.
    pub fn ways(&self) -> impl Iterator<Item = &[NodeId]> {
        self.features.iter().filter_map(|f| match f {
            Feature::Road(RoadElement::Way { nodes, .. }) => Some(nodes.as_slice()),
            _ => None,
        })
    }

    /// Locations of road nodes, where the source reported them.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, Point<f64>)> {
        self.features.iter().filter_map(|f| match f {
            Feature::Road(RoadElement::Node { id, location }) => Some((*id, *location)),
            _ => None,
        })
    }

    pub fn parcels(&self) -> impl Iterator<Item = &LandParcel> {
        self.features.iter().filter_map(|f| match f {
            Feature::LandParcel(p) => Some(p),
            _ => None,
        })
    }

    pub fn into_points(self) -> Vec<PointFeature> {
        self.features.into_iter().filter_map(|f| match f {
            Feature::Point(p) => Some(p),
            _ => None,
        }).collect()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self { features: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use geo::{coord, Point};

    use super::*;

    #[test]
    fn short_vertex_lists_become_lines() {
        let parcel = LandParcel::from_coords("farmland", vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 0.0 }]);
        assert!(matches!(parcel.geometry, ParcelGeometry::Line(_)));

        let parcel = LandParcel::from_coords("farmland", vec![
            coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 },
        ]);
        assert!(matches!(parcel.geometry, ParcelGeometry::Polygon(_)));
    }

    #[test]
    fn accessors_split_by_variant() {
        let fc: FeatureCollection = [
            Feature::Point(PointFeature { id: Some(1), location: Point::new(0.0, 0.0), category: "shop=bakery".into() }),
            Feature::Road(RoadElement::Node { id: 7, location: Point::new(1.0, 1.0) }),
            Feature::Road(RoadElement::Way { id: 2, nodes: vec![7, 8] }),
        ].into_iter().collect();

        assert_eq!(fc.len(), 3);
        assert_eq!(fc.points().count(), 1);
        assert_eq!(fc.ways().collect::<Vec<_>>(), vec![&[7u64, 8][..]]);
        assert_eq!(fc.nodes().map(|(id, _)| id).collect::<Vec<_>>(), vec![7]);
        assert_eq!(fc.parcels().count(), 0);
    }
}
