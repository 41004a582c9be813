use std::collections::HashMap;

use geo::{Coord, Intersects, LineString, Point, Polygon};
use serde::Deserialize;

use crate::geom::LonLatBox;
use super::{
    feature::{Feature, FeatureCollection, LandParcel, PointFeature, RoadElement},
    source::{AsOf, FeatureFilter, FetchError},
};

/// Public Overpass API endpoint.
pub const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Amenity values counted as commercial.
const AMENITIES: &str = "restaurant|cafe|bank|school|cinema";

/// Leisure values counted as commercial.
const LEISURE: &str = "park|sports_centre|stadium";

/// Build the Overpass QL query for a bounding box, cutoff and feature family.
pub fn build_query(bbox: &LonLatBox, as_of: &AsOf, filter: FeatureFilter, timeout_secs: u64) -> String {
    // Overpass boxes are (south, west, north, east).
    let b = format!("({},{},{},{})", bbox.south, bbox.west, bbox.north, bbox.east);
    let header = format!("[out:json][timeout:{timeout_secs}][date:\"{}\"];", as_of.as_str());

    match filter {
        FeatureFilter::Commercial => format!(
            "{header}\n(\n  node[\"shop\"]{b};\n  node[\"amenity\"~\"{AMENITIES}\"]{b};\n  node[\"leisure\"~\"{LEISURE}\"]{b};\n);\nout body;\n"
        ),
        FeatureFilter::Roads => format!(
            "{header}\n(\n  node[highway]{b};\n  way[highway]{b};\n);\nout body;\n>;\nout skel qt;\n"
        ),
        FeatureFilter::LandUse => format!(
            "{header}\n(\n  way[\"landuse\"]{b};\n  relation[\"landuse\"]{b};\n);\nout geom;\n"
        ),
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct Member {
    #[serde(default)]
    role: String,
    #[serde(default)]
    geometry: Vec<Option<LatLon>>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(rename = "type")]
    kind: String,
    id: u64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    nodes: Vec<u64>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    geometry: Vec<Option<LatLon>>,
    #[serde(default)]
    members: Vec<Member>,
}

impl Element {
    fn location(&self) -> Option<Point<f64>> {
        Some(Point::new(self.lon?, self.lat?))
    }

    /// First commercial tag as "key=value".
    fn commercial_category(&self) -> String {
        ["shop", "amenity", "leisure"].iter()
            .find_map(|key| self.tags.get(*key).map(|value| format!("{key}={value}")))
            .unwrap_or_default()
    }
}

/// Vertices of an `out geom` geometry array, skipping unresolved (null) entries.
fn coords(geometry: &[Option<LatLon>]) -> Vec<Coord<f64>> {
    geometry.iter().flatten().map(|p| Coord { x: p.lon, y: p.lat }).collect()
}

/// Join way segments end to end into closed rings.
///
/// Segments may be stored in either direction. A chain that cannot be closed is closed
/// with a straight edge; rings with fewer than three distinct vertices are dropped.
fn assemble_rings(mut segments: Vec<Vec<Coord<f64>>>) -> Vec<LineString<f64>> {
    segments.retain(|s| !s.is_empty());
    let mut rings = Vec::new();

    while let Some(mut ring) = segments.pop() {
        while ring.len() < 2 || ring.first() != ring.last() {
            let Some(end) = ring.last().copied() else { break };
            let Some(i) = segments.iter().position(|s| s.first() == Some(&end) || s.last() == Some(&end)) else { break };

            let mut next = segments.swap_remove(i);
            if next.first() != Some(&end) { next.reverse() }
            ring.extend(next.into_iter().skip(1));
        }

        let mut ring = LineString(ring);
        ring.close();
        // A closed ring repeats its first vertex.
        if ring.0.len() >= 4 { rings.push(ring) }
    }
    rings
}

/// Polygons of a multipolygon relation: assembled outer rings, each with the inner
/// rings that fall inside it.
fn relation_polygons(members: &[Member]) -> Vec<Polygon<f64>> {
    let segments = |role: &str| members.iter()
        .filter(|m| m.role == role)
        .map(|m| coords(&m.geometry))
        .collect::<Vec<_>>();

    let mut polygons = assemble_rings(segments("outer")).into_iter()
        .map(|exterior| Polygon::new(exterior, vec![]))
        .collect::<Vec<_>>();

    for inner in assemble_rings(segments("inner")) {
        if let Some(outer) = polygons.iter_mut().find(|p| p.intersects(&inner)) {
            outer.interiors_push(inner);
        }
    }
    polygons
}

/// Decode an Overpass JSON response into features of the requested family.
pub fn decode(body: &str, filter: FeatureFilter) -> Result<FeatureCollection, FetchError> {
    let response: Response = serde_json::from_str(body)
        .map_err(|e| FetchError::Decode(e.to_string()))?;

    let mut features = FeatureCollection::default();
    for element in &response.elements {
        match (filter, element.kind.as_str()) {
            (FeatureFilter::Commercial, "node") => {
                let Some(location) = element.location() else { continue };
                features.push(Feature::Point(PointFeature {
                    id: Some(element.id),
                    location,
                    category: element.commercial_category(),
                }));
            }
            (FeatureFilter::Roads, "node") => {
                let Some(location) = element.location() else { continue };
                features.push(Feature::Road(RoadElement::Node { id: element.id, location }));
            }
            (FeatureFilter::Roads, "way") => {
                features.push(Feature::Road(RoadElement::Way { id: element.id, nodes: element.nodes.clone() }));
            }
            (FeatureFilter::LandUse, "way") if !element.geometry.is_empty() => {
                let category = element.tags.get("landuse").cloned().unwrap_or_default();
                features.push(Feature::LandParcel(LandParcel::from_coords(category, coords(&element.geometry))));
            }
            (FeatureFilter::LandUse, "relation") => {
                let category = element.tags.get("landuse").cloned().unwrap_or_default();
                for polygon in relation_polygons(&element.members) {
                    features.push(Feature::LandParcel(LandParcel::from_polygon(category.clone(), polygon)));
                }
            }
            _ => {}
        }
    }
    Ok(features)
}

#[cfg(feature = "download")]
pub use client::OverpassSource;

#[cfg(feature = "download")]
mod client {
    use std::time::Duration;

    use anyhow::{Context, Result};
    use reqwest::{blocking::Client, redirect::Policy};

    use crate::{feature::{AsOf, FeatureCollection, FeatureFilter, FeatureSource, FetchError}, geom::LonLatBox};
    use super::{build_query, decode};

    /// Feature source backed by an Overpass API instance.
    #[derive(Debug, Clone)]
    pub struct OverpassSource {
        client: Client,
        endpoint: String,
        timeout: Duration,
    }

    impl OverpassSource {
        pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
            let client = Client::builder()
                .user_agent(concat!("pedindex/", env!("CARGO_PKG_VERSION")))
                .redirect(Policy::limited(10))
                .timeout(timeout)
                .build()
                .context("[feature::overpass] Failed to build HTTP client")?;
            Ok(Self { client, endpoint: endpoint.into(), timeout })
        }
    }

    impl FeatureSource for OverpassSource {
        fn fetch(&self, bbox: &LonLatBox, as_of: &AsOf, filter: FeatureFilter) -> Result<FeatureCollection, FetchError> {
            let query = build_query(bbox, as_of, filter, self.timeout.as_secs());

            let resp = self.client.get(&self.endpoint)
                .query(&[("data", query.as_str())])
                .send()
                .map_err(|e| if e.is_timeout() { FetchError::Timeout(self.timeout) } else { FetchError::Http(e.to_string()) })?;

            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }

            let body = resp.text()
                .map_err(|e| if e.is_timeout() { FetchError::Timeout(self.timeout) } else { FetchError::Http(e.to_string()) })?;
            decode(&body, filter)
        }
    }
}
