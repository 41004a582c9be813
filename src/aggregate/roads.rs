use ahash::AHashMap;
use anyhow::Result;

use crate::{feature::{FeatureCollection, NodeId}, geom::{Geometries, Projector}};

/// How many way references each node has across a whole fetched set.
#[derive(Debug, Clone, Default)]
pub struct NodeDegrees {
    degree: AHashMap<NodeId, u32>,
}

impl NodeDegrees {
    /// Build the table from the node lists of every way. Every reference counts,
    /// so a node repeated inside one way (a closed loop) is counted each time.
    pub fn from_ways<'a, I>(ways: I) -> Self
    where I: IntoIterator<Item = &'a [NodeId]>
    {
        let mut degree = AHashMap::new();
        for nodes in ways {
            for &node in nodes {
                *degree.entry(node).or_insert(0) += 1;
            }
        }
        Self { degree }
    }

    #[inline] pub fn degree(&self, node: NodeId) -> u32 { self.degree.get(&node).copied().unwrap_or(0) }

    /// Nodes shared by two or more way references.
    pub fn intersections(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.degree.iter().filter(|(_, d)| **d > 1).map(|(n, _)| *n)
    }

    #[inline] pub fn count_intersections(&self) -> usize { self.intersections().count() }
}

/// Count the intersections of a unit's fetched road network that lie inside the unit.
///
/// Degrees are taken over all fetched ways before any partitioning. An intersection node
/// whose location was reported is kept only if the batch geometries assign it to `unit`
/// (a node on a shared edge goes to the lowest index, as for commercial points); nodes
/// without a reported location are kept, since the fetch was already scoped to the unit's box.
pub(crate) fn count_intersections_within(features: &FeatureCollection, geoms: &Geometries, unit: usize, proj: &Projector) -> Result<u64> {
    let degrees = NodeDegrees::from_ways(features.ways());
    let locations = features.nodes().collect::<AHashMap<_, _>>();

    let mut count = 0;
    for node in degrees.intersections() {
        let inside = match locations.get(&node) {
            Some(location) => geoms.locate(&proj.point(*location)?) == Some(unit),
            None => true,
        };
        if inside { count += 1 }
    }
    Ok(count)
}
