//! Road graph: an immutable-after-build directed multigraph of edges.
//!
//! Each [`Edge`] carries its own geometry, free-flow speed, and capacity —
//! there is no separate node-position table the way a Dijkstra-oriented
//! graph would have one; nodes exist only as the join keys `from_node`/
//! `to_node` that the [`RouteBuilder`](crate::router::RouteBuilder) and the
//! microsimulation loop use to chain edges together.

use std::collections::HashMap;

use tw_core::{Coord, EdgeId, NodeId};

use crate::error::{GraphError, GraphResult};

// ── Highway classification table ─────────────────────────────────────────────

/// Free-flow speed (km/h) and base per-lane capacity (vehicles/hour) for a
/// road's `highway` tag. Unknown classes fall back to `DEFAULT`.
struct HighwayClass {
    speed_kmh: f64,
    base_capacity: u32,
}

const MOTORWAY: HighwayClass = HighwayClass { speed_kmh: 110.0, base_capacity: 2000 };
const TRUNK: HighwayClass = HighwayClass { speed_kmh: 90.0, base_capacity: 1500 };
const PRIMARY: HighwayClass = HighwayClass { speed_kmh: 70.0, base_capacity: 1200 };
const SECONDARY: HighwayClass = HighwayClass { speed_kmh: 60.0, base_capacity: 800 };
const TERTIARY: HighwayClass = HighwayClass { speed_kmh: 50.0, base_capacity: 600 };
const RESIDENTIAL: HighwayClass = HighwayClass { speed_kmh: 30.0, base_capacity: 400 };
const UNCLASSIFIED: HighwayClass = HighwayClass { speed_kmh: 40.0, base_capacity: 300 };
const DEFAULT_CLASS: HighwayClass = HighwayClass { speed_kmh: 40.0, base_capacity: 300 };

fn classify(highway: &str) -> &'static HighwayClass {
    match highway {
        "motorway" => &MOTORWAY,
        "trunk" => &TRUNK,
        "primary" => &PRIMARY,
        "secondary" => &SECONDARY,
        "tertiary" => &TERTIARY,
        "residential" => &RESIDENTIAL,
        "unclassified" => &UNCLASSIFIED,
        _ => &DEFAULT_CLASS,
    }
}

/// Road classes with no car capacity at all — dropped entirely at ingestion.
fn is_excluded(highway: &str) -> bool {
    matches!(highway, "footway" | "cycleway" | "path" | "steps" | "service")
}

// ── Raw input type (what a provider hands the builder) ───────────────────────

/// A raw road as returned by a road-network provider, before ingestion.
/// Immutable once constructed.
#[derive(Clone, Debug)]
pub struct Road {
    pub id: String,
    pub node_ids: Vec<i64>,
    pub tags: HashMap<String, String>,
    pub geometry: Vec<Coord>,
}

impl Road {
    fn highway(&self) -> &str {
        self.tags.get("highway").map(String::as_str).unwrap_or("")
    }

    fn lanes(&self) -> u32 {
        self.tags
            .get("lanes")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&n| n >= 1)
            .unwrap_or(1)
    }
}

// ── Edge ──────────────────────────────────────────────────────────────────────

/// A directed road-graph edge. Geometry, length, and `from_node`/`to_node`
/// are fixed at build time; `speed`/`capacity` are the only fields the
/// [marker impact applier](crate) mutates afterward.
#[derive(Clone, Debug)]
pub struct Edge {
    pub id: EdgeId,
    pub road_id: String,
    pub from_node: NodeId,
    pub to_node: NodeId,
    pub lanes: u32,
    /// Current speed, km/h. Starts at the highway class's free-flow speed;
    /// reduced by construction markers. Invariant: `>= 5.0` after any mutation.
    pub speed: f64,
    /// Highway-class free-flow speed, km/h. Never mutated after ingestion —
    /// this is the ceiling the microsimulation targets absent congestion.
    pub free_flow_speed: f64,
    /// Length in metres, sum of great-circle distances between consecutive
    /// geometry points. Invariant: `> 0.0`.
    pub length_m: f64,
    /// Current capacity, vehicles/hour. Invariant: `>= 10` after any mutation.
    pub capacity: u32,
    pub geometry: Vec<Coord>,
}

impl Edge {
    /// First geometry vertex — used for marker-proximity and distant-edge
    /// distance checks throughout the crate.
    #[inline]
    pub fn start(&self) -> Coord {
        self.geometry[0]
    }

    #[inline]
    pub fn end(&self) -> Coord {
        *self.geometry.last().unwrap()
    }
}

// ── RoadGraph ─────────────────────────────────────────────────────────────────

/// Immutable-after-build directed multigraph. `edge_by_id` is a dense vector
/// indexed by `EdgeId`; `outgoing_by_from_node` indexes the same edges by
/// their source node for route-walking.
pub struct RoadGraph {
    edges: Vec<Edge>,
    outgoing_by_from_node: HashMap<NodeId, Vec<EdgeId>>,
}

impl RoadGraph {
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        &mut self.edges[id.index()]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Distinct node count, derived from the from/to node set. Roads carry
    /// their OSM node ids directly, so this is a set over all of them.
    pub fn node_count(&self) -> usize {
        let mut nodes: std::collections::HashSet<NodeId> = std::collections::HashSet::new();
        for e in &self.edges {
            nodes.insert(e.from_node);
            nodes.insert(e.to_node);
        }
        nodes.len()
    }

    pub fn outgoing(&self, node: NodeId) -> &[EdgeId] {
        self.outgoing_by_from_node.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Builds a [`RoadGraph`] from raw [`Road`]s returned by a network provider.
pub struct RoadGraphBuilder {
    roads: Vec<Road>,
}

impl RoadGraphBuilder {
    pub fn new() -> Self {
        Self { roads: Vec::new() }
    }

    pub fn with_capacity(n: usize) -> Self {
        Self { roads: Vec::with_capacity(n) }
    }

    pub fn add_road(&mut self, road: Road) -> &mut Self {
        self.roads.push(road);
        self
    }

    /// Ingest all added roads into a [`RoadGraph`].
    ///
    /// Roads with fewer than two geometry points are skipped. Roads whose
    /// `highway` tag is excluded (footway/cycleway/path/steps/service) are
    /// skipped. One `Edge` is emitted per surviving road, keyed by OSM node
    /// ids mapped onto `NodeId` via a first-seen index.
    ///
    /// Returns [`GraphError::EmptyGraph`] if no edges survive.
    pub fn build(self) -> GraphResult<RoadGraph> {
        let mut node_ids: HashMap<i64, NodeId> = HashMap::new();
        let mut intern = |osm_id: i64| -> NodeId {
            let next = node_ids.len() as u32;
            *node_ids.entry(osm_id).or_insert(NodeId(next))
        };

        let mut edges = Vec::with_capacity(self.roads.len());
        let mut outgoing_by_from_node: HashMap<NodeId, Vec<EdgeId>> = HashMap::new();

        for road in self.roads {
            if road.geometry.len() < 2 {
                continue;
            }
            let highway = road.highway();
            if is_excluded(highway) {
                continue;
            }
            if road.node_ids.len() < 2 {
                continue;
            }

            let class = classify(highway);
            let lanes = road.lanes();
            let length_m = tw_core::geo::polyline_length_m(&road.geometry);
            if length_m <= 0.0 {
                continue;
            }

            let from_node = intern(road.node_ids[0]);
            let to_node = intern(*road.node_ids.last().unwrap());
            let id = EdgeId(edges.len() as u32);

            edges.push(Edge {
                id,
                road_id: road.id,
                from_node,
                to_node,
                lanes,
                speed: class.speed_kmh,
                free_flow_speed: class.speed_kmh,
                length_m,
                capacity: class.base_capacity * lanes,
                geometry: road.geometry,
            });
            outgoing_by_from_node.entry(from_node).or_default().push(id);
        }

        if edges.is_empty() {
            return Err(GraphError::EmptyGraph);
        }

        Ok(RoadGraph { edges, outgoing_by_from_node })
    }
}

impl Default for RoadGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn road(id: &str, highway: &str, from: i64, to: i64, lanes: Option<u32>, geom: Vec<(f64, f64)>) -> Road {
        let mut tags = HashMap::new();
        tags.insert("highway".to_string(), highway.to_string());
        if let Some(n) = lanes {
            tags.insert("lanes".to_string(), n.to_string());
        }
        Road {
            id: id.to_string(),
            node_ids: vec![from, to],
            tags,
            geometry: geom.into_iter().map(|(lng, lat)| Coord::new(lng, lat)).collect(),
        }
    }

    #[test]
    fn builds_edge_with_highway_class_defaults() {
        let mut b = RoadGraphBuilder::new();
        b.add_road(road("r1", "primary", 1, 2, None, vec![(0.0, 0.0), (0.0, 0.01)]));
        let g = b.build().unwrap();
        assert_eq!(g.edge_count(), 1);
        let e = g.edge(EdgeId(0));
        assert_eq!(e.free_flow_speed, 70.0);
        assert_eq!(e.capacity, 1200);
        assert!(e.length_m > 0.0);
    }

    #[test]
    fn capacity_scales_with_lanes() {
        let mut b = RoadGraphBuilder::new();
        b.add_road(road("r1", "secondary", 1, 2, Some(3), vec![(0.0, 0.0), (0.0, 0.01)]));
        let g = b.build().unwrap();
        assert_eq!(g.edge(EdgeId(0)).capacity, 800 * 3);
    }

    #[test]
    fn excluded_highway_classes_are_dropped() {
        let mut b = RoadGraphBuilder::new();
        b.add_road(road("r1", "footway", 1, 2, None, vec![(0.0, 0.0), (0.0, 0.01)]));
        assert!(matches!(b.build(), Err(GraphError::EmptyGraph)));
    }

    #[test]
    fn single_point_geometry_is_skipped() {
        let mut b = RoadGraphBuilder::new();
        b.add_road(road("r1", "primary", 1, 2, None, vec![(0.0, 0.0)]));
        assert!(matches!(b.build(), Err(GraphError::EmptyGraph)));
    }

    #[test]
    fn unknown_highway_falls_back_to_default_class() {
        let mut b = RoadGraphBuilder::new();
        b.add_road(road("r1", "bridleway", 1, 2, None, vec![(0.0, 0.0), (0.0, 0.01)]));
        let g = b.build().unwrap();
        assert_eq!(g.edge(EdgeId(0)).free_flow_speed, 40.0);
        assert_eq!(g.edge(EdgeId(0)).capacity, 300);
    }

    #[test]
    fn outgoing_index_groups_by_from_node() {
        let mut b = RoadGraphBuilder::new();
        b.add_road(road("r1", "primary", 1, 2, None, vec![(0.0, 0.0), (0.0, 0.01)]));
        b.add_road(road("r2", "primary", 1, 3, None, vec![(0.0, 0.0), (0.0, 0.02)]));
        let g = b.build().unwrap();
        let from = g.edge(EdgeId(0)).from_node;
        assert_eq!(g.outgoing(from).len(), 2);
    }
}
