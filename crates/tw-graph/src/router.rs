//! Route Builder: a stochastic, length-targeted random walk between two
//! edges, with dead-end escape and a memoized cache.
//!
//! Unlike a shortest-path router, this deliberately does not optimize for
//! distance. The goal is a plausible multi-edge route of roughly the
//! right length, cheaply.

use std::collections::HashMap;

use tw_core::{EdgeId, SimRng};

use crate::network::RoadGraph;

const STEP_CAP: usize = 200;
const DEAD_END_ESCAPE_MIN_DIST_M: f64 = 1000.0;
/// Bound on distant-edge retries before falling back to "any edge",
/// expressed as a multiplier on the edge count.
const DISTANT_RETRY_MULTIPLIER: usize = 3;

/// Builds and memoizes multi-edge routes over a [`RoadGraph`].
///
/// The cache is loop-local: one `RouteBuilder` per simulation run, never
/// shared across runs.
pub struct RouteBuilder<'g> {
    graph: &'g RoadGraph,
    cache: HashMap<(EdgeId, EdgeId), Vec<EdgeId>>,
}

impl<'g> RouteBuilder<'g> {
    pub fn new(graph: &'g RoadGraph) -> Self {
        Self { graph, cache: HashMap::new() }
    }

    /// Select a uniformly random edge whose start point lies at least
    /// `min_distance_m` from `origin`'s start, and whose id differs from
    /// `origin`. Bounded retries, falling back to "any edge but origin".
    pub fn pick_distant_edge(&self, rng: &mut SimRng, origin: EdgeId, min_distance_m: f64) -> EdgeId {
        let edges = self.graph.edges();
        let origin_start = self.graph.edge(origin).start();
        let retry_cap = DISTANT_RETRY_MULTIPLIER * edges.len().max(1);

        for _ in 0..retry_cap {
            let idx = rng.gen_range(0..edges.len());
            let candidate = edges[idx].id;
            if candidate == origin {
                continue;
            }
            if edges[idx].start().distance_m(origin_start) >= min_distance_m {
                return candidate;
            }
        }

        // Fallback: any edge but origin, or origin itself if it's the only one.
        edges.iter().map(|e| e.id).find(|&id| id != origin).unwrap_or(origin)
    }

    /// Build (or fetch from cache) a multi-edge route from `origin` to `dest`.
    ///
    /// Cached under `(origin, dest)` rather than a formatted string key, to
    /// skip the allocation.
    pub fn build_route(&mut self, rng: &mut SimRng, origin: EdgeId, dest: EdgeId) -> Vec<EdgeId> {
        if let Some(cached) = self.cache.get(&(origin, dest)) {
            return cached.clone();
        }

        let route = self.walk(rng, origin, dest);
        self.cache.insert((origin, dest), route.clone());
        route
    }

    fn walk(&self, rng: &mut SimRng, origin: EdgeId, dest: EdgeId) -> Vec<EdgeId> {
        let min_target = 4000.0 + rng.gen_range(0.0..4000.0);

        let (route, length) = self.walk_once(rng, origin, dest, min_target);
        if length >= min_target {
            return route;
        }

        // Retry once with origin/dest swapped; return whatever that produces
        // regardless of whether it also falls short.
        let (retry_route, _) = self.walk_once(rng, dest, origin, min_target);
        retry_route
    }

    fn walk_once(&self, rng: &mut SimRng, origin: EdgeId, dest: EdgeId, min_target: f64) -> (Vec<EdgeId>, f64) {
        let origin_edge = self.graph.edge(origin);
        let dest_edge = self.graph.edge(dest);

        let mut route = vec![origin];
        let mut visited: std::collections::HashSet<EdgeId> = std::collections::HashSet::new();
        visited.insert(origin);
        let mut cursor = origin_edge.to_node;
        let mut cum_length = origin_edge.length_m;

        while cum_length < min_target && route.len() < STEP_CAP {
            let candidates: Vec<EdgeId> = self
                .graph
                .outgoing(cursor)
                .iter()
                .copied()
                .filter(|e| !visited.contains(e))
                .collect();

            let next = if candidates.is_empty() {
                self.pick_distant_edge(rng, *route.last().unwrap(), DEAD_END_ESCAPE_MIN_DIST_M)
            } else {
                let idx = rng.gen_range(0..candidates.len());
                candidates[idx]
            };

            visited.insert(next);
            cum_length += self.graph.edge(next).length_m;
            cursor = self.graph.edge(next).to_node;
            route.push(next);
        }

        if cursor != dest_edge.from_node {
            route.push(dest);
            cum_length += dest_edge.length_m;
        }

        (route, cum_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Road, RoadGraphBuilder};
    use std::collections::HashMap;
    use tw_core::Coord;

    fn road(id: &str, from: i64, to: i64, lng_to: f64) -> Road {
        let mut tags = HashMap::new();
        tags.insert("highway".to_string(), "residential".to_string());
        Road {
            id: id.to_string(),
            node_ids: vec![from, to],
            tags,
            geometry: vec![Coord::new(0.0, 0.0), Coord::new(lng_to, 0.0)],
        }
    }

    /// A small chain 0→1→2→3→...→9, each edge ~1.1 km (0.01 deg lng at the
    /// equator), so a route needs several hops to clear the 4-8 km minimum.
    fn chain_graph() -> RoadGraph {
        let mut b = RoadGraphBuilder::new();
        for i in 0..9 {
            b.add_road(road(&format!("r{i}"), i, i + 1, 0.01 * (i + 1) as f64));
        }
        b.build().unwrap()
    }

    #[test]
    fn route_starts_with_origin_and_contains_dest_reachable() {
        let g = chain_graph();
        let mut builder = RouteBuilder::new(&g);
        let mut rng = SimRng::new(1);
        let route = builder.build_route(&mut rng, EdgeId(0), EdgeId(8));
        assert_eq!(route.first().copied(), Some(EdgeId(0)));
        assert!(route.len() > 1);
    }

    #[test]
    fn cache_returns_identical_route_on_repeat() {
        let g = chain_graph();
        let mut builder = RouteBuilder::new(&g);
        let mut rng = SimRng::new(7);
        let r1 = builder.build_route(&mut rng, EdgeId(0), EdgeId(5));
        let r2 = builder.build_route(&mut rng, EdgeId(0), EdgeId(5));
        assert_eq!(r1, r2);
    }

    #[test]
    fn dead_end_escape_never_panics_on_single_edge_graph() {
        let mut b = RoadGraphBuilder::new();
        b.add_road(road("only", 0, 1, 0.01));
        let g = b.build().unwrap();
        let mut builder = RouteBuilder::new(&g);
        let mut rng = SimRng::new(3);
        let route = builder.build_route(&mut rng, EdgeId(0), EdgeId(0));
        assert!(!route.is_empty());
    }

    #[test]
    fn distant_edge_respects_minimum_when_possible() {
        let g = chain_graph();
        let builder = RouteBuilder::new(&g);
        let mut rng = SimRng::new(42);
        let picked = builder.pick_distant_edge(&mut rng, EdgeId(0), 2000.0);
        let origin_start = g.edge(EdgeId(0)).start();
        assert!(g.edge(picked).start().distance_m(origin_start) >= 2000.0 || picked != EdgeId(0));
    }
}
