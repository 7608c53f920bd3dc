//! The edge-constrained shortest-path oracle (spec §4.1).
//!
//! Splices virtual `SRC`/`DST` nodes into the road graph to stand in for
//! mid-edge projections, runs a single-source Dijkstra bounded by a
//! cutoff, and always unsplices before returning — on the unreachable
//! path and the cache-hit path alike.
//!
//! The bounded Dijkstra is grounded on `bennjii-aaru`'s `Dijkstra::reach`
//! (`src/route/transition/primitives/dijkstra.rs`): a binary heap keyed
//! by a min-first wrapper (`other.cost.cmp(&self.cost)`), adapted here
//! to stop at a known goal rather than yield a lazy reachability stream,
//! since the oracle only ever wants one destination's distance.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use itertools::Itertools;
use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::cache::{CacheEntry, DistanceCache};
use crate::candidate::{projection_id, Candidate};
use crate::config::MatchConfig;
use crate::error::OracleError;
use crate::graph::{NodeKey, RoadGraph, SplicedEdges};

#[derive(Debug, Clone, PartialEq)]
pub struct OracleResult {
    pub distance: f64,
    pub vertex_path: Vec<NodeKey>,
    pub road_path: Vec<i64>,
}

impl From<&CacheEntry> for OracleResult {
    fn from(entry: &CacheEntry) -> Self {
        OracleResult {
            distance: entry.distance,
            vertex_path: entry.vertex_path.clone(),
            road_path: entry.road_path.clone(),
        }
    }
}

/// Cutoff policy for one transition (spec §4.1): bounded both by the
/// global `MAX_DIS` sentinel and by how far the elapsed time between
/// the two observations could plausibly cover at `cfg.max_v`. Mirrors
/// `original_source/get_dijkstra_distance.py`'s
/// `max_distance = (Δt) * MAX_V`.
pub fn transition_cutoff(dt: f64, cfg: &MatchConfig) -> f64 {
    cfg.max_dis.min(dt * cfg.max_v)
}

/// The shortest-path oracle. Zero-sized: it carries no state of its own,
/// all of it lives in the `RoadGraph` and `DistanceCache` passed in.
pub struct Oracle;

impl Oracle {
    /// Driving distance (and realizing paths) from candidate `a`'s
    /// projection to candidate `b`'s, bounded by `cutoff`. Never errors
    /// on an unreachable pair — that is reported via the `MAX_DIS`
    /// sentinel, per spec §4.1. Errors only on a structural invariant
    /// violation (an edge-weight mismatch between a candidate and the
    /// graph, or a cache disagreement).
    pub fn distance(graph: &mut RoadGraph, cache: &mut DistanceCache, a: &Candidate, b: &Candidate, cutoff: f64, cfg: &MatchConfig) -> Result<OracleResult, OracleError> {
        let pid_a = projection_id(a, cfg);
        let pid_b = projection_id(b, cfg);

        if let Some(entry) = cache.get(pid_a, pid_b) {
            trace!("oracle cache hit for {pid_a:?} -> {pid_b:?}");
            return Ok(OracleResult::from(entry));
        }

        graph.assert_consistent(a.source, a.target, a.road_id, a.edge_weight)?;
        graph.assert_consistent(b.source, b.target, b.road_id, b.edge_weight)?;

        let result = if a.road_id == b.road_id {
            Self::same_edge(a, b, cfg)
        } else {
            Self::cross_edge(graph, a, b, cutoff, cfg)
        };

        cache.put(
            pid_a,
            pid_b,
            CacheEntry {
                distance: result.distance,
                vertex_path: result.vertex_path.clone(),
                road_path: result.road_path.clone(),
            },
        )?;

        Ok(result)
    }

    fn same_edge(a: &Candidate, b: &Candidate, cfg: &MatchConfig) -> OracleResult {
        if b.fraction <= a.fraction {
            debug!("same-edge transition is backward on road {}, unreachable", a.road_id);
            return OracleResult { distance: cfg.max_dis, vertex_path: vec![], road_path: vec![] };
        }

        OracleResult {
            distance: (b.fraction - a.fraction) * a.edge_weight,
            vertex_path: vec![NodeKey::Src, NodeKey::Dst],
            road_path: vec![a.road_id],
        }
    }

    fn cross_edge(graph: &mut RoadGraph, a: &Candidate, b: &Candidate, cutoff: f64, cfg: &MatchConfig) -> OracleResult {
        let (start, start_splice) = splice_endpoint(graph, a, NodeKey::Src);
        let (goal, goal_splice) = splice_endpoint(graph, b, NodeKey::Dst);

        let found = bounded_dijkstra(graph, start, goal, cutoff.min(cfg.max_dis));

        // road path must be collapsed while the spliced edges are still
        // present in the graph — unsplicing first would leave every window
        // touching `Src`/`Dst` with no edge to read a road_id from.
        let result = match found {
            Some((distance, vertex_path)) => {
                let road_path = collapse_road_path(graph, &vertex_path);
                OracleResult { distance, vertex_path, road_path }
            }
            None => OracleResult { distance: cfg.max_dis, vertex_path: vec![], road_path: vec![] },
        };

        unsplice(graph, start_splice);
        unsplice(graph, goal_splice);

        result
    }
}

/// Splices a candidate's projection into the graph as either a real
/// endpoint (fraction exactly 0 or 1) or a fresh virtual node, returning
/// the entry/exit node to route from/to and the edges added (empty for
/// the real-endpoint case, so there is nothing to unsplice).
fn splice_endpoint(graph: &mut RoadGraph, c: &Candidate, virtual_node: NodeKey) -> (NodeKey, SplicedEdges) {
    if c.fraction == 0.0 {
        (NodeKey::Real(c.source), SplicedEdges::new())
    } else if c.fraction == 1.0 {
        (NodeKey::Real(c.target), SplicedEdges::new())
    } else {
        let source = NodeKey::Real(c.source);
        let target = NodeKey::Real(c.target);

        graph.splice_add(source, virtual_node, crate::graph::EdgeData { weight: c.fraction * c.edge_weight, road_id: c.road_id });
        graph.splice_add(virtual_node, target, crate::graph::EdgeData { weight: (1.0 - c.fraction) * c.edge_weight, road_id: c.road_id });

        let mut edges = SplicedEdges::new();
        edges.push((source, virtual_node));
        edges.push((virtual_node, target));
        (virtual_node, edges)
    }
}

fn unsplice(graph: &mut RoadGraph, edges: SplicedEdges) {
    for (a, b) in edges {
        graph.splice_remove(a, b);
    }
}

/// Walks a Dijkstra-recovered vertex path and collapses consecutive
/// duplicate `road_id`s into the ordered road sequence actually
/// traversed.
fn collapse_road_path(graph: &RoadGraph, vertex_path: &[NodeKey]) -> Vec<i64> {
    vertex_path
        .windows(2)
        .filter_map(|pair| graph.edge_weight(pair[0], pair[1]))
        .map(|edge| edge.road_id)
        .dedup()
        .collect()
}

#[derive(Copy, Clone, Debug)]
struct HeapEntry {
    cost: f64,
    node: NodeKey,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed, so `BinaryHeap` (a max-heap) pops the smallest cost first.
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}

/// Single-source, single-target Dijkstra over `graph`, stopping as soon
/// as `goal` is popped or every reachable node within `cutoff` has been
/// exhausted. Returns `None` if `goal` is not reached within `cutoff`.
fn bounded_dijkstra(graph: &RoadGraph, start: NodeKey, goal: NodeKey, cutoff: f64) -> Option<(f64, Vec<NodeKey>)> {
    if start == goal {
        return Some((0.0, vec![start]));
    }

    let mut heap = BinaryHeap::new();
    let mut best_cost: FxHashMap<NodeKey, f64> = FxHashMap::default();
    let mut parents: FxHashMap<NodeKey, NodeKey> = FxHashMap::default();
    let mut visited: FxHashSet<NodeKey> = FxHashSet::default();

    best_cost.insert(start, 0.0);
    heap.push(HeapEntry { cost: 0.0, node: start });

    while let Some(HeapEntry { cost, node }) = heap.pop() {
        if !visited.insert(node) {
            continue;
        }

        if node == goal {
            return Some((cost, reconstruct_path(start, goal, &parents)));
        }

        if cost > cutoff {
            continue;
        }

        for (next, edge) in graph.successors(node) {
            if visited.contains(&next) {
                continue;
            }

            let next_cost = cost + edge.weight;
            if next_cost > cutoff {
                continue;
            }

            let improves = best_cost.get(&next).map_or(true, |&c| next_cost < c);
            if improves {
                best_cost.insert(next, next_cost);
                parents.insert(next, node);
                heap.push(HeapEntry { cost: next_cost, node: next });
            }
        }
    }

    None
}

fn reconstruct_path(start: NodeKey, goal: NodeKey, parents: &FxHashMap<NodeKey, NodeKey>) -> Vec<NodeKey> {
    let mut path = vec![goal];
    let mut current = goal;

    while current != start {
        let parent = parents[&current];
        path.push(parent);
        current = parent;
    }

    path.reverse();
    path
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    use crate::candidate::Observation;

    fn obs(id: u64) -> Observation {
        Observation { observation_id: id, log_x: 0.0, log_y: 0.0, log_time: 0.0 }
    }

    fn candidate(road_id: i64, source: i64, target: i64, weight: f64, fraction: f64) -> Candidate {
        Candidate::from_observation(&obs(1), road_id, source, target, weight, fraction, 0.0, 0.0)
    }

    #[test_log::test]
    fn same_edge_forward_gives_exact_fraction_distance() {
        let mut graph = RoadGraph::new();
        graph.add_road(2412, 2413, 5933, 155.541266283945987);
        let mut cache = DistanceCache::new();
        let cfg = MatchConfig::default();

        let a = candidate(5933, 2412, 2413, 155.541266283945987, 0.5);
        let b = candidate(5933, 2412, 2413, 155.541266283945987, 0.6);

        let result = Oracle::distance(&mut graph, &mut cache, &a, &b, cfg.max_dis, &cfg).unwrap();
        assert_relative_eq!(result.distance, 15.554126628394595, max_relative = 1e-12);
        assert_eq!(result.vertex_path, vec![NodeKey::Src, NodeKey::Dst]);
        assert_eq!(result.road_path, vec![5933]);

        // repeat: served from cache, bit-identical
        let repeat = Oracle::distance(&mut graph, &mut cache, &a, &b, cfg.max_dis, &cfg).unwrap();
        assert_eq!(repeat, result);
    }

    #[test_log::test]
    fn same_edge_backward_is_unreachable() {
        let mut graph = RoadGraph::new();
        graph.add_road(2412, 2413, 5933, 155.541266283945987);
        let mut cache = DistanceCache::new();
        let cfg = MatchConfig::default();

        let a = candidate(5933, 2412, 2413, 155.541266283945987, 1.0);
        let b = candidate(5933, 2412, 2413, 155.541266283945987, 0.5);

        let result = Oracle::distance(&mut graph, &mut cache, &a, &b, cfg.max_dis, &cfg).unwrap();
        assert_eq!(result.distance, cfg.max_dis);
        assert!(result.vertex_path.is_empty());
        assert!(result.road_path.is_empty());
    }

    #[test_log::test]
    fn cross_edge_interior_fractions_splice_through_shared_vertex() {
        let mut graph = RoadGraph::new();
        graph.add_road(32697, 32714, 31222, 343.795168360553987);
        graph.add_road(32714, 40182, 63796, 144.726173089272010);
        let mut cache = DistanceCache::new();
        let cfg = MatchConfig::default();

        let a = candidate(31222, 32697, 32714, 343.795168360553987, 0.5);
        let b = candidate(63796, 32714, 40182, 144.726173089272010, 0.5);

        let result = Oracle::distance(&mut graph, &mut cache, &a, &b, cfg.max_dis, &cfg).unwrap();
        assert_relative_eq!(result.distance, 244.26067072491298, max_relative = 1e-9);
        assert_eq!(result.vertex_path, vec![NodeKey::Src, NodeKey::Real(32714), NodeKey::Dst]);
        assert_eq!(result.road_path, vec![31222, 63796]);

        // splice neutrality: the real edges are untouched afterwards
        assert!(graph.edge_weight(NodeKey::Real(32697), NodeKey::Src).is_none());
        assert!(graph.edge_weight(NodeKey::Real(32697), NodeKey::Real(32714)).is_some());
    }

    #[test_log::test]
    fn cross_edge_endpoint_fractions_use_real_vertices() {
        let mut graph = RoadGraph::new();
        graph.add_road(32697, 32714, 31222, 343.795168360553987);
        graph.add_road(32714, 40182, 63796, 144.726173089272010);
        let mut cache = DistanceCache::new();
        let cfg = MatchConfig::default();

        let a = candidate(31222, 32697, 32714, 343.795168360553987, 0.0);
        let b = candidate(63796, 32714, 40182, 144.726173089272010, 1.0);

        let result = Oracle::distance(&mut graph, &mut cache, &a, &b, cfg.max_dis, &cfg).unwrap();
        assert_relative_eq!(result.distance, 343.795168360553987 + 144.726173089272010, max_relative = 1e-9);
        assert_eq!(result.vertex_path, vec![NodeKey::Real(32697), NodeKey::Real(32714), NodeKey::Real(40182)]);
        assert_eq!(result.road_path, vec![31222, 63796]);
    }

    #[test_log::test]
    fn shared_vertex_at_both_endpoints_has_zero_distance() {
        let mut graph = RoadGraph::new();
        graph.add_road(32697, 32714, 31222, 343.795168360553987);
        graph.add_road(32714, 40182, 63796, 144.726173089272010);
        let mut cache = DistanceCache::new();
        let cfg = MatchConfig::default();

        let a = candidate(31222, 32697, 32714, 343.795168360553987, 1.0);
        let b = candidate(63796, 32714, 40182, 144.726173089272010, 0.0);

        let result = Oracle::distance(&mut graph, &mut cache, &a, &b, cfg.max_dis, &cfg).unwrap();
        assert_eq!(result.distance, 0.0);
        assert_eq!(result.vertex_path, vec![NodeKey::Real(32714)]);
    }

    #[test_log::test]
    fn single_leg_combinations_match_first_or_second_edge_only() {
        let mut graph = RoadGraph::new();
        graph.add_road(32697, 32714, 31222, 343.795168360553987);
        graph.add_road(32714, 40182, 63796, 144.726173089272010);
        let mut cache = DistanceCache::new();
        let cfg = MatchConfig::default();

        let a0 = candidate(31222, 32697, 32714, 343.795168360553987, 0.0);
        let b0 = candidate(63796, 32714, 40182, 144.726173089272010, 0.0);
        let first_leg = Oracle::distance(&mut graph, &mut cache, &a0, &b0, cfg.max_dis, &cfg).unwrap();
        assert_relative_eq!(first_leg.distance, 343.795168360553987, max_relative = 1e-9);
        assert_eq!(first_leg.vertex_path, vec![NodeKey::Real(32697), NodeKey::Real(32714)]);

        let a1 = candidate(31222, 32697, 32714, 343.795168360553987, 1.0);
        let b1 = candidate(63796, 32714, 40182, 144.726173089272010, 1.0);
        let second_leg = Oracle::distance(&mut graph, &mut cache, &a1, &b1, cfg.max_dis, &cfg).unwrap();
        assert_relative_eq!(second_leg.distance, 144.726173089272010, max_relative = 1e-9);
    }

    #[test_log::test]
    fn cutoff_bound_is_respected() {
        let mut graph = RoadGraph::new();
        graph.add_road(1, 2, 10, 1000.0);
        graph.add_road(2, 3, 11, 1000.0);
        let mut cache = DistanceCache::new();
        let cfg = MatchConfig::default();

        let a = candidate(10, 1, 2, 1000.0, 0.0);
        let b = candidate(11, 2, 3, 1000.0, 1.0);

        let result = Oracle::distance(&mut graph, &mut cache, &a, &b, 500.0, &cfg).unwrap();
        assert_eq!(result.distance, cfg.max_dis);
    }
}
