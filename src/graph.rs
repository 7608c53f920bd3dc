//! The immutable directed road graph, with transient edge splices for
//! virtual projection endpoints (see [`crate::oracle`]).
//!
//! Grounded on `bennjii-aaru`'s `GraphStructure<E> = DiGraphMap<E, ...,
//! BuildHasherDefault<FxHasher>>` (`src/graph/traits/route/implementation.rs`):
//! a directed graph map keyed directly on vertex identity, hashed with
//! `rustc-hash` for the same reason the teacher picks it — node lookups
//! dominate the hot path.

use std::hash::BuildHasherDefault;

use petgraph::graphmap::DiGraphMap;
use rustc_hash::FxHasher;
use smallvec::SmallVec;

use crate::error::InvariantError;

/// A real road-graph vertex identifier, as supplied by the road-graph
/// loader.
pub type VertexId = i64;

/// A road edge identifier, as supplied by the road-graph loader.
pub type RoadId = i64;

/// Geometric length of a road edge, in metres.
pub type Weight = f64;

/// A node key in the working graph: either a real vertex, or one of the
/// two sentinel virtual endpoints spliced in for the duration of one
/// oracle call.
///
/// Reusing a single key space for both real vertices and the `SRC`/`DST`
/// sentinels means a `Vec<NodeKey>` doubles as both a graph-internal
/// Dijkstra path and the `vertex_path` the oracle reports, with the
/// sentinel tokens spec'd for splice endpoints falling out for free.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum NodeKey {
    Real(VertexId),
    Src,
    Dst,
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKey::Real(id) => write!(f, "{id}"),
            NodeKey::Src => write!(f, "SRC"),
            NodeKey::Dst => write!(f, "DST"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EdgeData {
    pub weight: Weight,
    pub road_id: RoadId,
}

type GraphStructure = DiGraphMap<NodeKey, EdgeData, BuildHasherDefault<FxHasher>>;

/// Directed, weighted road graph. Logically immutable once loaded: the
/// only mutation surface is [`RoadGraph::splice_add`] /
/// [`RoadGraph::splice_remove`], used exclusively by the shortest-path
/// oracle to bracket one virtual-endpoint computation.
#[derive(Debug, Default)]
pub struct RoadGraph {
    graph: GraphStructure,
}

impl RoadGraph {
    pub fn new() -> Self {
        RoadGraph {
            graph: GraphStructure::default(),
        }
    }

    /// Loader entry point: inserts one directed road edge.
    pub fn add_road(&mut self, source: VertexId, target: VertexId, road_id: RoadId, weight: Weight) {
        self.graph
            .add_edge(NodeKey::Real(source), NodeKey::Real(target), EdgeData { weight, road_id });
    }

    pub fn edge_weight(&self, source: NodeKey, target: NodeKey) -> Option<&EdgeData> {
        self.graph.edge_weight(source, target)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Outgoing `(target, edge)` pairs for `node`.
    pub(crate) fn successors(&self, node: NodeKey) -> impl Iterator<Item = (NodeKey, &EdgeData)> {
        self.graph.edges(node).map(|(_, target, edge)| (target, edge))
    }

    /// Inserts one transient edge. Used only while bracketing a single
    /// oracle call; the caller must remove it via [`Self::splice_remove`]
    /// before returning, on every exit path.
    pub(crate) fn splice_add(&mut self, source: NodeKey, target: NodeKey, edge: EdgeData) {
        self.graph.add_edge(source, target, edge);
    }

    pub(crate) fn splice_remove(&mut self, source: NodeKey, target: NodeKey) {
        self.graph.remove_edge(source, target);
    }

    /// Asserts that `edge_weight` matches the weight actually stored on
    /// the graph's `(source, target)` edge, per the candidate invariant
    /// in the data model.
    pub(crate) fn assert_consistent(
        &self,
        source: VertexId,
        target: VertexId,
        road_id: RoadId,
        edge_weight: Weight,
    ) -> Result<(), InvariantError> {
        let graph_weight = self
            .edge_weight(NodeKey::Real(source), NodeKey::Real(target))
            .map(|e| e.weight);

        match graph_weight {
            Some(w) if w == edge_weight => Ok(()),
            _ => Err(InvariantError::EdgeWeightMismatch {
                road_id,
                graph_weight: graph_weight.unwrap_or(f64::NAN),
                candidate_weight: edge_weight,
            }),
        }
    }
}

/// Up to two edges spliced in for one virtual endpoint (interior
/// fraction); empty when the candidate sits exactly at a real vertex.
pub(crate) type SplicedEdges = SmallVec<[(NodeKey, NodeKey); 2]>;
