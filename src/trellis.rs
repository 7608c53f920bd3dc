//! The Viterbi trellis decoder (spec §4.4).
//!
//! Grounded on `original_source/core.py`'s `find_match_sequence`: a flat
//! score dictionary spanning every layer (not a per-layer 2D table),
//! scored with the hybrid additive/multiplicative recurrence
//! `f[v] = f[u] + edge_weight(u, v) * p_obs(v)` — deliberately not
//! "corrected" to a pure log-domain sum, since that recurrence is the
//! literal algorithm this crate reproduces, not an implementation detail
//! open to improvement. Backtracking mirrors `bennjii-aaru`'s
//! `Transition::backtrack` (`src/route/transition.rs`) in shape: walk a
//! parent map from the global winner back to a root, then reverse.

use std::hash::BuildHasherDefault;

use geo::{Distance, Euclidean};
use indexmap::IndexMap;
use log::trace;
use rustc_hash::{FxHashMap, FxHasher};

use crate::cache::DistanceCache;
use crate::candidate::{projection_id, Candidate, ProjectionId};
use crate::config::MatchConfig;
use crate::error::{InvariantError, MatchError};
use crate::graph::RoadGraph;
use crate::oracle::{transition_cutoff, Oracle};
use crate::probability::{emission_probability, transition_probability};

/// One trellis node: a candidate anchored to its layer (observation
/// index) and slot (candidate index within that observation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeId {
    layer: usize,
    slot: usize,
}

/// Insertion-ordered score map, grounded on `bennjii-aaru`'s
/// `FxIndexMap` (`src/route/transition/primitives/dijkstra.rs`). Order
/// matters here: the global winner search below must see ties in the
/// same order `core.py`'s insertion-ordered dict would, so the
/// first-inserted node on a tie wins deterministically rather than
/// whichever bucket a plain hash map happens to iterate first.
type ScoreMap = IndexMap<NodeId, f64, BuildHasherDefault<FxHasher>>;

/// The decoded match: one winning candidate index per observation.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// `winning_candidate[i]` indexes into `layers[i]`.
    pub winning_candidate: Vec<usize>,
    pub score: f64,
}

/// Runs the Viterbi recurrence over `layers` (one `Vec<Candidate>` per
/// observation, in track order) and returns the globally best path.
///
/// Errors if any layer is empty (`NoCandidatesForObservation`), or if the
/// global best score does not belong to the final layer
/// (`WinnerOutsideFinalLayer`) — both per spec §4.4's literal invariants.
pub fn decode(graph: &mut RoadGraph, cache: &mut DistanceCache, layers: &[Vec<Candidate>], cfg: &MatchConfig) -> Result<MatchResult, MatchError> {
    if layers.is_empty() {
        return Err(MatchError::EmptyTrack);
    }

    for (i, layer) in layers.iter().enumerate() {
        if layer.is_empty() {
            return Err(MatchError::NoCandidatesForObservation(
                layers[i].first().map(|c| c.observation_id).unwrap_or(i as u64),
            ));
        }
    }

    let mut score: ScoreMap = ScoreMap::default();
    let mut parent: FxHashMap<NodeId, NodeId> = FxHashMap::default();

    for (slot, candidate) in layers[0].iter().enumerate() {
        let node = NodeId { layer: 0, slot };
        let dist = Euclidean.distance(candidate.observed(), candidate.projected());
        score.insert(node, emission_probability(dist, cfg));
    }

    for layer_idx in 1..layers.len() {
        let prev_layer = &layers[layer_idx - 1];
        let curr_layer = &layers[layer_idx];

        for (curr_slot, curr) in curr_layer.iter().enumerate() {
            let curr_node = NodeId { layer: layer_idx, slot: curr_slot };
            let emission_dist = Euclidean.distance(curr.observed(), curr.projected());
            let p_obs = emission_probability(emission_dist, cfg);

            let mut best: Option<(f64, NodeId)> = None;

            for (prev_slot, prev) in prev_layer.iter().enumerate() {
                let prev_node = NodeId { layer: layer_idx - 1, slot: prev_slot };
                let Some(&prev_score) = score.get(&prev_node) else {
                    continue;
                };

                let great_circle = Euclidean.distance(prev.observed(), curr.observed());
                let dt = curr.log_time - prev.log_time;
                let cutoff = transition_cutoff(dt, cfg);
                let oracle_result = Oracle::distance(graph, cache, prev, curr, cutoff, cfg)?;
                let p_trans = transition_probability(great_circle, oracle_result.distance, cfg);

                let candidate_score = prev_score + p_trans * p_obs;

                trace!(
                    "layer {layer_idx} slot {curr_slot}: via prev slot {prev_slot} score {candidate_score}"
                );

                // strict `>` keeps the first-seen predecessor on ties, matching
                // `core.py`'s plain dict-overwrite-on-strict-improvement behaviour.
                if best.map_or(true, |(b, _)| candidate_score > b) {
                    best = Some((candidate_score, prev_node));
                }
            }

            if let Some((best_score, best_parent)) = best {
                score.insert(curr_node, best_score);
                parent.insert(curr_node, best_parent);
            }
        }
    }

    let last_layer = layers.len() - 1;
    let mut winner: Option<(f64, NodeId)> = None;
    for (&node, &s) in score.iter() {
        if winner.map_or(true, |(w, _)| s > w) {
            winner = Some((s, node));
        }
    }

    let (winning_score, winning_node) = winner.ok_or(MatchError::EmptyTrack)?;

    if winning_node.layer != last_layer {
        return Err(InvariantError::WinnerOutsideFinalLayer {
            layer: winning_node.layer,
            last: last_layer,
        }
        .into());
    }

    let mut winning_candidate = vec![0usize; layers.len()];
    let mut current = winning_node;
    loop {
        winning_candidate[current.layer] = current.slot;
        match parent.get(&current) {
            Some(&p) => current = p,
            None => break,
        }
    }

    Ok(MatchResult { winning_candidate, score: winning_score })
}

/// Projection identities of every winning candidate, in track order —
/// the handoff shape the path stitcher consumes.
pub fn winning_projections(layers: &[Vec<Candidate>], result: &MatchResult, cfg: &MatchConfig) -> Vec<ProjectionId> {
    layers
        .iter()
        .zip(result.winning_candidate.iter())
        .map(|(layer, &slot)| projection_id(&layer[slot], cfg))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::candidate::Observation;

    fn obs(id: u64, x: f64, y: f64, t: f64) -> Observation {
        Observation { observation_id: id, log_x: x, log_y: y, log_time: t }
    }

    fn candidate(o: &Observation, road_id: i64, source: i64, target: i64, weight: f64, fraction: f64, px: f64, py: f64) -> Candidate {
        Candidate::from_observation(o, road_id, source, target, weight, fraction, px, py)
    }

    #[test]
    fn single_candidate_per_layer_decodes_trivially() {
        let mut graph = RoadGraph::new();
        graph.add_road(1, 2, 10, 100.0);
        graph.add_road(2, 3, 11, 100.0);
        let mut cache = DistanceCache::new();
        let cfg = MatchConfig::default();

        let o0 = obs(0, 0.0, 0.0, 0.0);
        let o1 = obs(1, 100.0, 0.0, 10.0);
        let layers = vec![
            vec![candidate(&o0, 10, 1, 2, 100.0, 0.0, 0.0, 0.0)],
            vec![candidate(&o1, 11, 2, 3, 100.0, 0.0, 100.0, 0.0)],
        ];

        let result = decode(&mut graph, &mut cache, &layers, &cfg).unwrap();
        assert_eq!(result.winning_candidate, vec![0, 0]);
    }

    #[test]
    fn picks_the_candidate_closer_to_the_observed_fix() {
        let mut graph = RoadGraph::new();
        graph.add_road(1, 2, 10, 50.0);
        graph.add_road(1, 3, 11, 50.0);
        let mut cache = DistanceCache::new();
        let cfg = MatchConfig::default();

        let o0 = obs(0, 0.0, 0.0, 0.0);
        // one candidate sits right on the fix, the other is far off
        let layers = vec![vec![
            candidate(&o0, 10, 1, 2, 50.0, 0.0, 0.0, 0.0),
            candidate(&o0, 11, 1, 3, 50.0, 0.0, 500.0, 500.0),
        ]];

        let result = decode(&mut graph, &mut cache, &layers, &cfg).unwrap();
        assert_eq!(result.winning_candidate, vec![0]);
    }

    #[test]
    fn empty_layer_is_rejected() {
        let mut graph = RoadGraph::new();
        let mut cache = DistanceCache::new();
        let cfg = MatchConfig::default();
        let layers: Vec<Vec<Candidate>> = vec![vec![]];

        let err = decode(&mut graph, &mut cache, &layers, &cfg);
        assert!(matches!(err, Err(MatchError::NoCandidatesForObservation(_))));
    }

    #[test]
    fn empty_track_is_rejected() {
        let mut graph = RoadGraph::new();
        let mut cache = DistanceCache::new();
        let cfg = MatchConfig::default();
        let layers: Vec<Vec<Candidate>> = vec![];

        let err = decode(&mut graph, &mut cache, &layers, &cfg);
        assert!(matches!(err, Err(MatchError::EmptyTrack)));
    }
}
