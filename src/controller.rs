//! The match controller: disconnection detection and iterative track
//! repair (spec §4.5).
//!
//! Grounded on `original_source/core.py`'s `match_until_connect`: decode
//! the whole track, and if two consecutive winners form a "broken"
//! transition — one whose transition probability bottomed out at
//! `SMALL_PROBABILITY`, per `find_match_sequence`'s classification, not
//! merely an unreachable oracle distance — delete both bracketing
//! observations and retry — in that literal order (delete, then check
//! the length/retry-count floor), up to `cfg.retry_cap` attempts,
//! aborting once the track drops below `cfg.min_track_len` observations.

use geo::{Distance, Euclidean};
use log::{info, warn};

use crate::cache::DistanceCache;
use crate::candidate::Candidate;
use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::graph::RoadGraph;
use crate::oracle::{transition_cutoff, Oracle};
use crate::probability::transition_probability;
use crate::trellis::{self, MatchResult};

/// Outcome of running the controller to completion: either a match was
/// found (possibly after pruning some observations), or the track
/// collapsed below the minimum length before converging.
#[derive(Debug)]
pub enum ControllerOutcome {
    Matched {
        layers: Vec<Vec<Candidate>>,
        result: MatchResult,
    },
    Abandoned {
        reason: AbandonReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    TrackTooShort,
    RetryCapExceeded,
}

/// Repeatedly decodes `layers`, pruning a disconnected bracket and
/// retrying, until the decode succeeds with no disconnection or the
/// track is abandoned. `cache` is carried across repair iterations —
/// projection identities are stable across a prune, so results already
/// computed for surviving pairs stay valid; the caller clears it at the
/// track boundary, not this loop.
pub fn match_until_connected(graph: &mut RoadGraph, cache: &mut DistanceCache, mut layers: Vec<Vec<Candidate>>, cfg: &MatchConfig) -> Result<ControllerOutcome, MatchError> {
    let mut attempts = 0u32;

    loop {
        let result = trellis::decode(graph, cache, &layers, cfg)?;

        match find_disconnection(graph, cache, &layers, &result, cfg)? {
            None => {
                info!("track converged after {attempts} repair attempt(s)");
                return Ok(ControllerOutcome::Matched { layers, result });
            }
            Some(break_idx) => {
                // drop the pair of observations bracketing the broken transition,
                // mirroring core.py's `log_list[break_idx - 1 : break_idx + 1]` slice
                let lo = break_idx.saturating_sub(1);
                let hi = (break_idx + 1).min(layers.len());
                warn!("disconnection between layers {lo} and {break_idx}, pruning");
                layers.drain(lo..hi);

                attempts += 1;

                if layers.len() < cfg.min_track_len {
                    return Ok(ControllerOutcome::Abandoned { reason: AbandonReason::TrackTooShort });
                }
                if attempts > cfg.retry_cap {
                    return Ok(ControllerOutcome::Abandoned { reason: AbandonReason::RetryCapExceeded });
                }
            }
        }
    }
}

/// Walks the winning path and returns the index of the first layer whose
/// transition from the previous layer is "broken" — its transition
/// probability bottomed out at `cfg.small_probability`, covering both an
/// unreachable pair and a reachable-but-implausible detour, per spec
/// §4.4's classification in `find_match_sequence`.
fn find_disconnection(graph: &mut RoadGraph, cache: &mut DistanceCache, layers: &[Vec<Candidate>], result: &MatchResult, cfg: &MatchConfig) -> Result<Option<usize>, MatchError> {
    for layer_idx in 1..layers.len() {
        let prev = &layers[layer_idx - 1][result.winning_candidate[layer_idx - 1]];
        let curr = &layers[layer_idx][result.winning_candidate[layer_idx]];

        let great_circle = Euclidean.distance(prev.observed(), curr.observed());
        let dt = curr.log_time - prev.log_time;
        let cutoff = transition_cutoff(dt, cfg);

        let oracle_result = Oracle::distance(graph, cache, prev, curr, cutoff, cfg)?;
        let p_trans = transition_probability(great_circle, oracle_result.distance, cfg);

        if p_trans == cfg.small_probability {
            return Ok(Some(layer_idx));
        }
    }

    Ok(None)
}
