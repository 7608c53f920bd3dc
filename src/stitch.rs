//! Stitches the winning candidate sequence into one continuous road path
//! (spec §4.6).
//!
//! Grounded on `original_source/get_dijkstra_distance.py`'s
//! `get_connected_path`: walk consecutive winners, pull each leg's
//! cached vertex/road path, reject the transition (and abort the
//! *entire* track, not just the one leg) the first time a leg's implied
//! speed exceeds `cfg.max_v` (`elapsed * MAX_V < dis`), and concatenate
//! the surviving legs' vertex and road paths with consecutive-duplicate
//! collapsing at the seams — skipping the `Src`/`Dst` splice sentinels
//! the same way the reference skips its `'a'`/`'b'` virtual ids.

use crate::cache::DistanceCache;
use crate::candidate::{projection_id, Candidate};
use crate::config::MatchConfig;
use crate::error::StitchError;
use crate::graph::{NodeKey, RoadId, VertexId};

#[derive(Debug, Clone, PartialEq)]
pub struct StitchedPath {
    pub vertex_path: Vec<VertexId>,
    pub road_path: Vec<RoadId>,
}

/// Stitches the winning candidates of a decoded track into one road
/// path, using `cache` (already populated by the oracle during
/// decoding) rather than recomputing any leg. Returns `None` for the
/// whole track — not a truncated path — the first time a leg's implied
/// travel speed exceeds `cfg.max_v`, matching `get_connected_path`'s
/// `return None, None`.
pub fn stitch(cache: &DistanceCache, winners: &[Candidate], cfg: &MatchConfig) -> Result<Option<StitchedPath>, StitchError> {
    let mut vertex_path: Vec<VertexId> = Vec::new();
    let mut road_path: Vec<RoadId> = Vec::new();

    for pair in winners.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let pid_prev = projection_id(prev, cfg);
        let pid_curr = projection_id(curr, cfg);

        let entry = cache.get(pid_prev, pid_curr).ok_or(StitchError::MissingCacheEntry { src: pid_prev, dst: pid_curr })?;

        let elapsed = curr.log_time - prev.log_time;
        if elapsed * cfg.max_v < entry.distance {
            return Ok(None);
        }

        for &node in &entry.vertex_path {
            let NodeKey::Real(vertex) = node else {
                continue;
            };
            if vertex_path.last() != Some(&vertex) {
                vertex_path.push(vertex);
            }
        }

        for &road_id in &entry.road_path {
            if road_path.last() != Some(&road_id) {
                road_path.push(road_id);
            }
        }
    }

    Ok(Some(StitchedPath { vertex_path, road_path }))
}
