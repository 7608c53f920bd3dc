use thiserror::Error;

use crate::candidate::ProjectionId;
use crate::graph::RoadId;

/// Violations of a structural invariant the core relies on. These are
/// never expected in correct operation; encountering one is fatal to
/// the track that triggered it.
#[derive(Error, Debug)]
pub enum InvariantError {
    #[error(
        "edge weight mismatch for road {road_id}: graph has {graph_weight}, candidate carries {candidate_weight}"
    )]
    EdgeWeightMismatch {
        road_id: RoadId,
        graph_weight: f64,
        candidate_weight: f64,
    },

    #[error("distance cache disagreement for {src:?} -> {dst:?}: previously {old}, now {new}")]
    CacheDisagreement {
        src: ProjectionId,
        dst: ProjectionId,
        old: f64,
        new: f64,
    },

    #[error("viterbi winner at layer {layer} does not belong to the final trellis layer {last}")]
    WinnerOutsideFinalLayer { layer: usize, last: usize },
}

#[derive(Error, Debug)]
pub enum OracleError {
    #[error(transparent)]
    Invariant(#[from] InvariantError),
}

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("observation {0} has no candidates")]
    NoCandidatesForObservation(u64),

    #[error("track has no observations")]
    EmptyTrack,

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Invariant(#[from] InvariantError),

    #[error(transparent)]
    Stitch(#[from] StitchError),
}

#[derive(Error, Debug)]
pub enum StitchError {
    #[error("missing distance cache entry for matched pair {src:?} -> {dst:?}")]
    MissingCacheEntry {
        src: ProjectionId,
        dst: ProjectionId,
    },
}
