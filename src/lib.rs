//! Hidden-Markov-Model map matching core.
//!
//! Given a sequence of GPS observations, each already projected onto a
//! handful of nearby road-edge candidates by an external
//! candidate-generation layer, this crate decodes the most probable
//! sequence of road edges the vehicle actually drove, via a Viterbi
//! trellis over a bounded-Dijkstra shortest-path oracle.
//!
//! External interface (spec §6): [`r#match::run`] decodes one track,
//! [`stitch::stitch`] concatenates the winners into a road path, and
//! [`oracle::Oracle`] exposes the shortest-path primitive directly for
//! callers that want it standalone.

pub mod cache;
pub mod candidate;
pub mod config;
pub mod controller;
pub mod error;
pub mod graph;
pub mod oracle;
pub mod probability;
pub mod stitch;
pub mod trellis;

pub use cache::{CacheEntry, DistanceCache};
pub use candidate::{Candidate, Observation, ProjectionId};
pub use config::MatchConfig;
pub use controller::{AbandonReason, ControllerOutcome};
pub use error::{InvariantError, MatchError, OracleError, StitchError};
pub use graph::{NodeKey, RoadGraph};
pub use oracle::{Oracle, OracleResult};
pub use stitch::StitchedPath;
pub use trellis::MatchResult;

/// The single external entry point for decoding a track end to end:
/// repair-and-decode via the match controller, then stitch the winning
/// candidates into one road path.
pub mod r#match {
    use crate::cache::DistanceCache;
    use crate::candidate::Candidate;
    use crate::config::MatchConfig;
    use crate::controller::{self, ControllerOutcome};
    use crate::error::MatchError;
    use crate::graph::RoadGraph;
    use crate::stitch::{self, StitchedPath};
    use crate::trellis::MatchResult;

    #[derive(Debug)]
    pub struct MatchOutput {
        pub layers: Vec<Vec<Candidate>>,
        pub result: MatchResult,
        pub path: StitchedPath,
    }

    #[derive(Debug)]
    pub enum Outcome {
        Matched(MatchOutput),
        /// The decode converged, but the winning sequence itself implies a
        /// leg too fast to be real; the reference discards the whole track
        /// in this case rather than a truncated path.
        Overspeed {
            layers: Vec<Vec<Candidate>>,
            result: MatchResult,
        },
        Abandoned(crate::controller::AbandonReason),
    }

    /// Decodes `layers` (one candidate set per observation, in track
    /// order) against `graph`, repairing disconnections as needed, and
    /// returns the stitched road path. A fresh, empty `cache` should be
    /// passed in per track.
    pub fn run(graph: &mut RoadGraph, cache: &mut DistanceCache, layers: Vec<Vec<Candidate>>, cfg: &MatchConfig) -> Result<Outcome, MatchError> {
        match controller::match_until_connected(graph, cache, layers, cfg)? {
            ControllerOutcome::Matched { layers, result } => {
                let winners: Vec<Candidate> = layers
                    .iter()
                    .zip(result.winning_candidate.iter())
                    .map(|(layer, &slot)| layer[slot].clone())
                    .collect();

                match stitch::stitch(cache, &winners, cfg)? {
                    Some(path) => Ok(Outcome::Matched(MatchOutput { layers, result, path })),
                    None => Ok(Outcome::Overspeed { layers, result }),
                }
            }
            ControllerOutcome::Abandoned { reason } => Ok(Outcome::Abandoned(reason)),
        }
    }
}
