//! The observation/candidate data model (spec §3).
//!
//! Produced and owned by an external ingest/candidate-generation layer;
//! this crate treats both as read-only for the duration of one track.

use crate::config::MatchConfig;
use crate::graph::{RoadId, VertexId, Weight};

/// Unique identifier for an observation within one track. Stable across
/// the life of the track; used as the trellis layer label.
pub type ObservationId = u64;

/// One timestamped GPS fix, in planar coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub observation_id: ObservationId,
    pub log_x: f64,
    pub log_y: f64,
    /// Seconds, monotone non-decreasing within a track. The core never
    /// interprets this beyond subtraction, so any caller-chosen epoch
    /// works.
    pub log_time: f64,
}

/// Projection of one observation onto one directed road edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub observation_id: ObservationId,
    pub road_id: RoadId,
    pub source: VertexId,
    pub target: VertexId,
    pub edge_weight: Weight,
    /// Position along the edge in `[0, 1]`; `0` = at `source`, `1` = at
    /// `target`.
    pub fraction: f64,
    pub p_x: f64,
    pub p_y: f64,
    pub log_x: f64,
    pub log_y: f64,
    pub log_time: f64,
}

impl Candidate {
    pub fn from_observation(observation: &Observation, road_id: RoadId, source: VertexId, target: VertexId, edge_weight: Weight, fraction: f64, p_x: f64, p_y: f64) -> Self {
        Candidate {
            observation_id: observation.observation_id,
            road_id,
            source,
            target,
            edge_weight,
            fraction,
            p_x,
            p_y,
            log_x: observation.log_x,
            log_y: observation.log_y,
            log_time: observation.log_time,
        }
    }

    /// The observed fix, as a point.
    pub fn observed(&self) -> geo::Point {
        geo::Point::new(self.log_x, self.log_y)
    }

    /// The projected point on the road edge.
    pub fn projected(&self) -> geo::Point {
        geo::Point::new(self.p_x, self.p_y)
    }
}

/// Cache/oracle identity of a projection: two candidates sharing this
/// key are the same point for memoization purposes, even if they came
/// from different observations.
pub type ProjectionId = (RoadId, i64);

/// `(road_id, round(fraction * quantization))`, per the data-model
/// invariant in spec §3.
pub fn projection_id(candidate: &Candidate, cfg: &MatchConfig) -> ProjectionId {
    (candidate.road_id, (candidate.fraction * cfg.quantization).round() as i64)
}
