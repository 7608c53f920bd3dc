//! Tunable constants for the matcher.
//!
//! Most of the literal values in this module come directly from the
//! reference implementation; they are grouped behind [`MatchConfig`]
//! rather than left as bare free constants so a caller can override the
//! detour margin or retry cap without forking the crate, while still
//! defaulting to the reference behaviour.

/// Sentinel distance (metres) meaning "unreachable within the cutoff".
pub const MAX_DIS: f64 = 5000.0;

/// Upper-bound speed (m/s) used both for the Dijkstra cutoff and the
/// stitcher's overspeed gate.
pub const MAX_V: f64 = 33.0;

pub const SMALL_PROBABILITY: f64 = 1e-8;
pub const BIG_PROBABILITY: f64 = 1.0 - 1e-8;

/// Quantization factor applied to `fraction` when deriving a projection's
/// cache identity: `(road_id, round(fraction * PROJECTION_QUANTIZATION))`.
pub const PROJECTION_QUANTIZATION: f64 = 10_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchConfig {
    /// Sentinel distance (metres) treated as "unreachable".
    pub max_dis: f64,
    /// Upper-bound travel speed (m/s).
    pub max_v: f64,
    /// Observation noise standard deviation (metres) for the emission PDF.
    pub sigma: f64,
    /// Additional slack (metres) a driving distance may exceed the
    /// straight-line distance by before the transition is treated as
    /// implausible.
    pub detour_margin: f64,
    /// Transition probability floor.
    pub small_probability: f64,
    /// Transition probability ceiling.
    pub big_probability: f64,
    /// Minimum number of observations a track must retain to remain
    /// matchable.
    pub min_track_len: usize,
    /// Maximum number of disconnection-repair iterations.
    pub retry_cap: u32,
    /// Quantization factor for projection identity.
    pub quantization: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            max_dis: MAX_DIS,
            max_v: MAX_V,
            sigma: 30.0,
            detour_margin: 2000.0,
            small_probability: SMALL_PROBABILITY,
            big_probability: BIG_PROBABILITY,
            min_track_len: 4,
            retry_cap: 10,
            quantization: PROJECTION_QUANTIZATION,
        }
    }
}
