//! Emission and transition probabilities (spec §4.3).
//!
//! Grounded directly on `original_source/core.py`'s
//! `get_observation_probability` (a hand-rolled Gaussian PDF, the same
//! shape as `scipy.stats.norm.pdf(dist, loc=0, scale=sigma)`) and
//! `get_transimission_probability` (inverse-distance-ratio shaping). No
//! statistics crate is pulled in for this — the teacher's own
//! `src/transition/costing/util.rs` hand-rolls its decay curves the same
//! way, so a one-line Gaussian density does not earn a dependency.

use std::f64::consts::PI;

use crate::config::MatchConfig;

/// `N(0, sigma^2)` density of the great-circle distance between an
/// observation and one of its candidate projections. Larger `dist`
/// always yields a smaller probability; never zero, floored at
/// `cfg.small_probability` so downstream log-free products never hit a
/// hard zero.
pub fn emission_probability(dist: f64, cfg: &MatchConfig) -> f64 {
    let sigma = cfg.sigma;
    let coefficient = 1.0 / (sigma * (2.0 * PI).sqrt());
    let density = coefficient * (-0.5 * (dist / sigma).powi(2)).exp();
    density.max(cfg.small_probability)
}

/// Ratio of the great-circle distance between two observations to the
/// routed distance between their candidates. A detour beyond
/// `cfg.detour_margin` is penalized down toward `cfg.small_probability`;
/// a near-perfect ratio saturates at `cfg.big_probability`.
///
/// Mirrors `core.py`'s `get_transimission_probability`: the routed path
/// is never shorter than the great-circle distance in a sane graph, so
/// the ratio is `great_circle / routed`, clamped into
/// `[small_probability, big_probability]`. An unreachable pair (`routed
/// == cfg.max_dis`) is classified first, ahead of the detour check —
/// at large `great_circle` values the detour margin alone would let an
/// unreachable leg slip through with a merely-low rather than floored
/// probability.
pub fn transition_probability(great_circle: f64, routed: f64, cfg: &MatchConfig) -> f64 {
    if routed == cfg.max_dis {
        return cfg.small_probability;
    }

    if routed <= 0.0 {
        return cfg.big_probability;
    }

    let detour = routed - great_circle;
    if detour > cfg.detour_margin {
        return cfg.small_probability;
    }

    (great_circle / routed).clamp(cfg.small_probability, cfg.big_probability)
}
