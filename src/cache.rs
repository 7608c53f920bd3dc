//! Per-track memoization of shortest-path oracle results.
//!
//! Grounded on `bennjii-aaru`'s `CacheMap`
//! (`src/route/transition/primitives/cache.rs`): a read-through map
//! hashed with `rustc-hash`, simplified to the concrete key/value pair
//! spec §4.2 names — no generic `Calculable` trait, since no second
//! cache shape exists in this core.

use rustc_hash::FxHashMap;

use crate::candidate::ProjectionId;
use crate::error::InvariantError;
use crate::graph::{NodeKey, RoadId};

/// One memoized shortest-path result. `vertex_path`/`road_path` are
/// empty when `distance` is the unreachable sentinel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CacheEntry {
    pub distance: f64,
    pub vertex_path: Vec<NodeKey>,
    pub road_path: Vec<RoadId>,
}

/// Memoizes `(source-projection, target-projection) -> CacheEntry`,
/// scoped to one track and cleared at the track boundary by the caller.
#[derive(Debug, Default)]
pub struct DistanceCache {
    map: FxHashMap<(ProjectionId, ProjectionId), CacheEntry>,
}

impl DistanceCache {
    pub fn new() -> Self {
        DistanceCache::default()
    }

    pub fn get(&self, src: ProjectionId, dst: ProjectionId) -> Option<&CacheEntry> {
        self.map.get(&(src, dst))
    }

    /// Stores a result. If an entry already exists for `(src, dst)`, the
    /// new distance must equal the old one — a disagreement means the
    /// oracle computed two different answers for the same projection
    /// pair, which is a structural invariant violation, not a cache
    /// miss.
    pub fn put(&mut self, src: ProjectionId, dst: ProjectionId, entry: CacheEntry) -> Result<(), InvariantError> {
        if let Some(existing) = self.map.get(&(src, dst)) {
            if existing.distance != entry.distance {
                return Err(InvariantError::CacheDisagreement {
                    src,
                    dst,
                    old: existing.distance,
                    new: entry.distance,
                });
            }
            return Ok(());
        }

        self.map.insert((src, dst), entry);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn repeat_put_with_same_distance_is_idempotent() {
        let mut cache = DistanceCache::new();
        let src = (1, 0);
        let dst = (2, 0);
        let entry = CacheEntry { distance: 10.0, vertex_path: vec![], road_path: vec![] };

        cache.put(src, dst, entry.clone()).unwrap();
        cache.put(src, dst, entry).unwrap();
        assert_eq!(cache.get(src, dst).unwrap().distance, 10.0);
    }

    #[test]
    fn conflicting_put_is_rejected() {
        let mut cache = DistanceCache::new();
        let src = (1, 0);
        let dst = (2, 0);

        cache.put(src, dst, CacheEntry { distance: 10.0, vertex_path: vec![], road_path: vec![] }).unwrap();
        let err = cache.put(src, dst, CacheEntry { distance: 11.0, vertex_path: vec![], road_path: vec![] });
        assert!(err.is_err());
    }

    #[test]
    fn clear_drops_all_entries() {
        let mut cache = DistanceCache::new();
        cache.put((1, 0), (2, 0), CacheEntry::default()).unwrap();
        cache.clear();
        assert!(cache.get((1, 0), (2, 0)).is_none());
    }
}
