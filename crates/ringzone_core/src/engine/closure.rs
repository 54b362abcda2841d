//! Transitive merge set construction.
//!
//! # Responsibility
//! - Collect every same-key zone connected to the new footprint through a
//!   chain of overlaps.
//!
//! # Invariants
//! - Each pair is tested at most once; the build always terminates.
//! - Building twice over the same store yields the same set.

use crate::engine::EngineResult;
use crate::geometry::ops::{bounds, to_multi_polygon};
use crate::geometry::ring_space::RingSpace;
use crate::model::geometry::BoundingBox;
use crate::model::zone::{ClassificationKey, Zone};
use crate::repo::zone_repo::ZoneRepository;
use geo::MultiPolygon;
use log::debug;

/// Disjoint-set with path compression and union by rank.
#[derive(Debug)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    pub fn find(&mut self, node: usize) -> usize {
        let parent = self.parent[node];
        if parent != node {
            let root = self.find(parent);
            self.parent[node] = root;
        }
        self.parent[node]
    }

    /// Returns `true` if `a` and `b` were in different sets.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return false;
        }
        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] = self.rank[root_a].saturating_add(1);
            }
        }
        true
    }

    pub fn connected(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }
}

/// Returns the zones sharing `key` that are transitively connected to
/// `candidate`, ordered by id.
///
/// `seeds` are the direct overlap hits already known to merge; an empty seed
/// list means there is nothing to merge and no scan is done.
pub fn build_merge_set<R: ZoneRepository + ?Sized>(
    repo: &R,
    key: &ClassificationKey,
    candidate: &MultiPolygon<f64>,
    seeds: &[Zone],
) -> EngineResult<Vec<Zone>> {
    if seeds.is_empty() {
        return Ok(Vec::new());
    }

    let ring_space = repo.ring_space();
    let zones: Vec<Zone> = repo
        .list_zones_on_floor(key.floor)?
        .into_iter()
        .filter(|zone| key.matches(zone))
        .collect();

    // Node 0 is the candidate; node i + 1 is zones[i].
    let nodes: Vec<Node> = std::iter::once(Node::new(&ring_space, candidate.clone()))
        .chain(
            zones
                .iter()
                .map(|zone| Node::new(&ring_space, to_multi_polygon(&zone.geometry))),
        )
        .collect();

    let mut sets = UnionFind::new(nodes.len());
    for seed in seeds {
        if let Some(index) = zones.iter().position(|zone| zone.id == seed.id) {
            sets.union(0, index + 1);
        }
    }

    let mut pair_tests = 0usize;
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            if sets.connected(i, j) {
                continue;
            }
            pair_tests += 1;
            if nodes[i].overlaps(&nodes[j], &ring_space) {
                sets.union(i, j);
            }
        }
    }

    let mut merge_set: Vec<Zone> = zones
        .into_iter()
        .enumerate()
        .filter(|(index, _)| sets.connected(0, index + 1))
        .map(|(_, zone)| zone)
        .collect();
    merge_set.sort_by_key(|zone| zone.id);

    debug!(
        "event=merge_closure module=engine floor={} same_key_zones={} pair_tests={} merge_set={}",
        key.floor,
        nodes.len() - 1,
        pair_tests,
        merge_set.len()
    );
    Ok(merge_set)
}

struct Node {
    geometry: MultiPolygon<f64>,
    bounds: Option<BoundingBox>,
}

impl Node {
    fn new(ring_space: &RingSpace, geometry: MultiPolygon<f64>) -> Self {
        let geometry = ring_space.normalize_or_original(&geometry);
        let bounds = bounds(&geometry);
        Self { geometry, bounds }
    }

    fn overlaps(&self, other: &Node, ring_space: &RingSpace) -> bool {
        match (&self.bounds, &other.bounds) {
            (Some(own), Some(theirs)) if ring_space.bounds_overlap(theirs, own) => {
                ring_space.overlaps(&self.geometry, &other.geometry)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UnionFind;

    #[test]
    fn union_find_tracks_components() {
        let mut sets = UnionFind::new(5);
        assert!(sets.union(0, 1));
        assert!(sets.union(3, 4));
        assert!(!sets.union(1, 0));
        assert!(sets.connected(0, 1));
        assert!(!sets.connected(1, 3));

        assert!(sets.union(1, 4));
        assert!(sets.connected(0, 3));
        assert!(!sets.connected(0, 2));
    }
}
