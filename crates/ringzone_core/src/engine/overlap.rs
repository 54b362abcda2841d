//! Overlap detection and classification.
//!
//! # Responsibility
//! - Find zones on a floor whose geometry meets a candidate footprint,
//!   including across the ring seam.
//! - Split hits into merge candidates and conflict zones.
//!
//! # Invariants
//! - Touching boundaries count as overlap.
//! - Zones on other floors are never returned.

use crate::engine::EngineResult;
use crate::geometry::ops::{bounds, to_multi_polygon};
use crate::model::zone::{ClassificationKey, Zone};
use crate::repo::zone_repo::ZoneRepository;
use geo::MultiPolygon;
use log::debug;

/// Which zones an overlap query considers.
#[derive(Debug, Clone, Copy)]
pub enum OverlapScope<'a> {
    /// Every zone on the floor, regardless of type or owner.
    AnyZone,
    /// Only zones sharing this classification key.
    Classification(&'a ClassificationKey),
}

impl OverlapScope<'_> {
    fn admits(&self, zone: &Zone) -> bool {
        match self {
            Self::AnyZone => true,
            Self::Classification(key) => key.matches(zone),
        }
    }
}

/// Returns every zone on `floor` in `scope` that intersects `candidate`,
/// ordered by id.
pub fn find_overlapping<R: ZoneRepository + ?Sized>(
    repo: &R,
    floor: i32,
    candidate: &MultiPolygon<f64>,
    scope: OverlapScope<'_>,
) -> EngineResult<Vec<Zone>> {
    let ring_space = repo.ring_space();
    let normalized = ring_space.normalize_or_original(candidate);
    let Some(candidate_bounds) = bounds(&normalized) else {
        return Ok(Vec::new());
    };

    let nearby = repo.list_zones_near(floor, &candidate_bounds)?;
    let prefiltered = nearby.len();
    let hits: Vec<Zone> = nearby
        .into_iter()
        .filter(|zone| scope.admits(zone))
        .filter(|zone| ring_space.overlaps(&normalized, &to_multi_polygon(&zone.geometry)))
        .collect();

    debug!(
        "event=overlap_scan module=engine floor={} prefiltered={} hits={}",
        floor,
        prefiltered,
        hits.len()
    );
    Ok(hits)
}

/// Overlap hits split by merge compatibility with the new zone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Same classification key: these merge with the new zone.
    pub merge_candidates: Vec<Zone>,
    /// Different key: these may be reduced by conflict resolution.
    pub conflict_zones: Vec<Zone>,
}

/// Partitions `hits` by whether they share `key`.
pub fn classify(key: &ClassificationKey, hits: Vec<Zone>) -> Classification {
    let (merge_candidates, conflict_zones): (Vec<Zone>, Vec<Zone>) =
        hits.into_iter().partition(|zone| key.matches(zone));
    Classification {
        merge_candidates,
        conflict_zones,
    }
}

#[cfg(test)]
mod tests {
    use super::classify;
    use crate::model::geometry::ZoneGeometry;
    use crate::model::zone::{ClassificationKey, Zone};

    fn zone(id: i64, zone_type: &str, owner_id: Option<i64>) -> Zone {
        Zone {
            id,
            name: format!("zone {id}"),
            zone_type: zone_type.to_string(),
            floor: 0,
            owner_id,
            is_system_zone: false,
            geometry: ZoneGeometry::rectangle(0.0, 0.0, 10.0, 10.0),
            properties: None,
            metadata: None,
            area: 100.0,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn classify_splits_by_full_key() {
        let key = ClassificationKey {
            floor: 0,
            zone_type: "residential".to_string(),
            owner_id: Some(7),
            is_system_zone: false,
        };
        let hits = vec![
            zone(1, "residential", Some(7)),
            zone(2, "residential", Some(8)),
            zone(3, "commercial", Some(7)),
            zone(4, "residential", None),
        ];

        let classification = classify(&key, hits);
        let merge_ids: Vec<i64> = classification.merge_candidates.iter().map(|z| z.id).collect();
        let conflict_ids: Vec<i64> = classification.conflict_zones.iter().map(|z| z.id).collect();
        assert_eq!(merge_ids, vec![1]);
        assert_eq!(conflict_ids, vec![2, 3, 4]);
    }

    #[test]
    fn system_flag_is_part_of_the_key() {
        let key = ClassificationKey {
            floor: 0,
            zone_type: "residential".to_string(),
            owner_id: None,
            is_system_zone: true,
        };
        let classification = classify(&key, vec![zone(1, "residential", None)]);
        assert!(classification.merge_candidates.is_empty());
        assert_eq!(classification.conflict_zones.len(), 1);
    }
}
