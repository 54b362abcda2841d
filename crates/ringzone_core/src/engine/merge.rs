//! N-ary union of a merge set into its oldest member.
//!
//! # Responsibility
//! - Union the new footprint with every zone in the merge set.
//! - Keep the most senior zone, delete the others.
//!
//! # Invariants
//! - The survivor keeps its id, name, owner and blobs; only geometry, area
//!   and `updated_at` change.
//! - A disconnected union keeps its largest component; the rest is logged.

use crate::engine::{EngineError, EngineResult};
use crate::geometry::ops::{components_by_area, multi_polygon_to_geometry, to_multi_polygon, union_all};
use crate::geometry::GeometryEngineError;
use crate::model::zone::{Zone, ZoneId};
use crate::repo::zone_repo::ZoneRepository;
use geo::{Area, MultiPolygon};
use log::{info, warn};

/// Result of folding a merge set into its survivor.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub survivor: Zone,
    /// Non-survivor ids, deleted in ascending order.
    pub deleted: Vec<ZoneId>,
    /// Area of union components that were not kept.
    pub discarded_area: f64,
}

/// Merges `new_geometry` and `merge_set` into the most senior member.
///
/// # Errors
/// - `EngineError::Geometry` when `merge_set` is empty or the union fails.
pub fn merge<R: ZoneRepository + ?Sized>(
    repo: &R,
    new_geometry: &MultiPolygon<f64>,
    merge_set: &[Zone],
) -> EngineResult<MergeOutcome> {
    let Some(survivor) = merge_set.iter().min_by_key(|zone| zone.seniority()) else {
        return Err(GeometryEngineError::new("union", "merge set is empty").into());
    };
    let ring_space = repo.ring_space();

    // Survivor first so the frame anchors on its sheet.
    let participants: Vec<MultiPolygon<f64>> = std::iter::once(to_multi_polygon(&survivor.geometry))
        .chain(
            merge_set
                .iter()
                .filter(|zone| zone.id != survivor.id)
                .map(|zone| to_multi_polygon(&zone.geometry)),
        )
        .chain(std::iter::once(new_geometry.clone()))
        .collect();

    let frame = ring_space.align(&participants);
    let merged = union_all(frame.geometries())?;
    let mut components = components_by_area(merged).into_iter();
    let Some(largest) = components.next() else {
        return Err(EngineError::Geometry(GeometryEngineError::new(
            "union",
            "union produced no area",
        )));
    };
    let discarded_area: f64 = components.map(|component| component.unsigned_area()).sum();
    if discarded_area > 0.0 {
        warn!(
            "event=merge_discard module=engine status=warn survivor_id={} discarded_area={}",
            survivor.id, discarded_area
        );
    }

    let restored = frame.restore(&MultiPolygon::new(vec![largest]));
    let mut deleted: Vec<ZoneId> = merge_set
        .iter()
        .map(|zone| zone.id)
        .filter(|id| *id != survivor.id)
        .collect();
    deleted.sort_unstable();
    for id in &deleted {
        repo.delete_zone(*id)?;
    }

    let mut updated = survivor.clone();
    updated.geometry = multi_polygon_to_geometry(&restored);
    let survivor = repo.update_zone(&updated)?;

    info!(
        "event=zone_merge module=engine status=ok survivor_id={} merged={} area={}",
        survivor.id,
        deleted.len() + 1,
        survivor.area
    );
    Ok(MergeOutcome {
        survivor,
        deleted,
        discarded_area,
    })
}
