//! Footprint subtraction and splitting.
//!
//! # Responsibility
//! - Remove a footprint from a persisted zone (conflict resolution, dezone).
//! - Remove footprints from an unsaved geometry (new zone clipping).
//!
//! # Invariants
//! - Footprint only touching the target: nothing is written.
//! - No fragment left: the target is deleted.
//! - One fragment: the target is updated in place.
//! - Several fragments: the target keeps the largest, the others become new
//!   zones named `"<name> (Split N)"` with the target's attributes.
//! - Fragments that fail validation are dropped with a warning.

use crate::engine::EngineResult;
use crate::geometry::ops::{components_by_area, difference, polygon_to_geometry, to_multi_polygon};
use crate::geometry::ring_space::RingSpace;
use crate::geometry::validate::validate_geometry;
use crate::model::geometry::ZoneGeometry;
use crate::model::zone::{ConflictPolicy, NewZone, Zone, ZoneId};
use crate::repo::zone_repo::ZoneRepository;
use geo::MultiPolygon;
use log::{debug, info, warn};

/// Persisted effect of one subtraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubtractOutcome {
    /// The target after its update, absent when it was deleted or untouched.
    pub updated: Option<Zone>,
    /// Split zones inserted for extra fragments.
    pub created: Vec<Zone>,
    /// The target id when nothing of it remained.
    pub deleted: Option<ZoneId>,
}

impl SubtractOutcome {
    /// Every zone that still carries area of the original target.
    pub fn remaining(&self) -> Vec<Zone> {
        self.updated.iter().chain(self.created.iter()).cloned().collect()
    }
}

/// Relative area change below which a subtraction leaves the target as is.
const UNCHANGED_AREA_TOLERANCE: f64 = 1e-9;

/// Name given to the `index`-th extra fragment of a split zone.
pub fn split_name(name: &str, index: usize) -> String {
    format!("{name} (Split {index})")
}

/// Subtracts `footprint` from `target` and persists the result.
pub fn subtract<R: ZoneRepository + ?Sized>(
    repo: &R,
    target: &Zone,
    footprint: &MultiPolygon<f64>,
) -> EngineResult<SubtractOutcome> {
    let ring_space = repo.ring_space();
    let fragments = subtract_footprints(
        &ring_space,
        &to_multi_polygon(&target.geometry),
        std::slice::from_ref(footprint),
    )?;

    if let [only] = fragments.as_slice() {
        let before = ring_space.zone_area(&target.geometry);
        let after = ring_space.zone_area(only);
        if (before - after).abs() <= UNCHANGED_AREA_TOLERANCE * before.max(1.0) {
            debug!(
                "event=zone_subtract module=engine status=ok zone_id={} result=unchanged",
                target.id
            );
            return Ok(SubtractOutcome::default());
        }
    }

    let mut fragments = fragments.into_iter();
    let Some(largest) = fragments.next() else {
        repo.delete_zone(target.id)?;
        info!(
            "event=zone_subtract module=engine status=ok zone_id={} result=deleted",
            target.id
        );
        return Ok(SubtractOutcome {
            updated: None,
            created: Vec::new(),
            deleted: Some(target.id),
        });
    };

    let mut kept = target.clone();
    kept.geometry = largest;
    let updated = repo.update_zone(&kept)?;

    let mut created = Vec::new();
    for (offset, geometry) in fragments.enumerate() {
        let split = NewZone {
            name: split_name(&target.name, offset + 1),
            zone_type: target.zone_type.clone(),
            floor: target.floor,
            owner_id: target.owner_id,
            is_system_zone: target.is_system_zone,
            geometry,
            properties: target.properties.clone(),
            metadata: target.metadata.clone(),
            conflict_policy: ConflictPolicy::default(),
        };
        created.push(repo.insert_zone(&split)?);
    }

    info!(
        "event=zone_subtract module=engine status=ok zone_id={} result={} fragments={}",
        target.id,
        if created.is_empty() { "updated" } else { "split" },
        created.len() + 1
    );
    Ok(SubtractOutcome {
        updated: Some(updated),
        created,
        deleted: None,
    })
}

/// Subtracts every footprint from `subject` and returns the valid canonical
/// fragments, largest first. Nothing is persisted.
pub fn subtract_footprints(
    ring_space: &RingSpace,
    subject: &MultiPolygon<f64>,
    footprints: &[MultiPolygon<f64>],
) -> EngineResult<Vec<ZoneGeometry>> {
    let participants: Vec<MultiPolygon<f64>> = std::iter::once(subject.clone())
        .chain(footprints.iter().cloned())
        .collect();
    let frame = ring_space.align(&participants);

    let mut aligned = frame.geometries().iter();
    let Some(first) = aligned.next() else {
        return Ok(Vec::new());
    };
    let mut remainder = first.clone();
    for footprint in aligned {
        if remainder.0.is_empty() {
            break;
        }
        remainder = difference(&remainder, footprint)?;
    }

    let mut fragments = Vec::new();
    for (index, component) in components_by_area(remainder).into_iter().enumerate() {
        let restored = frame.restore(&MultiPolygon::new(vec![component]));
        let Some(polygon) = restored.0.first() else {
            continue;
        };
        let geometry = polygon_to_geometry(polygon);
        if let Err(err) = validate_geometry(&geometry, ring_space) {
            warn!(
                "event=fragment_dropped module=engine status=warn fragment={} reason=invalid error={}",
                index, err
            );
            continue;
        }
        if ring_space.zone_area(&geometry) <= 0.0 {
            warn!(
                "event=fragment_dropped module=engine status=warn fragment={} reason=zero_area",
                index
            );
            continue;
        }
        fragments.push(geometry);
    }
    Ok(fragments)
}
