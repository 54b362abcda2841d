//! Zone use-case service.
//!
//! # Responsibility
//! - Validate caller input, then run the create/dezone pipelines.
//! - Run every write inside one immediate (write-locking) transaction.
//! - Map repository and engine failures onto the caller-facing error set.
//!
//! # Invariants
//! - After any create or dezone, no two zones with the same classification
//!   key intersect.
//! - System zones are never reduced by another zone's creation, and a zone
//!   is only reduced by a zone with the same owner.
//! - Any error rolls back every write of the operation.
//!
//! # See also
//! - docs/architecture/zone-engine.md

use crate::config::EngineConfig;
use crate::engine::closure::build_merge_set;
use crate::engine::merge::merge;
use crate::engine::overlap::{classify, find_overlapping, OverlapScope};
use crate::engine::subtract::{subtract, subtract_footprints, SubtractOutcome};
use crate::engine::EngineError;
use crate::geometry::ops::{to_multi_polygon, GeometryEngineError};
use crate::geometry::validate::{validate_geometry, GeometryValidationError};
use crate::model::geometry::{BoundingBox, ZoneGeometry};
use crate::model::zone::{
    validate_bounding_box, validate_floor, validate_owner, ConflictPolicy, NewZone, OwnerId, Zone,
    ZoneId, ZonePatch, ZoneValidationError,
};
use crate::repo::zone_repo::{RepoError, SqliteZoneRepository, ZoneRepository};
use geo::MultiPolygon;
use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Caller-facing zone operation errors.
#[derive(Debug)]
pub enum ZoneServiceError {
    /// Input failed field or geometry validation.
    Validation(ZoneValidationError),
    /// Target zone does not exist.
    NotFound(ZoneId),
    /// A planar set operation failed.
    GeometryEngine(GeometryEngineError),
    /// Clipping the new zone left nothing to store.
    NoRemainingArea,
    /// Storage failure.
    Repo(RepoError),
}

impl Display for ZoneServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "zone not found: {id}"),
            Self::GeometryEngine(err) => write!(f, "{err}"),
            Self::NoRemainingArea => {
                write!(f, "zone has no remaining area after resolving overlaps")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ZoneServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::GeometryEngine(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NotFound(_) | Self::NoRemainingArea => None,
        }
    }
}

impl ZoneServiceError {
    /// Stable snake_case code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::GeometryEngine(_) => "geometry_engine_error",
            Self::NoRemainingArea => "no_remaining_area",
            Self::Repo(_) => "storage_error",
        }
    }
}

impl From<ZoneValidationError> for ZoneServiceError {
    fn from(value: ZoneValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<GeometryValidationError> for ZoneServiceError {
    fn from(value: GeometryValidationError) -> Self {
        Self::Validation(value.into())
    }
}

impl From<RepoError> for ZoneServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for ZoneServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

impl From<EngineError> for ZoneServiceError {
    fn from(value: EngineError) -> Self {
        match value {
            EngineError::Repo(err) => err.into(),
            EngineError::Geometry(err) => Self::GeometryEngine(err),
            EngineError::NoRemainingArea => Self::NoRemainingArea,
        }
    }
}

pub type ZoneServiceResult<T> = Result<T, ZoneServiceError>;

/// Everything a create operation changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneCreateOutcome {
    /// The zone now holding the new footprint (a merge survivor or a new row).
    pub zone: Zone,
    /// Other zones inserted: extra components and split fragments.
    pub created: Vec<Zone>,
    /// Pre-existing zones whose geometry changed.
    pub updated: Vec<Zone>,
    /// Zones removed by merging or full subtraction.
    pub deleted: Vec<ZoneId>,
}

/// Zone service over one SQLite connection.
pub struct ZoneService<'conn> {
    conn: &'conn Connection,
    config: EngineConfig,
}

impl<'conn> ZoneService<'conn> {
    pub fn new(conn: &'conn Connection, config: EngineConfig) -> Self {
        Self { conn, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Creates a zone and returns the zone holding its footprint.
    pub fn create_zone(&self, input: &NewZone) -> ZoneServiceResult<Zone> {
        self.create_zone_with_components(input)
            .map(|outcome| outcome.zone)
    }

    /// Creates a zone and reports every zone the pipeline touched.
    ///
    /// # Contract
    /// - Same-key zones connected to the footprint merge into the oldest.
    /// - Same-owner zones of another key lose the shared area under
    ///   `ConflictPolicy::NewWins`; under `ExistingWins` the new footprint
    ///   loses it instead.
    /// - With `clip_new_zones_to_system_zones`, a non-system zone first loses
    ///   any area shared with system zones.
    pub fn create_zone_with_components(
        &self,
        input: &NewZone,
    ) -> ZoneServiceResult<ZoneCreateOutcome> {
        input.validate(&self.config)?;
        let clip_to_system = self.config.clip_new_zones_to_system_zones;

        self.write_tx("zone_create", |repo| {
            let key = input.classification_key();
            let ring_space = repo.ring_space();
            let footprint = to_multi_polygon(&input.geometry);

            let hits = find_overlapping(repo, input.floor, &footprint, OverlapScope::AnyZone)?;
            let classification = classify(&key, hits);

            let mut clip_footprints = Vec::new();
            let mut eligible_conflicts = Vec::new();
            for conflict in &classification.conflict_zones {
                if conflict.is_system_zone {
                    if clip_to_system && !input.is_system_zone {
                        clip_footprints.push(to_multi_polygon(&conflict.geometry));
                    }
                    log_conflict_skip(conflict, "system_zone");
                    continue;
                }
                match (input.owner_id, conflict.owner_id) {
                    (Some(new_owner), Some(owner)) if new_owner == owner => {
                        eligible_conflicts.push(conflict);
                    }
                    (None, _) => log_conflict_skip(conflict, "new_zone_unowned"),
                    _ => log_conflict_skip(conflict, "different_owner"),
                }
            }
            if input.conflict_policy == ConflictPolicy::ExistingWins {
                clip_footprints.extend(
                    eligible_conflicts
                        .iter()
                        .map(|conflict| to_multi_polygon(&conflict.geometry)),
                );
            }

            let pieces = if clip_footprints.is_empty() {
                vec![input.geometry.clone()]
            } else {
                let pieces = subtract_footprints(&ring_space, &footprint, &clip_footprints)?;
                if pieces.is_empty() {
                    return Err(ZoneServiceError::NoRemainingArea);
                }
                pieces
            };

            let mut changes = ChangeSet::default();
            let mut primary: Option<ZoneId> = None;
            for piece in &pieces {
                let zone_id = place_piece(repo, input, piece, &mut changes)?;
                // A later piece may merge the primary zone into an older one.
                primary = Some(changes.resolve(primary.unwrap_or(zone_id)));
            }

            if input.conflict_policy == ConflictPolicy::NewWins && !eligible_conflicts.is_empty() {
                let claimed = MultiPolygon::new(
                    pieces
                        .iter()
                        .flat_map(|piece| to_multi_polygon(piece).0)
                        .collect(),
                );
                for conflict in eligible_conflicts {
                    if !ring_space.overlaps(&claimed, &to_multi_polygon(&conflict.geometry)) {
                        continue;
                    }
                    let outcome = subtract(repo, conflict, &claimed)?;
                    changes.record_subtraction(outcome);
                }
            }

            let primary_id = primary.ok_or(ZoneServiceError::NoRemainingArea)?;
            changes.into_outcome(primary_id)
        })
    }

    /// Updates stored fields without running merge or conflict resolution.
    pub fn update_zone(&self, id: ZoneId, patch: &ZonePatch) -> ZoneServiceResult<Zone> {
        patch.validate(&self.config)?;

        self.write_tx("zone_update", |repo| {
            let mut zone = repo.get_zone(id)?.ok_or(ZoneServiceError::NotFound(id))?;
            if patch.is_empty() {
                return Ok(zone);
            }
            patch.apply_to(&mut zone);
            Ok(repo.update_zone(&zone)?)
        })
    }

    pub fn delete_zone(&self, id: ZoneId) -> ZoneServiceResult<()> {
        self.write_tx("zone_delete", |repo| Ok(repo.delete_zone(id)?))
    }

    /// Removes `geometry` from every overlapping zone on `floor` owned by
    /// `requesting_owner`.
    ///
    /// Returns the zones that still hold area of an affected zone, in target
    /// id order: the reduced zones followed by their split fragments.
    pub fn dezone(
        &self,
        floor: i32,
        geometry: &ZoneGeometry,
        requesting_owner: OwnerId,
    ) -> ZoneServiceResult<Vec<Zone>> {
        validate_floor(floor, &self.config)?;
        validate_owner(requesting_owner)?;
        validate_geometry(geometry, &self.config.ring_space())?;

        self.write_tx("zone_dezone", |repo| {
            let footprint = to_multi_polygon(geometry);
            let hits = find_overlapping(repo, floor, &footprint, OverlapScope::AnyZone)?;

            let mut remaining = Vec::new();
            for target in hits {
                if target.owner_id != Some(requesting_owner) {
                    log_conflict_skip(&target, "different_owner");
                    continue;
                }
                let outcome = subtract(repo, &target, &footprint)?;
                remaining.extend(outcome.remaining());
            }
            Ok(remaining)
        })
    }

    pub fn get_zone(&self, id: ZoneId) -> ZoneServiceResult<Option<Zone>> {
        Ok(self.repo().get_zone(id)?)
    }

    /// Lists zones on `floor` whose bounds meet `bbox`, most recently
    /// updated first.
    ///
    /// `bbox` is in ring coordinates; zones crossing the seam are found from
    /// either side.
    pub fn list_zones_by_area(
        &self,
        floor: i32,
        bbox: &BoundingBox,
    ) -> ZoneServiceResult<Vec<Zone>> {
        validate_floor(floor, &self.config)?;
        validate_bounding_box(bbox)?;

        let ring_space = self.config.ring_space();
        let mut zones: Vec<Zone> = self
            .repo()
            .list_zones_near(floor, bbox)?
            .into_iter()
            .filter(|zone| {
                ring_space
                    .normalized_bounds(&zone.geometry)
                    .is_some_and(|bounds| ring_space.bounds_overlap(&bounds, bbox))
            })
            .collect();
        zones.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(zones)
    }

    /// Lists zones owned by `owner_id`, most recently updated first.
    pub fn list_zones_by_owner(&self, owner_id: OwnerId) -> ZoneServiceResult<Vec<Zone>> {
        validate_owner(owner_id)?;
        Ok(self.repo().list_zones_by_owner(owner_id)?)
    }

    pub fn count_zones(&self) -> ZoneServiceResult<i64> {
        Ok(self.repo().count_zones()?)
    }

    /// Removes every zone. Returns the number of rows deleted.
    pub fn delete_all_zones(&self) -> ZoneServiceResult<usize> {
        self.write_tx("zone_delete_all", |repo| Ok(repo.delete_all_zones()?))
    }

    fn repo(&self) -> SqliteZoneRepository<'conn> {
        SqliteZoneRepository::new(self.conn, self.config.ring_space())
    }

    /// Runs `op` in an immediate transaction, committing only on success.
    fn write_tx<T>(
        &self,
        event: &'static str,
        op: impl FnOnce(&SqliteZoneRepository<'_>) -> ZoneServiceResult<T>,
    ) -> ZoneServiceResult<T> {
        let started_at = Instant::now();
        let result = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(ZoneServiceError::from)
            .and_then(|tx| {
                let value = {
                    let repo = SqliteZoneRepository::new(&tx, self.config.ring_space());
                    op(&repo)?
                };
                tx.commit()?;
                Ok(value)
            });

        match &result {
            Ok(_) => info!(
                "event={} module=service status=ok duration_ms={}",
                event,
                started_at.elapsed().as_millis()
            ),
            Err(err @ (ZoneServiceError::Repo(_) | ZoneServiceError::GeometryEngine(_))) => error!(
                "event={} module=service status=error duration_ms={} error_code={} error={}",
                event,
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
            Err(err) => warn!(
                "event={} module=service status=rejected duration_ms={} error_code={}",
                event,
                started_at.elapsed().as_millis(),
                err.code()
            ),
        }
        result
    }
}

/// Stores one footprint piece: merges it into connected same-key zones, or
/// inserts it when none overlap. Returns the id now holding the piece.
fn place_piece<R: ZoneRepository + ?Sized>(
    repo: &R,
    input: &NewZone,
    piece: &ZoneGeometry,
    changes: &mut ChangeSet,
) -> ZoneServiceResult<ZoneId> {
    let key = input.classification_key();
    let footprint = to_multi_polygon(piece);
    let seeds = find_overlapping(repo, input.floor, &footprint, OverlapScope::Classification(&key))?;
    let merge_set = build_merge_set(repo, &key, &footprint, &seeds)?;
    if merge_set.is_empty() {
        let stored = repo.insert_zone(&NewZone {
            geometry: piece.clone(),
            ..input.clone()
        })?;
        let id = stored.id;
        changes.record_created(stored);
        return Ok(id);
    }

    let outcome = merge(repo, &footprint, &merge_set)?;
    let id = outcome.survivor.id;
    for deleted in &outcome.deleted {
        changes.record_merged_away(*deleted, id);
    }
    changes.record_updated(outcome.survivor);
    Ok(id)
}

fn log_conflict_skip(zone: &Zone, reason: &str) {
    info!(
        "event=conflict_skipped module=service zone_id={} reason={}",
        zone.id, reason
    );
}

/// Net effect of one create, keyed by zone id.
#[derive(Debug, Default)]
struct ChangeSet {
    created: BTreeMap<ZoneId, Zone>,
    updated: BTreeMap<ZoneId, Zone>,
    deleted: Vec<ZoneId>,
    merged_into: BTreeMap<ZoneId, ZoneId>,
}

impl ChangeSet {
    fn record_created(&mut self, zone: Zone) {
        self.created.insert(zone.id, zone);
    }

    fn record_updated(&mut self, zone: Zone) {
        match self.created.get_mut(&zone.id) {
            Some(created) => *created = zone,
            None => {
                self.updated.insert(zone.id, zone);
            }
        }
    }

    fn record_deleted(&mut self, id: ZoneId) {
        let was_created = self.created.remove(&id).is_some();
        self.updated.remove(&id);
        if !was_created {
            self.deleted.push(id);
        }
    }

    fn record_merged_away(&mut self, id: ZoneId, survivor: ZoneId) {
        self.record_deleted(id);
        self.merged_into.insert(id, survivor);
    }

    fn record_subtraction(&mut self, outcome: SubtractOutcome) {
        if let Some(id) = outcome.deleted {
            self.record_deleted(id);
        }
        if let Some(zone) = outcome.updated {
            self.record_updated(zone);
        }
        for zone in outcome.created {
            self.record_created(zone);
        }
    }

    /// Follows merges from `id` to the zone that absorbed it.
    fn resolve(&self, mut id: ZoneId) -> ZoneId {
        while let Some(survivor) = self.merged_into.get(&id) {
            if *survivor == id {
                break;
            }
            id = *survivor;
        }
        id
    }

    fn into_outcome(mut self, primary_id: ZoneId) -> ZoneServiceResult<ZoneCreateOutcome> {
        let primary_id = self.resolve(primary_id);
        let zone = self
            .created
            .remove(&primary_id)
            .or_else(|| self.updated.remove(&primary_id))
            .ok_or(ZoneServiceError::NotFound(primary_id))?;
        Ok(ZoneCreateOutcome {
            zone,
            created: self.created.into_values().collect(),
            updated: self.updated.into_values().collect(),
            deleted: self.deleted,
        })
    }
}
