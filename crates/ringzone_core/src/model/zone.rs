//! Zone domain model.
//!
//! # Responsibility
//! - Define the persisted zone record and its create/update inputs.
//! - Define the classification key that decides merge compatibility.
//! - Validate caller-provided fields before any engine step runs.
//!
//! # Invariants
//! - `id` is assigned by storage in creation order and never reused.
//! - `properties` and `metadata` are opaque and copied verbatim.
//! - Two zones are merge-compatible iff their `ClassificationKey`s are equal.
//!
//! # See also
//! - docs/architecture/zone-engine.md

use crate::config::EngineConfig;
use crate::geometry::validate::{validate_geometry, GeometryValidationError};
use crate::model::geometry::{BoundingBox, ZoneGeometry};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable zone identifier assigned in creation order.
pub type ZoneId = i64;

/// Player/account identifier owning a zone.
pub type OwnerId = i64;

/// Persisted zone record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub zone_type: String,
    /// Layer index. Zones on different floors never interact.
    pub floor: i32,
    /// `None` means unowned.
    pub owner_id: Option<OwnerId>,
    pub is_system_zone: bool,
    pub geometry: ZoneGeometry,
    /// Opaque JSON text, never interpreted by the engine.
    pub properties: Option<String>,
    /// Opaque JSON text, never interpreted by the engine.
    pub metadata: Option<String>,
    /// Planar area of the wrap-normalized geometry.
    pub area: f64,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Zone {
    pub fn classification_key(&self) -> ClassificationKey {
        ClassificationKey {
            floor: self.floor,
            zone_type: self.zone_type.clone(),
            owner_id: self.owner_id,
            is_system_zone: self.is_system_zone,
        }
    }

    /// Ordering used to pick a merge survivor: smallest id, then oldest.
    pub fn seniority(&self) -> (ZoneId, i64) {
        (self.id, self.created_at)
    }
}

/// Merge-compatibility key: (floor, type, owner-or-absent, system flag).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassificationKey {
    pub floor: i32,
    pub zone_type: String,
    pub owner_id: Option<OwnerId>,
    pub is_system_zone: bool,
}

impl ClassificationKey {
    pub fn matches(&self, zone: &Zone) -> bool {
        self.floor == zone.floor
            && self.zone_type == zone.zone_type
            && self.owner_id == zone.owner_id
            && self.is_system_zone == zone.is_system_zone
    }
}

/// How a new zone settles overlap with same-owner zones of another type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The new footprint is subtracted from the existing zones.
    #[default]
    NewWins,
    /// The existing zones' footprints are subtracted from the new zone.
    ExistingWins,
}

/// Create-zone input.
#[derive(Debug, Clone, PartialEq)]
pub struct NewZone {
    pub name: String,
    pub zone_type: String,
    pub floor: i32,
    pub owner_id: Option<OwnerId>,
    pub is_system_zone: bool,
    pub geometry: ZoneGeometry,
    pub properties: Option<String>,
    pub metadata: Option<String>,
    pub conflict_policy: ConflictPolicy,
}

impl NewZone {
    /// Creates an input with no owner, no blobs and the default conflict policy.
    pub fn new(
        name: impl Into<String>,
        zone_type: impl Into<String>,
        floor: i32,
        geometry: ZoneGeometry,
    ) -> Self {
        Self {
            name: name.into(),
            zone_type: zone_type.into(),
            floor,
            owner_id: None,
            is_system_zone: false,
            geometry,
            properties: None,
            metadata: None,
            conflict_policy: ConflictPolicy::default(),
        }
    }

    pub fn owned_by(mut self, owner_id: OwnerId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn system(mut self) -> Self {
        self.is_system_zone = true;
        self
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn classification_key(&self) -> ClassificationKey {
        ClassificationKey {
            floor: self.floor,
            zone_type: self.zone_type.clone(),
            owner_id: self.owner_id,
            is_system_zone: self.is_system_zone,
        }
    }

    /// Validates every field against the configured ring.
    pub fn validate(&self, config: &EngineConfig) -> Result<(), ZoneValidationError> {
        validate_name(&self.name)?;
        validate_zone_type(&self.zone_type)?;
        validate_floor(self.floor, config)?;
        if let Some(owner_id) = self.owner_id {
            validate_owner(owner_id)?;
        }
        validate_geometry(&self.geometry, &config.ring_space())?;
        Ok(())
    }
}

/// Partial update. `None` leaves a field unchanged.
///
/// Nullable fields use a nested option: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZonePatch {
    pub name: Option<String>,
    pub zone_type: Option<String>,
    pub floor: Option<i32>,
    pub owner_id: Option<Option<OwnerId>>,
    pub is_system_zone: Option<bool>,
    pub geometry: Option<ZoneGeometry>,
    pub properties: Option<Option<String>>,
    pub metadata: Option<Option<String>>,
}

impl ZonePatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Validates only the fields being changed.
    pub fn validate(&self, config: &EngineConfig) -> Result<(), ZoneValidationError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(zone_type) = &self.zone_type {
            validate_zone_type(zone_type)?;
        }
        if let Some(floor) = self.floor {
            validate_floor(floor, config)?;
        }
        if let Some(Some(owner_id)) = self.owner_id {
            validate_owner(owner_id)?;
        }
        if let Some(geometry) = &self.geometry {
            validate_geometry(geometry, &config.ring_space())?;
        }
        Ok(())
    }

    /// Applies the changed fields onto `zone`.
    pub fn apply_to(&self, zone: &mut Zone) {
        if let Some(name) = &self.name {
            zone.name = name.clone();
        }
        if let Some(zone_type) = &self.zone_type {
            zone.zone_type = zone_type.clone();
        }
        if let Some(floor) = self.floor {
            zone.floor = floor;
        }
        if let Some(owner_id) = self.owner_id {
            zone.owner_id = owner_id;
        }
        if let Some(is_system_zone) = self.is_system_zone {
            zone.is_system_zone = is_system_zone;
        }
        if let Some(geometry) = &self.geometry {
            zone.geometry = geometry.clone();
        }
        if let Some(properties) = &self.properties {
            zone.properties = properties.clone();
        }
        if let Some(metadata) = &self.metadata {
            zone.metadata = metadata.clone();
        }
    }
}

/// Field-level validation failure for zone inputs and queries.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneValidationError {
    EmptyName,
    EmptyZoneType,
    FloorOutOfRange { floor: i32, min: i32, max: i32 },
    InvalidOwner(OwnerId),
    InvalidBoundingBox(BoundingBox),
    Geometry(GeometryValidationError),
}

impl Display for ZoneValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "zone name cannot be empty"),
            Self::EmptyZoneType => write!(f, "zone type cannot be empty"),
            Self::FloorOutOfRange { floor, min, max } => {
                write!(f, "zone floor must be between {min} and {max}, got {floor}")
            }
            Self::InvalidOwner(owner_id) => write!(f, "invalid owner id: {owner_id}"),
            Self::InvalidBoundingBox(bbox) => write!(
                f,
                "invalid bounding box: ({}, {}) - ({}, {})",
                bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
            ),
            Self::Geometry(err) => write!(f, "invalid zone geometry: {err}"),
        }
    }
}

impl Error for ZoneValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Geometry(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GeometryValidationError> for ZoneValidationError {
    fn from(value: GeometryValidationError) -> Self {
        Self::Geometry(value)
    }
}

/// Validates a floor index against the configured range.
pub fn validate_floor(floor: i32, config: &EngineConfig) -> Result<(), ZoneValidationError> {
    if floor < config.min_floor || floor > config.max_floor {
        return Err(ZoneValidationError::FloorOutOfRange {
            floor,
            min: config.min_floor,
            max: config.max_floor,
        });
    }
    Ok(())
}

/// Validates an owner id used for lookups or ownership checks.
pub fn validate_owner(owner_id: OwnerId) -> Result<(), ZoneValidationError> {
    if owner_id <= 0 {
        return Err(ZoneValidationError::InvalidOwner(owner_id));
    }
    Ok(())
}

/// Validates a query rectangle: finite and non-degenerate.
pub fn validate_bounding_box(bbox: &BoundingBox) -> Result<(), ZoneValidationError> {
    let finite = [bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y]
        .iter()
        .all(|value| value.is_finite());
    if !finite || bbox.min_x >= bbox.max_x || bbox.min_y >= bbox.max_y {
        return Err(ZoneValidationError::InvalidBoundingBox(*bbox));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ZoneValidationError> {
    if name.trim().is_empty() {
        return Err(ZoneValidationError::EmptyName);
    }
    Ok(())
}

fn validate_zone_type(zone_type: &str) -> Result<(), ZoneValidationError> {
    if zone_type.trim().is_empty() {
        return Err(ZoneValidationError::EmptyZoneType);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ConflictPolicy, NewZone, ZonePatch, ZoneValidationError};
    use crate::config::EngineConfig;
    use crate::geometry::validate::GeometryValidationError;
    use crate::model::geometry::ZoneGeometry;

    fn square() -> ZoneGeometry {
        ZoneGeometry::rectangle(0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn new_zone_defaults_to_unowned_new_wins() {
        let zone = NewZone::new("Plaza", "commercial", 0, square());
        assert_eq!(zone.owner_id, None);
        assert!(!zone.is_system_zone);
        assert_eq!(zone.conflict_policy, ConflictPolicy::NewWins);
        zone.validate(&EngineConfig::default()).unwrap();
    }

    #[test]
    fn blank_name_and_type_are_rejected() {
        let config = EngineConfig::default();
        let err = NewZone::new("  ", "residential", 0, square())
            .validate(&config)
            .unwrap_err();
        assert_eq!(err, ZoneValidationError::EmptyName);

        let err = NewZone::new("Homes", "", 0, square())
            .validate(&config)
            .unwrap_err();
        assert_eq!(err, ZoneValidationError::EmptyZoneType);
    }

    #[test]
    fn floor_outside_configured_range_is_rejected() {
        let err = NewZone::new("Deep", "industrial", 3, square())
            .validate(&EngineConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ZoneValidationError::FloorOutOfRange { floor: 3, .. }
        ));
    }

    #[test]
    fn non_positive_owner_is_rejected() {
        let err = NewZone::new("Homes", "residential", 0, square())
            .owned_by(0)
            .validate(&EngineConfig::default())
            .unwrap_err();
        assert_eq!(err, ZoneValidationError::InvalidOwner(0));
    }

    #[test]
    fn patch_validates_only_changed_fields() {
        let config = EngineConfig::default();
        assert!(ZonePatch::default().is_empty());
        ZonePatch::default().validate(&config).unwrap();

        let patch = ZonePatch {
            geometry: Some(ZoneGeometry::rectangle(0.0, 0.0, 10.0, 9000.0)),
            ..ZonePatch::default()
        };
        let err = patch.validate(&config).unwrap_err();
        assert!(matches!(
            err,
            ZoneValidationError::Geometry(GeometryValidationError::YOutOfBounds { .. })
        ));
    }
}
