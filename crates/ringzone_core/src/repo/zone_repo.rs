//! Zone repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and spatial prefilter queries over the `zones` table.
//! - Derive `area` and bounds columns from geometry on every write.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate geometry against the ring before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Stored bounds are those of the wrap-normalized geometry, so `min_x` may
//!   be negative for seam-crossing zones.
//!
//! # See also
//! - docs/architecture/zone-engine.md

use crate::db::DbError;
use crate::geometry::ring_space::RingSpace;
use crate::geometry::validate::validate_geometry;
use crate::model::geometry::{BoundingBox, ZoneGeometry};
use crate::model::zone::{NewZone, OwnerId, Zone, ZoneId, ZoneValidationError};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ZONE_SELECT_SQL: &str = "SELECT
    id,
    name,
    zone_type,
    floor,
    owner_id,
    is_system_zone,
    geometry,
    properties,
    metadata,
    area,
    created_at,
    updated_at
FROM zones";

/// Wrap-aware bounding-box overlap against `?2..?5` = query min_x, min_y,
/// max_x, max_y and `?6` = circumference.
const BOUNDS_OVERLAP_SQL: &str = "min_y <= ?5 AND max_y >= ?3
   AND (
        (min_x <= ?4 AND max_x >= ?2)
     OR (min_x + ?6 <= ?4 AND max_x + ?6 >= ?2)
     OR (min_x - ?6 <= ?4 AND max_x - ?6 >= ?2)
   )";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for zone persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ZoneValidationError),
    Db(DbError),
    NotFound(ZoneId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "zone not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted zone data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ZoneValidationError> for RepoError {
    fn from(value: ZoneValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for zone persistence.
pub trait ZoneRepository {
    /// Stores a new zone and returns it with its assigned id and timestamps.
    fn insert_zone(&self, zone: &NewZone) -> RepoResult<Zone>;
    /// Rewrites every mutable column of `zone` and bumps `updated_at`.
    fn update_zone(&self, zone: &Zone) -> RepoResult<Zone>;
    fn delete_zone(&self, id: ZoneId) -> RepoResult<()>;
    fn get_zone(&self, id: ZoneId) -> RepoResult<Option<Zone>>;
    /// Zones on `floor` whose stored bounds meet `bounds` on any sheet.
    fn list_zones_near(&self, floor: i32, bounds: &BoundingBox) -> RepoResult<Vec<Zone>>;
    /// All zones on `floor`, ordered by id.
    fn list_zones_on_floor(&self, floor: i32) -> RepoResult<Vec<Zone>>;
    fn list_zones_by_owner(&self, owner_id: OwnerId) -> RepoResult<Vec<Zone>>;
    fn count_zones(&self) -> RepoResult<i64>;
    fn delete_all_zones(&self) -> RepoResult<usize>;
    /// Ring the stored geometry lives on.
    fn ring_space(&self) -> RingSpace;
}

/// SQLite-backed zone repository.
pub struct SqliteZoneRepository<'conn> {
    conn: &'conn Connection,
    ring_space: RingSpace,
}

impl<'conn> SqliteZoneRepository<'conn> {
    pub fn new(conn: &'conn Connection, ring_space: RingSpace) -> Self {
        Self { conn, ring_space }
    }

    fn derived_columns(&self, geometry: &ZoneGeometry) -> RepoResult<(String, f64, BoundingBox)> {
        validate_geometry(geometry, &self.ring_space).map_err(ZoneValidationError::from)?;
        let bounds = self.ring_space.normalized_bounds(geometry).ok_or_else(|| {
            RepoError::InvalidData("geometry has no vertices".to_string())
        })?;
        let area = self.ring_space.zone_area(geometry);
        let geometry_json = geometry
            .to_json()
            .map_err(|err| RepoError::InvalidData(format!("cannot encode geometry: {err}")))?;
        Ok((geometry_json, area, bounds))
    }

    fn query_zones(&self, sql: &str, params: impl rusqlite::Params) -> RepoResult<Vec<Zone>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut zones = Vec::new();
        while let Some(row) = rows.next()? {
            zones.push(parse_zone_row(row)?);
        }
        Ok(zones)
    }
}

impl ZoneRepository for SqliteZoneRepository<'_> {
    fn insert_zone(&self, zone: &NewZone) -> RepoResult<Zone> {
        let (geometry_json, area, bounds) = self.derived_columns(&zone.geometry)?;

        self.conn.execute(
            "INSERT INTO zones (
                name,
                zone_type,
                floor,
                owner_id,
                is_system_zone,
                geometry,
                properties,
                metadata,
                area,
                min_x,
                min_y,
                max_x,
                max_y
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                zone.name.as_str(),
                zone.zone_type.as_str(),
                zone.floor,
                zone.owner_id,
                bool_to_int(zone.is_system_zone),
                geometry_json,
                zone.properties.as_deref(),
                zone.metadata.as_deref(),
                area,
                bounds.min_x,
                bounds.min_y,
                bounds.max_x,
                bounds.max_y,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        self.get_zone(id)?.ok_or(RepoError::NotFound(id))
    }

    fn update_zone(&self, zone: &Zone) -> RepoResult<Zone> {
        let (geometry_json, area, bounds) = self.derived_columns(&zone.geometry)?;

        let changed = self.conn.execute(
            "UPDATE zones
             SET
                name = ?1,
                zone_type = ?2,
                floor = ?3,
                owner_id = ?4,
                is_system_zone = ?5,
                geometry = ?6,
                properties = ?7,
                metadata = ?8,
                area = ?9,
                min_x = ?10,
                min_y = ?11,
                max_x = ?12,
                max_y = ?13,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?14;",
            params![
                zone.name.as_str(),
                zone.zone_type.as_str(),
                zone.floor,
                zone.owner_id,
                bool_to_int(zone.is_system_zone),
                geometry_json,
                zone.properties.as_deref(),
                zone.metadata.as_deref(),
                area,
                bounds.min_x,
                bounds.min_y,
                bounds.max_x,
                bounds.max_y,
                zone.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(zone.id));
        }

        self.get_zone(zone.id)?.ok_or(RepoError::NotFound(zone.id))
    }

    fn delete_zone(&self, id: ZoneId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM zones WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn get_zone(&self, id: ZoneId) -> RepoResult<Option<Zone>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ZONE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_zone_row(row)?));
        }
        Ok(None)
    }

    fn list_zones_near(&self, floor: i32, bounds: &BoundingBox) -> RepoResult<Vec<Zone>> {
        self.query_zones(
            &format!("{ZONE_SELECT_SQL} WHERE floor = ?1 AND {BOUNDS_OVERLAP_SQL} ORDER BY id ASC;"),
            params![
                floor,
                bounds.min_x,
                bounds.min_y,
                bounds.max_x,
                bounds.max_y,
                self.ring_space.circumference(),
            ],
        )
    }

    fn list_zones_on_floor(&self, floor: i32) -> RepoResult<Vec<Zone>> {
        self.query_zones(
            &format!("{ZONE_SELECT_SQL} WHERE floor = ?1 ORDER BY id ASC;"),
            [floor],
        )
    }

    fn list_zones_by_owner(&self, owner_id: OwnerId) -> RepoResult<Vec<Zone>> {
        self.query_zones(
            &format!("{ZONE_SELECT_SQL} WHERE owner_id = ?1 ORDER BY updated_at DESC, id DESC;"),
            [owner_id],
        )
    }

    fn count_zones(&self) -> RepoResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM zones;", [], |row| row.get(0))?;
        Ok(count)
    }

    fn delete_all_zones(&self) -> RepoResult<usize> {
        let deleted = self.conn.execute("DELETE FROM zones;", [])?;
        Ok(deleted)
    }

    fn ring_space(&self) -> RingSpace {
        self.ring_space
    }
}

fn parse_zone_row(row: &Row<'_>) -> RepoResult<Zone> {
    let id: ZoneId = row.get("id")?;

    let geometry_text: String = row.get("geometry")?;
    let geometry = ZoneGeometry::from_json(&geometry_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid geometry in zones.geometry for zone {id}: {err}"))
    })?;

    let is_system_zone = match row.get::<_, i64>("is_system_zone")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_system_zone value `{other}` in zones.is_system_zone"
            )));
        }
    };

    let owner_id: Option<OwnerId> = row.get("owner_id")?;
    if let Some(owner) = owner_id {
        if owner <= 0 {
            return Err(RepoError::InvalidData(format!(
                "invalid owner_id `{owner}` in zones.owner_id for zone {id}"
            )));
        }
    }

    Ok(Zone {
        id,
        name: row.get("name")?,
        zone_type: row.get("zone_type")?,
        floor: row.get("floor")?,
        owner_id,
        is_system_zone,
        geometry,
        properties: row.get("properties")?,
        metadata: row.get("metadata")?,
        area: row.get("area")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
