//! Core domain logic for ring zones.
//! This crate is the single source of truth for zone overlap invariants.

pub mod config;
pub mod db;
pub mod engine;
pub mod geometry;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, EngineConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use geometry::{GeometryEngineError, GeometryValidationError, RingSpace};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::geometry::{BoundingBox, ZoneGeometry};
pub use model::zone::{
    ClassificationKey, ConflictPolicy, NewZone, OwnerId, Zone, ZoneId, ZonePatch,
    ZoneValidationError,
};
pub use repo::zone_repo::{RepoError, RepoResult, SqliteZoneRepository, ZoneRepository};
pub use service::zone_service::{
    ZoneCreateOutcome, ZoneService, ZoneServiceError, ZoneServiceResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
