//! Domain model for ring zones.
//!
//! # Responsibility
//! - Define canonical data structures used by the overlap engine and storage.
//! - Keep geometry interchange (GeoJSON ring lists) separate from zone records.
//!
//! # Invariants
//! - Every zone is identified by a stable, creation-ordered `ZoneId`.
//! - Deletion is a hard delete; merges and full subtractions remove rows.
//!
//! # See also
//! - docs/architecture/zone-engine.md

pub mod geometry;
pub mod zone;
