//! Repository layer over the zone store.
//!
//! # Responsibility
//! - Define the data access contract the overlap engine runs against.
//! - Isolate SQLite query details from engine and service orchestration.
//!
//! # Invariants
//! - Repository writes validate geometry before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod zone_repo;
