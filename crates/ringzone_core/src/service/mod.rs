//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation, engine steps and repository calls into the
//!   zone operations callers use.
//! - Own transaction boundaries for every write.

pub mod zone_service;
