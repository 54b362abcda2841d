//! Zone overlap resolution engine.
//!
//! # Responsibility
//! - Find persisted zones overlapping a candidate footprint (`overlap`).
//! - Grow the transitive set of same-key zones to merge (`closure`).
//! - Union a merge set into its oldest member (`merge`).
//! - Subtract footprints and split the remainder (`subtract`).
//!
//! # Invariants
//! - Engine steps only run inside the caller's write transaction; they never
//!   commit on their own.
//! - Every planar step runs on aligned, normalized participants and stores
//!   canonical results.
//!
//! # See also
//! - docs/architecture/zone-engine.md

use crate::geometry::ops::GeometryEngineError;
use crate::repo::zone_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod closure;
pub mod merge;
pub mod overlap;
pub mod subtract;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug)]
pub enum EngineError {
    Repo(RepoError),
    Geometry(GeometryEngineError),
    /// A subtraction applied to the new zone left nothing to store.
    NoRemainingArea,
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Geometry(err) => write!(f, "{err}"),
            Self::NoRemainingArea => write!(f, "no area remains after resolving overlaps"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Geometry(err) => Some(err),
            Self::NoRemainingArea => None,
        }
    }
}

impl From<RepoError> for EngineError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<GeometryEngineError> for EngineError {
    fn from(value: GeometryEngineError) -> Self {
        Self::Geometry(value)
    }
}
