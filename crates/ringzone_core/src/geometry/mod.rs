//! Geometry layer: validation, planar set operations and ring wrap handling.
//!
//! # Responsibility
//! - `validate`: structural and bounds checks on caller geometry.
//! - `ops`: planar union/difference/intersects over the `geo` kernel.
//! - `ring_space`: seam normalization, alignment and canonicalization.
//!
//! # Invariants
//! - Planar operations only ever see aligned, normalized participants.

pub mod ops;
pub mod ring_space;
pub mod validate;

pub use ops::{GeometryEngineError, GeometryResult};
pub use ring_space::{AlignedFrame, RingSpace};
pub use validate::{validate_geometry, GeometryValidationError};
