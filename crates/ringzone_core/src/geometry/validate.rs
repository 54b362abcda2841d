//! Structural and ring-bounds validation for zone geometry.
//!
//! # Responsibility
//! - Reject geometry that cannot be stored or operated on.
//!
//! # Invariants
//! - Accepted geometry has at least one polygon, every polygon has an exterior
//!   ring, and every ring is closed with at least four finite positions.
//! - Every accepted x lies in `[0, C)` and every y in `[-W, W]`.

use crate::geometry::ring_space::RingSpace;
use crate::model::geometry::ZoneGeometry;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Smallest ring: three distinct corners plus the closing position.
pub const MIN_RING_POSITIONS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum GeometryValidationError {
    Empty,
    MissingExterior { polygon: usize },
    TooFewPositions { polygon: usize, ring: usize, count: usize },
    RingNotClosed { polygon: usize, ring: usize },
    NonFiniteCoordinate { polygon: usize, ring: usize },
    XOutOfBounds { x: f64, circumference: f64 },
    YOutOfBounds { y: f64, max_lateral_offset: f64 },
}

impl Display for GeometryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "geometry has no polygons"),
            Self::MissingExterior { polygon } => {
                write!(f, "polygon {polygon} has no exterior ring")
            }
            Self::TooFewPositions {
                polygon,
                ring,
                count,
            } => write!(
                f,
                "ring {ring} of polygon {polygon} has {count} positions, need at least {MIN_RING_POSITIONS}"
            ),
            Self::RingNotClosed { polygon, ring } => {
                write!(f, "ring {ring} of polygon {polygon} is not closed")
            }
            Self::NonFiniteCoordinate { polygon, ring } => {
                write!(f, "ring {ring} of polygon {polygon} has a non-finite coordinate")
            }
            Self::XOutOfBounds { x, circumference } => {
                write!(f, "x={x} outside ring range [0, {circumference})")
            }
            Self::YOutOfBounds {
                y,
                max_lateral_offset,
            } => write!(
                f,
                "y={y} outside lateral range [-{max_lateral_offset}, {max_lateral_offset}]"
            ),
        }
    }
}

impl Error for GeometryValidationError {}

/// Validates structure and ring bounds of caller-provided geometry.
pub fn validate_geometry(
    geometry: &ZoneGeometry,
    ring_space: &RingSpace,
) -> Result<(), GeometryValidationError> {
    let polygons = geometry.polygons();
    if polygons.is_empty() {
        return Err(GeometryValidationError::Empty);
    }

    for (polygon_index, rings) in polygons.into_iter().enumerate() {
        if rings.is_empty() {
            return Err(GeometryValidationError::MissingExterior {
                polygon: polygon_index,
            });
        }
        for (ring_index, ring) in rings.iter().enumerate() {
            if ring.len() < MIN_RING_POSITIONS {
                return Err(GeometryValidationError::TooFewPositions {
                    polygon: polygon_index,
                    ring: ring_index,
                    count: ring.len(),
                });
            }
            if ring
                .iter()
                .any(|[x, y]| !x.is_finite() || !y.is_finite())
            {
                return Err(GeometryValidationError::NonFiniteCoordinate {
                    polygon: polygon_index,
                    ring: ring_index,
                });
            }
            if ring.first() != ring.last() {
                return Err(GeometryValidationError::RingNotClosed {
                    polygon: polygon_index,
                    ring: ring_index,
                });
            }
            for [x, y] in ring {
                if *x < 0.0 || *x >= ring_space.circumference() {
                    return Err(GeometryValidationError::XOutOfBounds {
                        x: *x,
                        circumference: ring_space.circumference(),
                    });
                }
                if y.abs() > ring_space.max_lateral_offset() {
                    return Err(GeometryValidationError::YOutOfBounds {
                        y: *y,
                        max_lateral_offset: ring_space.max_lateral_offset(),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_geometry, GeometryValidationError};
    use crate::geometry::ring_space::RingSpace;
    use crate::model::geometry::ZoneGeometry;

    #[test]
    fn rectangle_inside_ring_is_valid() {
        validate_geometry(
            &ZoneGeometry::rectangle(1_000.0, -100.0, 2_000.0, 100.0),
            &RingSpace::default(),
        )
        .unwrap();
    }

    #[test]
    fn empty_multipolygon_is_rejected() {
        let err = validate_geometry(&ZoneGeometry::MultiPolygon(Vec::new()), &RingSpace::default())
            .unwrap_err();
        assert_eq!(err, GeometryValidationError::Empty);
    }

    #[test]
    fn open_ring_is_rejected() {
        let geometry = ZoneGeometry::Polygon(vec![vec![
            [0.0, 0.0],
            [10.0, 0.0],
            [10.0, 10.0],
            [0.0, 10.0],
        ]]);
        let err = validate_geometry(&geometry, &RingSpace::default()).unwrap_err();
        assert_eq!(err, GeometryValidationError::RingNotClosed { polygon: 0, ring: 0 });
    }

    #[test]
    fn x_equal_to_circumference_is_out_of_bounds() {
        let ring_space = RingSpace::new(1_000.0, 50.0);
        let err = validate_geometry(&ZoneGeometry::rectangle(900.0, 0.0, 1_000.0, 10.0), &ring_space)
            .unwrap_err();
        assert!(matches!(err, GeometryValidationError::XOutOfBounds { x, .. } if x == 1_000.0));
    }

    #[test]
    fn lateral_edge_is_inclusive() {
        let ring_space = RingSpace::new(1_000.0, 50.0);
        validate_geometry(&ZoneGeometry::rectangle(0.0, -50.0, 10.0, 50.0), &ring_space).unwrap();
        let err = validate_geometry(&ZoneGeometry::rectangle(0.0, -51.0, 10.0, 50.0), &ring_space)
            .unwrap_err();
        assert!(matches!(err, GeometryValidationError::YOutOfBounds { .. }));
    }

    #[test]
    fn nan_coordinate_is_rejected() {
        let geometry = ZoneGeometry::Polygon(vec![vec![
            [0.0, 0.0],
            [f64::NAN, 0.0],
            [10.0, 10.0],
            [0.0, 0.0],
        ]]);
        let err = validate_geometry(&geometry, &RingSpace::default()).unwrap_err();
        assert_eq!(
            err,
            GeometryValidationError::NonFiniteCoordinate { polygon: 0, ring: 0 }
        );
    }
}
