//! Periodic ring coordinate space.
//!
//! # Responsibility
//! - Normalize seam-crossing geometry into one contiguous planar piece.
//! - Align operation participants into a shared non-negative frame and map
//!   results back into canonical `[0, C)` coordinates.
//! - Provide wrap-aware area, bounds and overlap tests.
//!
//! # Invariants
//! - `normalize` is idempotent.
//! - A geometry whose X-span exceeds `C/2` is treated as crossing the seam.
//! - Canonical geometry has every x in `[0, C)`.
//!
//! # See also
//! - docs/architecture/zone-engine.md

use crate::config::{DEFAULT_MAX_LATERAL_OFFSET, DEFAULT_RING_CIRCUMFERENCE};
use crate::geometry::ops::{bounds, intersects, is_finite, to_multi_polygon};
use crate::model::geometry::{BoundingBox, ZoneGeometry};
use geo::{Area, Coord, CoordsIter, MapCoords, MultiPolygon, Translate};
use log::warn;

/// Ring extents: circumference `C` along x and lateral half-width `W` along y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingSpace {
    circumference: f64,
    max_lateral_offset: f64,
}

impl Default for RingSpace {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CIRCUMFERENCE, DEFAULT_MAX_LATERAL_OFFSET)
    }
}

impl RingSpace {
    pub fn new(circumference: f64, max_lateral_offset: f64) -> Self {
        Self {
            circumference,
            max_lateral_offset,
        }
    }

    pub fn circumference(&self) -> f64 {
        self.circumference
    }

    pub fn max_lateral_offset(&self) -> f64 {
        self.max_lateral_offset
    }

    pub fn half_circumference(&self) -> f64 {
        self.circumference / 2.0
    }

    /// Moves every vertex with `x > C/2` back by `C` when the X-span
    /// exceeds `C/2`. Geometry that does not cross the seam is returned as is.
    pub fn normalize(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        let half = self.half_circumference();
        let circumference = self.circumference;
        match x_range(geometry) {
            Some((min_x, max_x)) if max_x - min_x > half => {
                geometry.map_coords(move |coord| {
                    if coord.x > half {
                        Coord {
                            x: coord.x - circumference,
                            y: coord.y,
                        }
                    } else {
                        coord
                    }
                })
            }
            _ => geometry.clone(),
        }
    }

    /// Like `normalize`, but keeps the original geometry when the normalized
    /// one degenerates.
    pub fn normalize_or_original(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        let normalized = self.normalize(geometry);
        if is_usable(&normalized) {
            return normalized;
        }
        warn!(
            "event=ring_normalize module=geometry status=fallback reason=degenerate_result polygons={}",
            geometry.0.len()
        );
        geometry.clone()
    }

    /// Planar area of the normalized geometry.
    pub fn area(&self, geometry: &MultiPolygon<f64>) -> f64 {
        self.normalize_or_original(geometry).unsigned_area()
    }

    pub fn zone_area(&self, geometry: &ZoneGeometry) -> f64 {
        self.area(&to_multi_polygon(geometry))
    }

    /// Bounds of the normalized geometry; `min_x` may be negative.
    pub fn normalized_bounds(&self, geometry: &ZoneGeometry) -> Option<BoundingBox> {
        bounds(&self.normalize_or_original(&to_multi_polygon(geometry)))
    }

    /// Multiple of `C` that moves `center_x` onto the sheet nearest `anchor_x`.
    pub fn sheet_shift(&self, anchor_x: f64, center_x: f64) -> f64 {
        ((anchor_x - center_x) / self.circumference).round() * self.circumference
    }

    /// Whether `zone_bounds` (normalized) meets `query` on any adjacent sheet.
    pub fn bounds_overlap(&self, zone_bounds: &BoundingBox, query: &BoundingBox) -> bool {
        [0.0, self.circumference, -self.circumference]
            .iter()
            .any(|shift| zone_bounds.shifted_x(*shift).overlaps(query))
    }

    /// Normalizes every participant and places them in one planar frame.
    ///
    /// Non-anchor participants are first shifted by whole circumferences onto
    /// the anchor's sheet, then the whole set is translated so the smallest x
    /// is non-negative.
    pub fn align(&self, participants: &[MultiPolygon<f64>]) -> AlignedFrame {
        let normalized: Vec<MultiPolygon<f64>> = participants
            .iter()
            .map(|geometry| self.normalize_or_original(geometry))
            .collect();

        let anchor_x = normalized
            .first()
            .and_then(bounds)
            .map(|anchor| anchor.center_x());
        let sheeted: Vec<MultiPolygon<f64>> = normalized
            .into_iter()
            .enumerate()
            .map(|(index, geometry)| {
                let shift = match (index, anchor_x, bounds(&geometry)) {
                    (0, _, _) => 0.0,
                    (_, Some(anchor_x), Some(own)) => self.sheet_shift(anchor_x, own.center_x()),
                    _ => 0.0,
                };
                if shift == 0.0 {
                    geometry
                } else {
                    geometry.translate(shift, 0.0)
                }
            })
            .collect();

        let global_min_x = sheeted
            .iter()
            .filter_map(x_range)
            .map(|(min_x, _)| min_x)
            .fold(f64::INFINITY, f64::min);
        let offset = if global_min_x.is_finite() {
            -(global_min_x.min(0.0))
        } else {
            0.0
        };
        let geometries = if offset == 0.0 {
            sheeted
        } else {
            sheeted
                .into_iter()
                .map(|geometry| geometry.translate(offset, 0.0))
                .collect()
        };

        AlignedFrame {
            ring_space: *self,
            offset,
            geometries,
        }
    }

    /// Maps planar geometry back into `[0, C)`.
    ///
    /// The whole geometry first moves by one circumference when it sits left
    /// of zero or reaches `C`, then each vertex is reduced modulo `C`.
    pub fn canonicalize(&self, geometry: MultiPolygon<f64>) -> MultiPolygon<f64> {
        let Some((min_x, max_x)) = x_range(&geometry) else {
            return geometry;
        };
        let shifted = if min_x < 0.0 {
            geometry.translate(self.circumference, 0.0)
        } else if max_x >= self.circumference {
            geometry.translate(-self.circumference, 0.0)
        } else {
            geometry
        };
        let ring_space = *self;
        shifted.map_coords(move |coord| Coord {
            x: ring_space.wrap_x(coord.x),
            y: coord.y,
        })
    }

    /// Reduces one x into `[0, C)`.
    pub fn wrap_x(&self, x: f64) -> f64 {
        if (0.0..self.circumference).contains(&x) {
            return x;
        }
        let wrapped = x.rem_euclid(self.circumference);
        if wrapped >= self.circumference {
            0.0
        } else {
            wrapped
        }
    }

    /// Wrap-aware closed-set intersection test.
    pub fn overlaps(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
        let a = self.normalize_or_original(a);
        let b = self.normalize_or_original(b);
        let (Some(a_bounds), Some(b_bounds)) = (bounds(&a), bounds(&b)) else {
            return false;
        };
        let shift = self.sheet_shift(a_bounds.center_x(), b_bounds.center_x());
        if !a_bounds.overlaps(&b_bounds.shifted_x(shift)) {
            return false;
        }

        let frame = self.align(&[a, b]);
        match frame.geometries() {
            [left, right] => intersects(left, right),
            _ => false,
        }
    }
}

/// Participants of one planar operation, translated by `offset`.
#[derive(Debug, Clone)]
pub struct AlignedFrame {
    ring_space: RingSpace,
    offset: f64,
    geometries: Vec<MultiPolygon<f64>>,
}

impl AlignedFrame {
    /// Aligned participants, in the order passed to `RingSpace::align`.
    pub fn geometries(&self) -> &[MultiPolygon<f64>] {
        &self.geometries
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Reverses the frame translation and canonicalizes the result.
    pub fn restore(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        let untranslated = if self.offset == 0.0 {
            geometry.clone()
        } else {
            geometry.translate(-self.offset, 0.0)
        };
        self.ring_space.canonicalize(untranslated)
    }
}

fn x_range(geometry: &MultiPolygon<f64>) -> Option<(f64, f64)> {
    geometry.coords_iter().fold(None, |range, coord| match range {
        None => Some((coord.x, coord.x)),
        Some((min_x, max_x)) => Some((min_x.min(coord.x), max_x.max(coord.x))),
    })
}

fn is_usable(geometry: &MultiPolygon<f64>) -> bool {
    !geometry.0.is_empty()
        && is_finite(geometry)
        && geometry
            .0
            .iter()
            .all(|polygon| polygon.exterior().0.len() >= 4)
        && geometry.unsigned_area() > 0.0
}
