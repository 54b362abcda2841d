//! Planar primitives over the `geo` kernel.
//!
//! # Responsibility
//! - Convert between `ZoneGeometry` ring lists and `geo` polygons.
//! - Run union/difference/intersects and report kernel failures as
//!   `GeometryEngineError` instead of unwinding.
//!
//! # Invariants
//! - Every operation here is purely planar; wrap handling lives in
//!   `ring_space`.
//! - Results never contain non-finite coordinates.

use crate::model::geometry::{BoundingBox, PolygonRings, Ring, ZoneGeometry};
use geo::{Area, BooleanOps, BoundingRect, Coord, CoordsIter, Intersects, LineString};
use geo::{MultiPolygon, Polygon};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Failure inside a planar set operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryEngineError {
    pub operation: &'static str,
    pub message: String,
}

impl GeometryEngineError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

impl Display for GeometryEngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "geometry {} failed: {}", self.operation, self.message)
    }
}

impl Error for GeometryEngineError {}

pub type GeometryResult<T> = Result<T, GeometryEngineError>;

/// Converts interchange geometry to a `geo` multipolygon.
pub fn to_multi_polygon(geometry: &ZoneGeometry) -> MultiPolygon<f64> {
    MultiPolygon::new(
        geometry
            .polygons()
            .into_iter()
            .map(rings_to_polygon)
            .collect(),
    )
}

/// Converts one `geo` polygon to a `Polygon` interchange geometry.
pub fn polygon_to_geometry(polygon: &Polygon<f64>) -> ZoneGeometry {
    ZoneGeometry::Polygon(polygon_rings(polygon))
}

/// Converts a multipolygon, collapsing single-member results to `Polygon`.
pub fn multi_polygon_to_geometry(geometry: &MultiPolygon<f64>) -> ZoneGeometry {
    match geometry.0.as_slice() {
        [single] => polygon_to_geometry(single),
        polygons => ZoneGeometry::MultiPolygon(polygons.iter().map(polygon_rings).collect()),
    }
}

/// Unions every part into one multipolygon.
pub fn union_all(parts: &[MultiPolygon<f64>]) -> GeometryResult<MultiPolygon<f64>> {
    let mut parts_iter = parts.iter();
    let Some(first) = parts_iter.next() else {
        return Err(GeometryEngineError::new("union", "no geometries to union"));
    };

    let mut merged = first.clone();
    for part in parts_iter {
        merged = run_kernel("union", || merged.union(part))?;
    }
    ensure_finite("union", merged)
}

/// Computes `subject - clip`.
pub fn difference(
    subject: &MultiPolygon<f64>,
    clip: &MultiPolygon<f64>,
) -> GeometryResult<MultiPolygon<f64>> {
    let result = run_kernel("difference", || subject.difference(clip))?;
    ensure_finite("difference", result)
}

/// Closed-set intersection test; shared boundaries count as intersecting.
pub fn intersects(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    a.0.iter()
        .any(|left| b.0.iter().any(|right| left.intersects(right)))
}

/// Splits a multipolygon into its polygon components, largest area first.
pub fn components_by_area(geometry: MultiPolygon<f64>) -> Vec<Polygon<f64>> {
    let mut components = geometry.0;
    components.sort_by(|a, b| b.unsigned_area().total_cmp(&a.unsigned_area()));
    components
}

/// Bounding box of a `geo` geometry, `None` when empty.
pub fn bounds(geometry: &MultiPolygon<f64>) -> Option<BoundingBox> {
    geometry.bounding_rect().map(|rect| {
        BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    })
}

/// Whether every coordinate is finite.
pub fn is_finite(geometry: &MultiPolygon<f64>) -> bool {
    geometry
        .coords_iter()
        .all(|coord| coord.x.is_finite() && coord.y.is_finite())
}

fn run_kernel<T>(operation: &'static str, op: impl FnOnce() -> T) -> GeometryResult<T> {
    catch_unwind(AssertUnwindSafe(op)).map_err(|payload| {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "planar kernel panicked".to_string()
        };
        GeometryEngineError::new(operation, message)
    })
}

fn ensure_finite(
    operation: &'static str,
    geometry: MultiPolygon<f64>,
) -> GeometryResult<MultiPolygon<f64>> {
    if !is_finite(&geometry) {
        return Err(GeometryEngineError::new(
            operation,
            "result contains non-finite coordinates",
        ));
    }
    Ok(geometry)
}

fn rings_to_polygon(rings: &PolygonRings) -> Polygon<f64> {
    let mut line_strings = rings.iter().map(ring_to_line_string);
    let exterior = line_strings
        .next()
        .unwrap_or_else(|| LineString::new(Vec::new()));
    Polygon::new(exterior, line_strings.collect())
}

fn ring_to_line_string(ring: &Ring) -> LineString<f64> {
    ring.iter().map(|[x, y]| Coord { x: *x, y: *y }).collect()
}

fn polygon_rings(polygon: &Polygon<f64>) -> PolygonRings {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|coord| [coord.x, coord.y]).collect())
        .collect()
}
