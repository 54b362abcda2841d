//! Zone geometry interchange model.
//!
//! # Responsibility
//! - Define the GeoJSON-shaped polygon/multipolygon exchanged with callers and
//!   persisted in `zones.geometry`.
//! - Provide small structural helpers (vertex iteration, bounds, rectangles).
//!
//! # Invariants
//! - Rings are stored exactly as received; closing and bounds are enforced by
//!   `geometry::validate`, not by construction.
//! - Coordinates are `f64` pairs `[x, y]`.

use serde::{Deserialize, Serialize};

/// One `[x, y]` vertex.
pub type Position = [f64; 2];

/// Closed ring: first position equals last.
pub type Ring = Vec<Position>;

/// Exterior ring followed by zero or more holes.
pub type PolygonRings = Vec<Ring>;

/// Polygon-like zone geometry in GeoJSON ring-list form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum ZoneGeometry {
    Polygon(PolygonRings),
    MultiPolygon(Vec<PolygonRings>),
}

impl ZoneGeometry {
    /// Axis-aligned rectangle with a counter-clockwise exterior ring.
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::Polygon(vec![vec![
            [min_x, min_y],
            [max_x, min_y],
            [max_x, max_y],
            [min_x, max_y],
            [min_x, min_y],
        ]])
    }

    /// Returns the polygons of this geometry, one entry for `Polygon`.
    pub fn polygons(&self) -> Vec<&PolygonRings> {
        match self {
            Self::Polygon(rings) => vec![rings],
            Self::MultiPolygon(polygons) => polygons.iter().collect(),
        }
    }

    /// Iterates every vertex of every ring.
    pub fn positions(&self) -> impl Iterator<Item = &Position> + '_ {
        self.polygons()
            .into_iter()
            .flat_map(|rings| rings.iter().flat_map(|ring| ring.iter()))
    }

    /// Raw coordinate bounds, without any wrap handling.
    ///
    /// Returns `None` when the geometry has no vertices.
    pub fn bounds(&self) -> Option<BoundingBox> {
        let mut positions = self.positions();
        let first = positions.next()?;
        let mut bounds = BoundingBox::new(first[0], first[1], first[0], first[1]);
        for [x, y] in positions {
            bounds.min_x = bounds.min_x.min(*x);
            bounds.min_y = bounds.min_y.min(*y);
            bounds.max_x = bounds.max_x.max(*x);
            bounds.max_y = bounds.max_y.max(*y);
        }
        Some(bounds)
    }

    /// Serializes to GeoJSON text.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses GeoJSON text.
    pub fn from_json(value: &str) -> serde_json::Result<Self> {
        serde_json::from_str(value)
    }
}

/// Axis-aligned bounding box in ring coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Closed-interval overlap test (touching edges count).
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Returns this box shifted along x.
    pub fn shifted_x(&self, dx: f64) -> Self {
        Self::new(self.min_x + dx, self.min_y, self.max_x + dx, self.max_y)
    }

    pub fn center_x(&self) -> f64 {
        (self.min_x + self.max_x) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundingBox, ZoneGeometry};

    #[test]
    fn polygon_serializes_as_geojson() {
        let geometry = ZoneGeometry::rectangle(0.0, 0.0, 1.0, 2.0);
        let json = geometry.to_json().unwrap();
        assert!(json.starts_with(r#"{"type":"Polygon","coordinates":[[[0.0,0.0]"#));

        let parsed = ZoneGeometry::from_json(&json).unwrap();
        assert_eq!(parsed, geometry);
    }

    #[test]
    fn multipolygon_parses_from_geojson() {
        let json = r#"{"type":"MultiPolygon","coordinates":[
            [[[0,0],[1,0],[1,1],[0,0]]],
            [[[5,5],[6,5],[6,6],[5,5]]]
        ]}"#;
        let parsed = ZoneGeometry::from_json(json).unwrap();
        assert_eq!(parsed.polygons().len(), 2);
        assert_eq!(parsed.positions().count(), 8);
    }

    #[test]
    fn unknown_geometry_kind_is_rejected() {
        let json = r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#;
        assert!(ZoneGeometry::from_json(json).is_err());
    }

    #[test]
    fn bounds_cover_all_rings() {
        let geometry = ZoneGeometry::Polygon(vec![
            vec![[0.0, -5.0], [10.0, -5.0], [10.0, 5.0], [0.0, -5.0]],
            vec![[2.0, 0.0], [3.0, 0.0], [3.0, 1.0], [2.0, 0.0]],
        ]);
        assert_eq!(
            geometry.bounds().unwrap(),
            BoundingBox::new(0.0, -5.0, 10.0, 5.0)
        );
    }

    #[test]
    fn bounding_boxes_touching_on_edge_overlap() {
        let left = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let right = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
        assert!(left.overlaps(&right));
        assert!(!left.overlaps(&right.shifted_x(0.5)));
    }
}
