use ringzone_core::config::DEFAULT_RING_CIRCUMFERENCE;
use ringzone_core::db::open_db_in_memory;
use ringzone_core::engine::overlap::{find_overlapping, OverlapScope};
use ringzone_core::geometry::ops::to_multi_polygon;
use ringzone_core::{
    BoundingBox, EngineConfig, NewZone, SqliteZoneRepository, ZoneGeometry, ZoneService,
};

const C: f64 = DEFAULT_RING_CIRCUMFERENCE;

fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> ZoneGeometry {
    ZoneGeometry::rectangle(min_x, min_y, max_x, max_y)
}

fn assert_canonical(geometry: &ZoneGeometry) {
    for [x, _] in geometry.positions() {
        assert!((0.0..C).contains(x), "x={x} is outside [0, C)");
    }
}

#[test]
fn seam_crossing_zone_keeps_its_short_way_area() {
    let conn = open_db_in_memory().unwrap();
    let service = ZoneService::new(&conn, EngineConfig::default());

    let zone = service
        .create_zone(&NewZone::new("Gate", "transit", 0, rect(C - 10.0, 0.0, 10.0, 50.0)))
        .unwrap();

    assert!((zone.area - 1_000.0).abs() < 1e-6);
    assert_canonical(&zone.geometry);
}

#[test]
fn zones_merge_across_the_seam() {
    let conn = open_db_in_memory().unwrap();
    let service = ZoneService::new(&conn, EngineConfig::default());
    let west = service
        .create_zone(
            &NewZone::new("Seam park", "park", 0, rect(C - 50.0, 0.0, 10.0, 10.0)).owned_by(3),
        )
        .unwrap();

    let merged = service
        .create_zone(&NewZone::new("East park", "park", 0, rect(5.0, 0.0, 40.0, 10.0)).owned_by(3))
        .unwrap();

    assert_eq!(merged.id, west.id);
    assert!((merged.area - 900.0).abs() < 1e-6);
    assert_canonical(&merged.geometry);
    assert_eq!(service.count_zones().unwrap(), 1);
}

#[test]
fn zones_on_opposite_ends_of_the_seam_overlap() {
    let conn = open_db_in_memory().unwrap();
    let service = ZoneService::new(&conn, EngineConfig::default());
    let tail = service
        .create_zone(
            &NewZone::new("Tail", "park", 0, rect(C - 30.0, 0.0, C - 1.0, 10.0)).owned_by(3),
        )
        .unwrap();

    // Seam-crossing zone reaching back over the tail end of the ring.
    let merged = service
        .create_zone(&NewZone::new("Head", "park", 0, rect(C - 5.0, 0.0, 20.0, 10.0)).owned_by(3))
        .unwrap();

    assert_eq!(merged.id, tail.id);
    assert!((merged.area - 500.0).abs() < 1e-6);
    assert_canonical(&merged.geometry);
}

#[test]
fn dezone_splits_seam_zone_on_both_sides() {
    let conn = open_db_in_memory().unwrap();
    let service = ZoneService::new(&conn, EngineConfig::default());
    service
        .create_zone(
            &NewZone::new("Bridge", "transit", 0, rect(C - 50.0, 0.0, 50.0, 10.0)).owned_by(8),
        )
        .unwrap();

    let remaining = service
        .dezone(0, &rect(0.0, -5.0, 10.0, 15.0), 8)
        .unwrap();

    assert_eq!(remaining.len(), 2);
    assert!((remaining[0].area - 500.0).abs() < 1e-6);
    assert!((remaining[1].area - 400.0).abs() < 1e-6);
    for zone in &remaining {
        assert_canonical(&zone.geometry);
    }
}

#[test]
fn area_listing_finds_seam_zone_from_both_sides() {
    let conn = open_db_in_memory().unwrap();
    let service = ZoneService::new(&conn, EngineConfig::default());
    let gate = service
        .create_zone(&NewZone::new("Gate", "transit", 0, rect(C - 10.0, 0.0, 10.0, 50.0)))
        .unwrap();

    let from_start = service
        .list_zones_by_area(0, &BoundingBox::new(0.0, 0.0, 5.0, 10.0))
        .unwrap();
    let from_end = service
        .list_zones_by_area(0, &BoundingBox::new(C - 5.0, 0.0, C - 1.0, 10.0))
        .unwrap();
    let elsewhere = service
        .list_zones_by_area(0, &BoundingBox::new(100.0, 0.0, 200.0, 10.0))
        .unwrap();

    assert_eq!(from_start.iter().map(|z| z.id).collect::<Vec<_>>(), vec![gate.id]);
    assert_eq!(from_end.iter().map(|z| z.id).collect::<Vec<_>>(), vec![gate.id]);
    assert!(elsewhere.is_empty());
}

#[test]
fn zone_with_degenerate_unwrapped_shape_still_overlaps_and_merges() {
    let conn = open_db_in_memory().unwrap();
    let config = EngineConfig::default();
    let service = ZoneService::new(&conn, config.clone());

    // Spans more than half the ring, and is collinear once unwrapped.
    let sliver = ZoneGeometry::Polygon(vec![vec![
        [52_800_000.0, 0.0],
        [13_200_000.0, 5.0],
        [237_600_000.0, 10.0],
        [52_800_000.0, 0.0],
    ]]);
    let stored = service
        .create_zone(&NewZone::new("Sliver", "park", 0, sliver).owned_by(3))
        .unwrap();
    assert!((stored.area - 660_000_000.0).abs() < 1.0);

    let inner_box = rect(101_199_990.0, 4.0, 101_200_010.0, 6.0);
    let repo = SqliteZoneRepository::new(&conn, config.ring_space());
    let hits = find_overlapping(&repo, 0, &to_multi_polygon(&inner_box), OverlapScope::AnyZone)
        .unwrap();
    assert_eq!(hits.iter().map(|z| z.id).collect::<Vec<_>>(), vec![stored.id]);

    let merged = service
        .create_zone(&NewZone::new("Pond", "park", 0, inner_box).owned_by(3))
        .unwrap();
    assert_eq!(merged.id, stored.id);
    assert_eq!(service.count_zones().unwrap(), 1);
}
