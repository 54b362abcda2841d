use ringzone_core::db::open_db_in_memory;
use ringzone_core::{EngineConfig, NewZone, ZoneGeometry, ZonePatch, ZoneService};

fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> ZoneGeometry {
    ZoneGeometry::rectangle(min_x, min_y, max_x, max_y)
}

fn park(name: &str, geometry: ZoneGeometry) -> NewZone {
    NewZone::new(name, "park", 0, geometry).owned_by(11)
}

#[test]
fn merge_keeps_the_oldest_zone_identity() {
    let conn = open_db_in_memory().unwrap();
    let service = ZoneService::new(&conn, EngineConfig::default());
    let west = service
        .create_zone(&park("West", rect(0.0, 0.0, 100.0, 10.0)))
        .unwrap();
    let east = service
        .create_zone(&park("East", rect(200.0, 0.0, 300.0, 10.0)))
        .unwrap();

    let outcome = service
        .create_zone_with_components(&park("Bridge", rect(90.0, 0.0, 210.0, 10.0)))
        .unwrap();

    assert_eq!(outcome.zone.id, west.id);
    assert_eq!(outcome.zone.name, "West");
    assert_eq!(outcome.zone.created_at, west.created_at);
    assert!((outcome.zone.area - 3_000.0).abs() < 1e-6);
    assert_eq!(outcome.deleted, vec![east.id]);
    assert!(outcome.created.is_empty());
    assert!(outcome.updated.is_empty());

    assert_eq!(service.count_zones().unwrap(), 1);
    assert_eq!(service.get_zone(east.id).unwrap(), None);
}

#[test]
fn touching_zones_merge() {
    let conn = open_db_in_memory().unwrap();
    let service = ZoneService::new(&conn, EngineConfig::default());
    let first = service
        .create_zone(&park("First", rect(0.0, 0.0, 10.0, 10.0)))
        .unwrap();

    let merged = service
        .create_zone(&park("Second", rect(10.0, 0.0, 20.0, 10.0)))
        .unwrap();
    assert_eq!(merged.id, first.id);
    assert!((merged.area - 200.0).abs() < 1e-9);
    assert_eq!(service.count_zones().unwrap(), 1);
}

#[test]
fn merge_follows_overlap_chains_transitively() {
    let conn = open_db_in_memory().unwrap();
    let service = ZoneService::new(&conn, EngineConfig::default());
    let anchor = service
        .create_zone(&park("Anchor", rect(0.0, 0.0, 10.0, 10.0)))
        .unwrap();
    let link = service
        .create_zone(&park("Link", rect(30.0, 0.0, 40.0, 10.0)))
        .unwrap();
    let unrelated = service
        .create_zone(&park("Unrelated", rect(100.0, 0.0, 110.0, 10.0)))
        .unwrap();

    // Plain updates do not merge, so Anchor and Link now overlap in storage.
    let patch = ZonePatch {
        geometry: Some(rect(8.0, 0.0, 40.0, 10.0)),
        ..ZonePatch::default()
    };
    service.update_zone(link.id, &patch).unwrap();

    // The new zone only touches Link directly.
    let outcome = service
        .create_zone_with_components(&park("Tail", rect(35.0, 0.0, 50.0, 10.0)))
        .unwrap();

    assert_eq!(outcome.zone.id, anchor.id);
    assert_eq!(outcome.deleted, vec![link.id]);
    assert!((outcome.zone.area - 500.0).abs() < 1e-6);

    let remaining: Vec<i64> = service
        .list_zones_by_owner(11)
        .unwrap()
        .iter()
        .map(|zone| zone.id)
        .collect();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.contains(&anchor.id));
    assert!(remaining.contains(&unrelated.id));
}

#[test]
fn merging_twice_is_stable() {
    let conn = open_db_in_memory().unwrap();
    let service = ZoneService::new(&conn, EngineConfig::default());
    let base = service
        .create_zone(&park("Base", rect(0.0, 0.0, 50.0, 10.0)))
        .unwrap();

    let once = service
        .create_zone(&park("Inner", rect(10.0, 0.0, 20.0, 10.0)))
        .unwrap();
    let twice = service
        .create_zone(&park("Inner", rect(10.0, 0.0, 20.0, 10.0)))
        .unwrap();

    assert_eq!(once.id, base.id);
    assert_eq!(twice.id, base.id);
    assert!((twice.area - 500.0).abs() < 1e-6);
    assert_eq!(service.count_zones().unwrap(), 1);
}

#[test]
fn zones_on_other_floors_never_merge() {
    let conn = open_db_in_memory().unwrap();
    let service = ZoneService::new(&conn, EngineConfig::default());
    let ground = service
        .create_zone(&park("Ground", rect(0.0, 0.0, 10.0, 10.0)))
        .unwrap();

    let upper = service
        .create_zone(&NewZone::new("Upper", "park", 1, rect(0.0, 0.0, 10.0, 10.0)).owned_by(11))
        .unwrap();

    assert_ne!(upper.id, ground.id);
    assert_eq!(service.count_zones().unwrap(), 2);
}

#[test]
fn corner_touching_merge_keeps_only_the_larger_island() {
    let conn = open_db_in_memory().unwrap();
    let service = ZoneService::new(&conn, EngineConfig::default());
    let block = service
        .create_zone(&park("Block", rect(0.0, 0.0, 10.0, 10.0)))
        .unwrap();

    let merged = service
        .create_zone(&park("Corner", rect(10.0, 10.0, 15.0, 15.0)))
        .unwrap();

    assert_eq!(merged.id, block.id);
    assert!((merged.area - 100.0).abs() < 1e-9);
    assert_eq!(service.count_zones().unwrap(), 1);
}
