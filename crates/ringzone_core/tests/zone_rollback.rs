use ringzone_core::db::open_db_in_memory;
use ringzone_core::{EngineConfig, NewZone, ZoneGeometry, ZoneService, ZoneServiceError};

fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> ZoneGeometry {
    ZoneGeometry::rectangle(min_x, min_y, max_x, max_y)
}

#[test]
fn failed_split_insert_rolls_back_the_dezone() {
    let conn = open_db_in_memory().unwrap();
    let service = ZoneService::new(&conn, EngineConfig::default());
    let farm = service
        .create_zone(
            &NewZone::new("Farm", "agricultural", 0, rect(0.0, 0.0, 100.0, 100.0)).owned_by(5),
        )
        .unwrap();
    conn.execute_batch(
        "CREATE TRIGGER block_split_insert BEFORE INSERT ON zones
         WHEN NEW.name LIKE '%(Split%'
         BEGIN SELECT RAISE(ABORT, 'split blocked'); END;",
    )
    .unwrap();

    // The target is updated in place before its split fragment is inserted.
    let err = service
        .dezone(0, &rect(45.0, -10.0, 55.0, 110.0), 5)
        .unwrap_err();
    assert!(matches!(err, ZoneServiceError::Repo(_)));

    let after = service.get_zone(farm.id).unwrap().unwrap();
    assert_eq!(after.geometry, farm.geometry);
    assert!((after.area - 10_000.0).abs() < 1e-6);
    assert_eq!(after.updated_at, farm.updated_at);
    assert_eq!(service.count_zones().unwrap(), 1);
}

#[test]
fn failed_survivor_update_restores_merged_zones() {
    let conn = open_db_in_memory().unwrap();
    let service = ZoneService::new(&conn, EngineConfig::default());
    let west = service
        .create_zone(&NewZone::new("West", "park", 0, rect(0.0, 0.0, 100.0, 10.0)).owned_by(11))
        .unwrap();
    let east = service
        .create_zone(&NewZone::new("East", "park", 0, rect(200.0, 0.0, 300.0, 10.0)).owned_by(11))
        .unwrap();
    conn.execute_batch(
        "CREATE TRIGGER block_survivor_update BEFORE UPDATE ON zones
         WHEN OLD.name = 'West'
         BEGIN SELECT RAISE(ABORT, 'update blocked'); END;",
    )
    .unwrap();

    // East is deleted before West takes the union.
    let err = service
        .create_zone(&NewZone::new("Bridge", "park", 0, rect(90.0, 0.0, 210.0, 10.0)).owned_by(11))
        .unwrap_err();
    assert!(matches!(err, ZoneServiceError::Repo(_)));

    assert_eq!(service.get_zone(west.id).unwrap().unwrap(), west);
    assert_eq!(service.get_zone(east.id).unwrap().unwrap(), east);
    assert_eq!(service.count_zones().unwrap(), 2);
}

#[test]
fn failed_conflict_subtraction_rolls_back_the_new_zone() {
    let conn = open_db_in_memory().unwrap();
    let service = ZoneService::new(&conn, EngineConfig::default());
    let homes = service
        .create_zone(
            &NewZone::new("Homes", "residential", 0, rect(0.0, 0.0, 100.0, 10.0)).owned_by(1),
        )
        .unwrap();
    conn.execute_batch(
        "CREATE TRIGGER block_homes_update BEFORE UPDATE ON zones
         WHEN OLD.name = 'Homes'
         BEGIN SELECT RAISE(ABORT, 'update blocked'); END;",
    )
    .unwrap();

    // Shops is inserted before Homes loses the shared area.
    let err = service
        .create_zone(
            &NewZone::new("Shops", "commercial", 0, rect(50.0, 0.0, 150.0, 10.0)).owned_by(1),
        )
        .unwrap_err();
    assert!(matches!(err, ZoneServiceError::Repo(_)));

    assert_eq!(service.get_zone(homes.id).unwrap().unwrap(), homes);
    assert_eq!(service.count_zones().unwrap(), 1);
}
