//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `ringzone_core` linkage without any host application.
//! - Optionally open a zone store and report its size.
//!
//! Usage: `ringzone_cli [DB_PATH] [CONFIG_JSON_PATH]`

use ringzone_core::{open_db, EngineConfig, ZoneService};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("ringzone_core ping={}", ringzone_core::ping());
    println!("ringzone_core version={}", ringzone_core::core_version());

    let mut args = std::env::args().skip(1);
    let Some(db_path) = args.next() else {
        return ExitCode::SUCCESS;
    };

    match probe_store(&db_path, args.next().as_deref()) {
        Ok(count) => {
            println!("zone_store path={db_path} zones={count}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("zone_store path={db_path} error={err}");
            ExitCode::FAILURE
        }
    }
}

fn probe_store(
    db_path: &str,
    config_path: Option<&str>,
) -> Result<i64, Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => EngineConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    let conn = open_db(db_path)?;
    let count = ZoneService::new(&conn, config).count_zones()?;
    Ok(count)
}
