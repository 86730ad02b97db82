//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `sgc_core` linkage, configuration and database bootstrap.
//! - The first argument, when given, is the database file (else `SGC_DB_PATH`,
//!   else in-memory).
//! - Keep output deterministic for quick local sanity checks.

use log::info;
use sgc_core::db::migrations::schema_version;
use sgc_core::{init_logging, open_configured, SgcConfig};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("sgc_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let mut config = SgcConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(path) = std::env::args_os().nth(1) {
        config.db_path = Some(PathBuf::from(path));
    }
    let logging = init_logging(&config).map_err(|err| err.to_string())?;

    let conn = open_configured(&config).map_err(|err| err.to_string())?;
    let version = schema_version(&conn).map_err(|err| err.to_string())?;
    drop(conn);

    info!(
        "event=cli_smoke module=cli status=ok in_memory={} schema_version={}",
        config.db_path.is_none(),
        version
    );
    println!("sgc_core ping={}", sgc_core::ping());
    println!("sgc_core version={}", sgc_core::core_version());
    println!("sgc_core schema_version={version}");
    println!("sgc_core email_domain={}", config.email_domain);
    println!("sgc_core file_logging={logging}");
    Ok(())
}
