//! Schema migrations for the workflow database.
//!
//! # Invariants
//! - Versions are contiguous from 1 and mirrored to `PRAGMA user_version`.
//! - Later scripts reference tables of earlier ones: organization tree (1),
//!   processes and maps (2), audit trail and alerts (3).
//! - Pending scripts run in one transaction; a failing script leaves the
//!   database at its previous version.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "organizacao",
        sql: include_str!("0001_organizacao.sql"),
    },
    Migration {
        version: 2,
        name: "processos",
        sql: include_str!("0002_processos.sql"),
    },
    Migration {
        version: 3,
        name: "registros",
        sql: include_str!("0003_registros.sql"),
    },
];

/// Schema version this binary migrates to.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Version recorded in the database file.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Brings `conn` to [`latest_version`]; returns the names of applied scripts.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<Vec<&'static str>> {
    let current = schema_version(conn)?;
    let latest = latest_version();
    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current)
        .collect();
    if pending.is_empty() {
        return Ok(Vec::new());
    }

    let tx = conn.transaction()?;
    for migration in &pending {
        tx.execute_batch(migration.sql)
            .and_then(|()| {
                tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
            })
            .map_err(|source| DbError::Migration {
                version: migration.version,
                name: migration.name,
                source,
            })?;
    }
    tx.commit()?;

    let names: Vec<&'static str> = pending.iter().map(|migration| migration.name).collect();
    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} applied={}",
        current,
        latest,
        names.join(",")
    );
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, schema_version, MIGRATIONS};
    use rusqlite::Connection;

    #[test]
    fn versions_are_contiguous_from_one() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, index + 1);
        }
    }

    #[test]
    fn fresh_database_runs_every_script_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(
            apply_migrations(&mut conn).unwrap(),
            vec!["organizacao", "processos", "registros"]
        );
        assert_eq!(schema_version(&conn).unwrap(), latest_version());
        assert!(apply_migrations(&mut conn).unwrap().is_empty());
    }

    #[test]
    fn partially_migrated_database_only_runs_the_rest() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0].sql).unwrap();
        conn.execute_batch("PRAGMA user_version = 1;").unwrap();

        assert_eq!(
            apply_migrations(&mut conn).unwrap(),
            vec!["processos", "registros"]
        );
    }
}
