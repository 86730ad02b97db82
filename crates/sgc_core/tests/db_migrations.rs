use rusqlite::Connection;
use sgc_core::db::migrations::{latest_version, schema_version};
use sgc_core::db::{open_configured, open_db, open_db_in_memory, DbError};
use sgc_core::repo::ensure_connection_ready;
use sgc_core::{RepoError, SgcConfig};

const TABELAS: &[&str] = &[
    "unidades",
    "unidade_responsaveis",
    "processos",
    "processo_participantes",
    "mapas",
    "subprocessos",
    "atividades",
    "conhecimentos",
    "competencias",
    "competencia_atividades",
    "unidade_mapa_vigente",
    "movimentacoes",
    "analises",
    "alertas",
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    for table in TABELAS {
        assert_table_exists(&conn, table);
    }
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sgc.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first).unwrap(), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second).unwrap(), latest_version());
    assert_table_exists(&conn_second, "subprocessos");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn configured_path_is_created_and_migrated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dados").join("sgc.db");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let config = SgcConfig {
        db_path: Some(path.clone()),
        ..SgcConfig::default()
    };

    let conn = open_configured(&config).unwrap();

    assert!(path.exists());
    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    let memoria = open_configured(&SgcConfig::default()).unwrap();
    assert_table_exists(&memoria, "movimentacoes");
}

#[test]
fn repositories_refuse_unmigrated_connections() {
    let conn = Connection::open_in_memory().unwrap();
    let err = ensure_connection_ready(&conn).unwrap_err();
    assert!(matches!(err, RepoError::UninitializedConnection { .. }));
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
