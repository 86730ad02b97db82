//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per aggregate.
//! - Isolate SQLite query details from workflow orchestration.
//!
//! # Invariants
//! - Repositories are only built over connections at the latest schema
//!   version (`ensure_connection_ready`).
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Repositories never open transactions themselves; callers wrap a unit of
//!   work in one `BEGIN IMMEDIATE` transaction and build repositories over it.

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub mod mapa_repo;
pub mod processo_repo;
pub mod registro_repo;
pub mod subprocesso_repo;
pub mod unidade_repo;

use mapa_repo::SqliteMapaRepository;
use processo_repo::SqliteProcessoRepository;
use registro_repo::SqliteRegistroRepository;
use subprocesso_repo::SqliteSubprocessoRepository;
use unidade_repo::SqliteUnidadeRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors shared by every repository.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Entity does not exist.
    NotFound { entidade: &'static str, id: String },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
}

impl RepoError {
    pub(crate) fn not_found(entidade: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entidade,
            id: id.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entidade, id } => write!(f, "{entidade} not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

const REQUIRED_TABLES: &[&str] = &[
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

/// Verifies the connection was opened through `db::open_db*`.
pub fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in REQUIRED_TABLES {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

/// Every SQLite repository bound to one connection or open transaction.
pub struct Repositorios<'conn> {
    pub unidades: SqliteUnidadeRepository<'conn>,
    pub processos: SqliteProcessoRepository<'conn>,
    pub subprocessos: SqliteSubprocessoRepository<'conn>,
    pub mapas: SqliteMapaRepository<'conn>,
    pub registros: SqliteRegistroRepository<'conn>,
}

impl<'conn> Repositorios<'conn> {
    /// Binds repositories to a connection already checked by
    /// `ensure_connection_ready`.
    pub(crate) fn sobre(conn: &'conn Connection) -> Self {
        Self {
            unidades: SqliteUnidadeRepository { conn },
            processos: SqliteProcessoRepository { conn },
            subprocessos: SqliteSubprocessoRepository { conn },
            mapas: SqliteMapaRepository { conn },
            registros: SqliteRegistroRepository { conn },
        }
    }
}

/// Current wall-clock time as epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<Uuid>> {
    value.map(|raw| parse_uuid(&raw, column)).transpose()
}

pub(crate) fn invalid_code(column: &'static str, value: &str) -> RepoError {
    RepoError::InvalidData(format!("unknown code `{value}` in {column}"))
}
