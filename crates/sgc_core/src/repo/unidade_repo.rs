//! Organizational unit repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the unit tree, responsible users and vigente map pointers.
//!
//! # Invariants
//! - Listing is deterministic: `codigo ASC`.
//! - A unit has at most one vigente map; promoting a new one replaces it.

use super::{ensure_connection_ready, invalid_code, parse_uuid, RepoError, RepoResult};
use crate::model::mapa::MapaId;
use crate::model::unidade::{CodigoUnidade, Responsavel, TipoUnidade, Unidade};
use rusqlite::{params, Connection, OptionalExtension, Row};

const UNIDADE_SELECT_SQL: &str = "SELECT
    codigo,
    sigla,
    nome,
    tipo,
    unidade_superior
FROM unidades";

pub trait UnidadeRepository {
    fn inserir_unidade(&self, unidade: &Unidade) -> RepoResult<()>;
    fn buscar_unidade(&self, codigo: CodigoUnidade) -> RepoResult<Option<Unidade>>;
    fn listar_unidades(&self) -> RepoResult<Vec<Unidade>>;
    fn inserir_responsavel(&self, responsavel: &Responsavel) -> RepoResult<()>;
    fn listar_responsaveis(&self, codigo: CodigoUnidade) -> RepoResult<Vec<Responsavel>>;
    /// Returns the current vigente map of a unit, if any.
    fn mapa_vigente(&self, codigo: CodigoUnidade) -> RepoResult<Option<MapaId>>;
    fn definir_mapa_vigente(
        &self,
        codigo: CodigoUnidade,
        mapa_id: MapaId,
        data_vigencia: i64,
    ) -> RepoResult<()>;
}

/// SQLite-backed unit repository.
pub struct SqliteUnidadeRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> SqliteUnidadeRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl UnidadeRepository for SqliteUnidadeRepository<'_> {
    fn inserir_unidade(&self, unidade: &Unidade) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO unidades (codigo, sigla, nome, tipo, unidade_superior)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                unidade.codigo,
                unidade.sigla,
                unidade.nome,
                unidade.tipo.as_str(),
                unidade.unidade_superior,
            ],
        )?;
        Ok(())
    }

    fn buscar_unidade(&self, codigo: CodigoUnidade) -> RepoResult<Option<Unidade>> {
        let sql = format!("{UNIDADE_SELECT_SQL} WHERE codigo = ?1;");
        self.conn
            .query_row(&sql, [codigo], |row| Ok(parse_unidade_row(row)))
            .optional()?
            .transpose()
    }

    fn listar_unidades(&self) -> RepoResult<Vec<Unidade>> {
        let sql = format!("{UNIDADE_SELECT_SQL} ORDER BY codigo ASC;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut unidades = Vec::new();
        while let Some(row) = rows.next()? {
            unidades.push(parse_unidade_row(row)?);
        }
        Ok(unidades)
    }

    fn inserir_responsavel(&self, responsavel: &Responsavel) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO unidade_responsaveis (unidade, titulo, nome, email)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                responsavel.unidade,
                responsavel.titulo,
                responsavel.nome,
                responsavel.email,
            ],
        )?;
        Ok(())
    }

    fn listar_responsaveis(&self, codigo: CodigoUnidade) -> RepoResult<Vec<Responsavel>> {
        let mut stmt = self.conn.prepare(
            "SELECT unidade, titulo, nome, email
             FROM unidade_responsaveis
             WHERE unidade = ?1
             ORDER BY titulo ASC;",
        )?;
        let mut rows = stmt.query([codigo])?;
        let mut responsaveis = Vec::new();
        while let Some(row) = rows.next()? {
            responsaveis.push(Responsavel {
                unidade: row.get(0)?,
                titulo: row.get(1)?,
                nome: row.get(2)?,
                email: row.get(3)?,
            });
        }
        Ok(responsaveis)
    }

    fn mapa_vigente(&self, codigo: CodigoUnidade) -> RepoResult<Option<MapaId>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT mapa_uuid FROM unidade_mapa_vigente WHERE unidade = ?1;",
                [codigo],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|value| parse_uuid(&value, "unidade_mapa_vigente.mapa_uuid"))
            .transpose()
    }

    fn definir_mapa_vigente(
        &self,
        codigo: CodigoUnidade,
        mapa_id: MapaId,
        data_vigencia: i64,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "INSERT INTO unidade_mapa_vigente (unidade, mapa_uuid, data_vigencia)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(unidade) DO UPDATE SET
                mapa_uuid = excluded.mapa_uuid,
                data_vigencia = excluded.data_vigencia;",
            params![codigo, mapa_id.to_string(), data_vigencia],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("unidade", codigo));
        }
        Ok(())
    }
}

fn parse_unidade_row(row: &Row<'_>) -> RepoResult<Unidade> {
    let tipo_raw: String = row.get(3)?;
    let tipo = TipoUnidade::parse(&tipo_raw).ok_or_else(|| invalid_code("unidades.tipo", &tipo_raw))?;
    Ok(Unidade {
        codigo: row.get(0)?,
        sigla: row.get(1)?,
        nome: row.get(2)?,
        tipo,
        unidade_superior: row.get(4)?,
    })
}
