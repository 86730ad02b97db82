//! Subprocess repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist subprocess rows and their stage dates.
//! - Provide the state compare-and-set that serializes concurrent transitions.
//!
//! # Invariants
//! - At most one subprocess per `(processo, unidade)` (enforced by schema).
//! - `transicionar` only writes when the stored state equals the expected
//!   source state.

use super::{ensure_connection_ready, invalid_code, parse_uuid, RepoError, RepoResult};
use crate::model::processo::ProcessoId;
use crate::model::subprocesso::{SituacaoSubprocesso, Subprocesso, SubprocessoId};
use crate::model::unidade::CodigoUnidade;
use rusqlite::{params, Connection, OptionalExtension, Row};

const SUBPROCESSO_SELECT_SQL: &str = "SELECT
    uuid,
    processo_uuid,
    unidade,
    mapa_uuid,
    situacao,
    data_limite_etapa1,
    data_fim_etapa1,
    data_limite_etapa2,
    data_fim_etapa2
FROM subprocessos";

pub trait SubprocessoRepository {
    fn inserir(&self, subprocesso: &Subprocesso) -> RepoResult<()>;
    fn buscar(&self, id: SubprocessoId) -> RepoResult<Option<Subprocesso>>;
    fn buscar_por_unidade(
        &self,
        processo_id: ProcessoId,
        unidade: CodigoUnidade,
    ) -> RepoResult<Option<Subprocesso>>;
    /// Subprocesses of a process ordered by unit code.
    fn listar_por_processo(&self, processo_id: ProcessoId) -> RepoResult<Vec<Subprocesso>>;
    /// Compare-and-set of the workflow state. Returns `false` when the stored
    /// state is no longer `de`.
    fn transicionar(
        &self,
        id: SubprocessoId,
        de: SituacaoSubprocesso,
        para: SituacaoSubprocesso,
    ) -> RepoResult<bool>;
    /// Writes the four stage date columns from `subprocesso`.
    fn salvar_prazos(&self, subprocesso: &Subprocesso) -> RepoResult<()>;
}

/// SQLite-backed subprocess repository.
pub struct SqliteSubprocessoRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> SqliteSubprocessoRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SubprocessoRepository for SqliteSubprocessoRepository<'_> {
    fn inserir(&self, subprocesso: &Subprocesso) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO subprocessos (
                uuid,
                processo_uuid,
                unidade,
                mapa_uuid,
                situacao,
                data_limite_etapa1,
                data_fim_etapa1,
                data_limite_etapa2,
                data_fim_etapa2
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                subprocesso.id.to_string(),
                subprocesso.processo_id.to_string(),
                subprocesso.unidade,
                subprocesso.mapa_id.to_string(),
                subprocesso.situacao.as_str(),
                subprocesso.data_limite_etapa1,
                subprocesso.data_fim_etapa1,
                subprocesso.data_limite_etapa2,
                subprocesso.data_fim_etapa2,
            ],
        )?;
        Ok(())
    }

    fn buscar(&self, id: SubprocessoId) -> RepoResult<Option<Subprocesso>> {
        let sql = format!("{SUBPROCESSO_SELECT_SQL} WHERE uuid = ?1;");
        self.conn
            .query_row(&sql, [id.to_string()], |row| Ok(parse_subprocesso_row(row)))
            .optional()?
            .transpose()
    }

    fn buscar_por_unidade(
        &self,
        processo_id: ProcessoId,
        unidade: CodigoUnidade,
    ) -> RepoResult<Option<Subprocesso>> {
        let sql = format!("{SUBPROCESSO_SELECT_SQL} WHERE processo_uuid = ?1 AND unidade = ?2;");
        self.conn
            .query_row(&sql, params![processo_id.to_string(), unidade], |row| {
                Ok(parse_subprocesso_row(row))
            })
            .optional()?
            .transpose()
    }

    fn listar_por_processo(&self, processo_id: ProcessoId) -> RepoResult<Vec<Subprocesso>> {
        let sql = format!("{SUBPROCESSO_SELECT_SQL} WHERE processo_uuid = ?1 ORDER BY unidade ASC;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([processo_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_subprocesso_row(row)?);
        }
        Ok(items)
    }

    fn transicionar(
        &self,
        id: SubprocessoId,
        de: SituacaoSubprocesso,
        para: SituacaoSubprocesso,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE subprocessos
             SET situacao = ?3
             WHERE uuid = ?1
               AND situacao = ?2;",
            params![id.to_string(), de.as_str(), para.as_str()],
        )?;
        Ok(changed == 1)
    }

    fn salvar_prazos(&self, subprocesso: &Subprocesso) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE subprocessos
             SET data_limite_etapa1 = ?2,
                 data_fim_etapa1 = ?3,
                 data_limite_etapa2 = ?4,
                 data_fim_etapa2 = ?5
             WHERE uuid = ?1;",
            params![
                subprocesso.id.to_string(),
                subprocesso.data_limite_etapa1,
                subprocesso.data_fim_etapa1,
                subprocesso.data_limite_etapa2,
                subprocesso.data_fim_etapa2,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("subprocesso", subprocesso.id));
        }
        Ok(())
    }
}

fn parse_subprocesso_row(row: &Row<'_>) -> RepoResult<Subprocesso> {
    let uuid_raw: String = row.get(0)?;
    let processo_raw: String = row.get(1)?;
    let mapa_raw: String = row.get(3)?;
    let situacao_raw: String = row.get(4)?;
    Ok(Subprocesso {
        id: parse_uuid(&uuid_raw, "subprocessos.uuid")?,
        processo_id: parse_uuid(&processo_raw, "subprocessos.processo_uuid")?,
        unidade: row.get(2)?,
        mapa_id: parse_uuid(&mapa_raw, "subprocessos.mapa_uuid")?,
        situacao: SituacaoSubprocesso::parse(&situacao_raw)
            .ok_or_else(|| invalid_code("subprocessos.situacao", &situacao_raw))?,
        data_limite_etapa1: row.get(5)?,
        data_fim_etapa1: row.get(6)?,
        data_limite_etapa2: row.get(7)?,
        data_fim_etapa2: row.get(8)?,
    })
}
