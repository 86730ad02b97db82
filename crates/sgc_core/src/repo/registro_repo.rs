//! Movement, analysis and alert repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Append audit records produced by workflow transitions.
//! - Resolve the current location of a subprocess from its movements.
//!
//! # Invariants
//! - Movements are never updated or deleted here.
//! - "Latest" means `data_hora DESC, rowid DESC`, so records written in the
//!   same millisecond keep their insertion order.

use super::{ensure_connection_ready, invalid_code, parse_uuid, RepoResult};
use crate::model::processo::ProcessoId;
use crate::model::registro::{AcaoAnalise, Alerta, Analise, Movimentacao, TipoAnalise};
use crate::model::subprocesso::SubprocessoId;
use crate::model::unidade::CodigoUnidade;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};

const MOVIMENTACAO_SELECT_SQL: &str = "SELECT
    uuid,
    processo_uuid,
    subprocesso_uuid,
    unidade_origem,
    unidade_destino,
    descricao,
    usuario_titulo,
    data_hora
FROM movimentacoes";

const ANALISE_SELECT_SQL: &str = "SELECT
    uuid,
    subprocesso_uuid,
    tipo,
    acao,
    unidade,
    usuario_titulo,
    observacoes,
    data_hora
FROM analises";

const ALERTA_SELECT_SQL: &str = "SELECT
    uuid,
    processo_uuid,
    unidade_origem,
    unidade_destino,
    usuario_destino,
    descricao,
    data_hora
FROM alertas";

pub trait RegistroRepository {
    fn inserir_movimentacao(&self, movimentacao: &Movimentacao) -> RepoResult<()>;
    /// Movements of a subprocess, newest first.
    fn listar_movimentacoes(&self, subprocesso_id: SubprocessoId) -> RepoResult<Vec<Movimentacao>>;
    fn ultima_movimentacao(&self, subprocesso_id: SubprocessoId)
        -> RepoResult<Option<Movimentacao>>;
    fn inserir_analise(&self, analise: &Analise) -> RepoResult<()>;
    /// Analyses of one stage, newest first.
    fn listar_analises(
        &self,
        subprocesso_id: SubprocessoId,
        tipo: TipoAnalise,
    ) -> RepoResult<Vec<Analise>>;
    /// Removes every analysis of a subprocess; returns how many were removed.
    fn excluir_analises(&self, subprocesso_id: SubprocessoId) -> RepoResult<usize>;
    fn inserir_alerta(&self, alerta: &Alerta) -> RepoResult<()>;
    /// Alerts addressed to a unit, newest first.
    fn listar_alertas_unidade(&self, unidade: CodigoUnidade) -> RepoResult<Vec<Alerta>>;
    fn listar_alertas_processo(&self, processo_id: ProcessoId) -> RepoResult<Vec<Alerta>>;
}

/// SQLite-backed audit record repository.
pub struct SqliteRegistroRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> SqliteRegistroRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_alertas(&self, sql: &str, key: impl ToSql) -> RepoResult<Vec<Alerta>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([key])?;
        let mut alertas = Vec::new();
        while let Some(row) = rows.next()? {
            alertas.push(parse_alerta_row(row)?);
        }
        Ok(alertas)
    }
}

impl RegistroRepository for SqliteRegistroRepository<'_> {
    fn inserir_movimentacao(&self, movimentacao: &Movimentacao) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO movimentacoes (
                uuid,
                processo_uuid,
                subprocesso_uuid,
                unidade_origem,
                unidade_destino,
                descricao,
                usuario_titulo,
                data_hora
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                movimentacao.id.to_string(),
                movimentacao.processo_id.to_string(),
                movimentacao.subprocesso_id.to_string(),
                movimentacao.unidade_origem,
                movimentacao.unidade_destino,
                movimentacao.descricao,
                movimentacao.usuario_titulo,
                movimentacao.data_hora,
            ],
        )?;
        Ok(())
    }

    fn listar_movimentacoes(&self, subprocesso_id: SubprocessoId) -> RepoResult<Vec<Movimentacao>> {
        let sql = format!(
            "{MOVIMENTACAO_SELECT_SQL} WHERE subprocesso_uuid = ?1 ORDER BY data_hora DESC, rowid DESC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([subprocesso_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_movimentacao_row(row)?);
        }
        Ok(items)
    }

    fn ultima_movimentacao(
        &self,
        subprocesso_id: SubprocessoId,
    ) -> RepoResult<Option<Movimentacao>> {
        let sql = format!(
            "{MOVIMENTACAO_SELECT_SQL} WHERE subprocesso_uuid = ?1 ORDER BY data_hora DESC, rowid DESC LIMIT 1;"
        );
        self.conn
            .query_row(&sql, [subprocesso_id.to_string()], |row| {
                Ok(parse_movimentacao_row(row))
            })
            .optional()?
            .transpose()
    }

    fn inserir_analise(&self, analise: &Analise) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO analises (
                uuid,
                subprocesso_uuid,
                tipo,
                acao,
                unidade,
                usuario_titulo,
                observacoes,
                data_hora
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                analise.id.to_string(),
                analise.subprocesso_id.to_string(),
                analise.tipo.as_str(),
                analise.acao.as_str(),
                analise.unidade,
                analise.usuario_titulo,
                analise.observacoes,
                analise.data_hora,
            ],
        )?;
        Ok(())
    }

    fn listar_analises(
        &self,
        subprocesso_id: SubprocessoId,
        tipo: TipoAnalise,
    ) -> RepoResult<Vec<Analise>> {
        let sql = format!(
            "{ANALISE_SELECT_SQL} WHERE subprocesso_uuid = ?1 AND tipo = ?2 ORDER BY data_hora DESC, rowid DESC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![subprocesso_id.to_string(), tipo.as_str()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_analise_row(row)?);
        }
        Ok(items)
    }

    fn excluir_analises(&self, subprocesso_id: SubprocessoId) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM analises WHERE subprocesso_uuid = ?1;",
            [subprocesso_id.to_string()],
        )?;
        Ok(removed)
    }

    fn inserir_alerta(&self, alerta: &Alerta) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO alertas (
                uuid,
                processo_uuid,
                unidade_origem,
                unidade_destino,
                usuario_destino,
                descricao,
                data_hora
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                alerta.id.to_string(),
                alerta.processo_id.to_string(),
                alerta.unidade_origem,
                alerta.unidade_destino,
                alerta.usuario_destino,
                alerta.descricao,
                alerta.data_hora,
            ],
        )?;
        Ok(())
    }

    fn listar_alertas_unidade(&self, unidade: CodigoUnidade) -> RepoResult<Vec<Alerta>> {
        let sql = format!(
            "{ALERTA_SELECT_SQL} WHERE unidade_destino = ?1 ORDER BY data_hora DESC, rowid DESC;"
        );
        self.query_alertas(&sql, unidade)
    }

    fn listar_alertas_processo(&self, processo_id: ProcessoId) -> RepoResult<Vec<Alerta>> {
        let sql = format!(
            "{ALERTA_SELECT_SQL} WHERE processo_uuid = ?1 ORDER BY data_hora DESC, rowid DESC;"
        );
        self.query_alertas(&sql, processo_id.to_string())
    }
}

fn parse_movimentacao_row(row: &Row<'_>) -> RepoResult<Movimentacao> {
    let uuid_raw: String = row.get(0)?;
    let processo_raw: String = row.get(1)?;
    let subprocesso_raw: String = row.get(2)?;
    Ok(Movimentacao {
        id: parse_uuid(&uuid_raw, "movimentacoes.uuid")?,
        processo_id: parse_uuid(&processo_raw, "movimentacoes.processo_uuid")?,
        subprocesso_id: parse_uuid(&subprocesso_raw, "movimentacoes.subprocesso_uuid")?,
        unidade_origem: row.get(3)?,
        unidade_destino: row.get(4)?,
        descricao: row.get(5)?,
        usuario_titulo: row.get(6)?,
        data_hora: row.get(7)?,
    })
}

fn parse_analise_row(row: &Row<'_>) -> RepoResult<Analise> {
    let uuid_raw: String = row.get(0)?;
    let subprocesso_raw: String = row.get(1)?;
    let tipo_raw: String = row.get(2)?;
    let acao_raw: String = row.get(3)?;
    Ok(Analise {
        id: parse_uuid(&uuid_raw, "analises.uuid")?,
        subprocesso_id: parse_uuid(&subprocesso_raw, "analises.subprocesso_uuid")?,
        tipo: TipoAnalise::parse(&tipo_raw).ok_or_else(|| invalid_code("analises.tipo", &tipo_raw))?,
        acao: AcaoAnalise::parse(&acao_raw).ok_or_else(|| invalid_code("analises.acao", &acao_raw))?,
        unidade: row.get(4)?,
        usuario_titulo: row.get(5)?,
        observacoes: row.get(6)?,
        data_hora: row.get(7)?,
    })
}

fn parse_alerta_row(row: &Row<'_>) -> RepoResult<Alerta> {
    let uuid_raw: String = row.get(0)?;
    let processo_raw: String = row.get(1)?;
    Ok(Alerta {
        id: parse_uuid(&uuid_raw, "alertas.uuid")?,
        processo_id: parse_uuid(&processo_raw, "alertas.processo_uuid")?,
        unidade_origem: row.get(2)?,
        unidade_destino: row.get(3)?,
        usuario_destino: row.get(4)?,
        descricao: row.get(5)?,
        data_hora: row.get(6)?,
    })
}
