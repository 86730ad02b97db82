//! Process repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist processes together with their participant set.
//! - Provide the status compare-and-set used by start/finalize.
//!
//! # Invariants
//! - Participants are always written and read as a whole set.
//! - Listing is deterministic: `data_criacao DESC, uuid ASC`.

use super::{ensure_connection_ready, invalid_code, parse_uuid, RepoError, RepoResult};
use crate::model::processo::{Processo, ProcessoId, SituacaoProcesso, TipoProcesso};
use crate::model::unidade::CodigoUnidade;
use rusqlite::{params, Connection, OptionalExtension, Row};

const PROCESSO_SELECT_SQL: &str = "SELECT
    uuid,
    descricao,
    tipo,
    situacao,
    data_criacao,
    data_limite,
    data_finalizacao
FROM processos";

pub trait ProcessoRepository {
    fn inserir(&self, processo: &Processo) -> RepoResult<()>;
    fn buscar(&self, id: ProcessoId) -> RepoResult<Option<Processo>>;
    fn listar(&self) -> RepoResult<Vec<Processo>>;
    /// Rewrites description, type, deadline and participants.
    fn atualizar(&self, processo: &Processo) -> RepoResult<()>;
    fn excluir(&self, id: ProcessoId) -> RepoResult<()>;
    /// Moves status from `de` to `para`. Returns `false` when the stored
    /// status was not `de`.
    fn transicionar(
        &self,
        id: ProcessoId,
        de: SituacaoProcesso,
        para: SituacaoProcesso,
        data_finalizacao: Option<i64>,
    ) -> RepoResult<bool>;
    /// Units taking part in any EM_ANDAMENTO process other than `exceto`.
    fn unidades_em_andamento(&self, exceto: ProcessoId) -> RepoResult<Vec<CodigoUnidade>>;
}

/// SQLite-backed process repository.
pub struct SqliteProcessoRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> SqliteProcessoRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn gravar_participantes(&self, processo: &Processo) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM processo_participantes WHERE processo_uuid = ?1;",
            [processo.id.to_string()],
        )?;
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO processo_participantes (processo_uuid, unidade)
             VALUES (?1, ?2);",
        )?;
        for codigo in &processo.participantes {
            stmt.execute(params![processo.id.to_string(), codigo])?;
        }
        Ok(())
    }

    fn carregar_participantes(&self, id: ProcessoId) -> RepoResult<Vec<CodigoUnidade>> {
        let mut stmt = self.conn.prepare(
            "SELECT unidade
             FROM processo_participantes
             WHERE processo_uuid = ?1
             ORDER BY unidade ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut codigos = Vec::new();
        while let Some(row) = rows.next()? {
            codigos.push(row.get(0)?);
        }
        Ok(codigos)
    }
}

impl ProcessoRepository for SqliteProcessoRepository<'_> {
    fn inserir(&self, processo: &Processo) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO processos (
                uuid,
                descricao,
                tipo,
                situacao,
                data_criacao,
                data_limite,
                data_finalizacao
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                processo.id.to_string(),
                processo.descricao,
                processo.tipo.as_str(),
                processo.situacao.as_str(),
                processo.data_criacao,
                processo.data_limite,
                processo.data_finalizacao,
            ],
        )?;
        self.gravar_participantes(processo)
    }

    fn buscar(&self, id: ProcessoId) -> RepoResult<Option<Processo>> {
        let sql = format!("{PROCESSO_SELECT_SQL} WHERE uuid = ?1;");
        let found = self
            .conn
            .query_row(&sql, [id.to_string()], |row| Ok(parse_processo_row(row)))
            .optional()?
            .transpose()?;
        match found {
            Some(mut processo) => {
                processo.participantes = self.carregar_participantes(processo.id)?;
                Ok(Some(processo))
            }
            None => Ok(None),
        }
    }

    fn listar(&self) -> RepoResult<Vec<Processo>> {
        let sql = format!("{PROCESSO_SELECT_SQL} ORDER BY data_criacao DESC, uuid ASC;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut processos = Vec::new();
        while let Some(row) = rows.next()? {
            processos.push(parse_processo_row(row)?);
        }
        for processo in &mut processos {
            processo.participantes = self.carregar_participantes(processo.id)?;
        }
        Ok(processos)
    }

    fn atualizar(&self, processo: &Processo) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE processos
             SET descricao = ?2,
                 tipo = ?3,
                 data_limite = ?4
             WHERE uuid = ?1;",
            params![
                processo.id.to_string(),
                processo.descricao,
                processo.tipo.as_str(),
                processo.data_limite,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("processo", processo.id));
        }
        self.gravar_participantes(processo)
    }

    fn excluir(&self, id: ProcessoId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM processos WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("processo", id));
        }
        Ok(())
    }

    fn transicionar(
        &self,
        id: ProcessoId,
        de: SituacaoProcesso,
        para: SituacaoProcesso,
        data_finalizacao: Option<i64>,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE processos
             SET situacao = ?3,
                 data_finalizacao = COALESCE(?4, data_finalizacao)
             WHERE uuid = ?1
               AND situacao = ?2;",
            params![id.to_string(), de.as_str(), para.as_str(), data_finalizacao],
        )?;
        Ok(changed == 1)
    }

    fn unidades_em_andamento(&self, exceto: ProcessoId) -> RepoResult<Vec<CodigoUnidade>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT pp.unidade
             FROM processo_participantes pp
             INNER JOIN processos p ON p.uuid = pp.processo_uuid
             WHERE p.situacao = 'EM_ANDAMENTO'
               AND p.uuid <> ?1
             ORDER BY pp.unidade ASC;",
        )?;
        let mut rows = stmt.query([exceto.to_string()])?;
        let mut codigos = Vec::new();
        while let Some(row) = rows.next()? {
            codigos.push(row.get(0)?);
        }
        Ok(codigos)
    }
}

fn parse_processo_row(row: &Row<'_>) -> RepoResult<Processo> {
    let uuid_raw: String = row.get(0)?;
    let tipo_raw: String = row.get(2)?;
    let situacao_raw: String = row.get(3)?;
    Ok(Processo {
        id: parse_uuid(&uuid_raw, "processos.uuid")?,
        descricao: row.get(1)?,
        tipo: TipoProcesso::parse(&tipo_raw)
            .ok_or_else(|| invalid_code("processos.tipo", &tipo_raw))?,
        situacao: SituacaoProcesso::parse(&situacao_raw)
            .ok_or_else(|| invalid_code("processos.situacao", &situacao_raw))?,
        data_criacao: row.get(4)?,
        data_limite: row.get(5)?,
        data_finalizacao: row.get(6)?,
        participantes: Vec::new(),
    })
}
