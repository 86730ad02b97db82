//! Competency map repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist maps, activities, knowledge items, competencies and their links.
//! - Load a full map snapshot (`MapaConteudo`) in a fixed number of queries.
//! - Deep-copy a map for revision processes.
//!
//! # Invariants
//! - Content order is insertion order (`rowid ASC`).
//! - Deleting an activity or competency removes its links (FK cascade).

use super::{ensure_connection_ready, now_epoch_ms, parse_uuid, RepoError, RepoResult};
use crate::model::mapa::{
    Atividade, AtividadeId, Competencia, CompetenciaId, Conhecimento, Mapa, MapaConteudo, MapaId,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use uuid::Uuid;

pub trait MapaRepository {
    fn criar_mapa(&self) -> RepoResult<Mapa>;
    fn buscar_mapa(&self, id: MapaId) -> RepoResult<Option<Mapa>>;
    fn carregar_conteudo(&self, id: MapaId) -> RepoResult<MapaConteudo>;
    fn definir_sugestoes(&self, id: MapaId, sugestoes: Option<&str>) -> RepoResult<()>;
    fn inserir_atividade(&self, mapa_id: MapaId, descricao: &str) -> RepoResult<Atividade>;
    fn buscar_atividade(&self, id: AtividadeId) -> RepoResult<Option<Atividade>>;
    fn excluir_atividade(&self, id: AtividadeId) -> RepoResult<()>;
    fn inserir_conhecimento(
        &self,
        atividade_id: AtividadeId,
        descricao: &str,
    ) -> RepoResult<Conhecimento>;
    fn inserir_competencia(
        &self,
        mapa_id: MapaId,
        descricao: &str,
        atividades: &[AtividadeId],
    ) -> RepoResult<Competencia>;
    fn buscar_competencia(&self, id: CompetenciaId) -> RepoResult<Option<Competencia>>;
    /// Replaces description and the full link set.
    fn atualizar_competencia(
        &self,
        id: CompetenciaId,
        descricao: &str,
        atividades: &[AtividadeId],
    ) -> RepoResult<()>;
    fn excluir_competencia(&self, id: CompetenciaId) -> RepoResult<()>;
    fn contar_competencias(&self, mapa_id: MapaId) -> RepoResult<usize>;
    /// Creates a new map with a copy of every activity, knowledge item,
    /// competency and link of `origem`.
    fn copiar_mapa(&self, origem: MapaId) -> RepoResult<Mapa>;
}

/// SQLite-backed map repository.
pub struct SqliteMapaRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> SqliteMapaRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn gravar_vinculos(&self, competencia_id: CompetenciaId, atividades: &[AtividadeId]) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM competencia_atividades WHERE competencia_uuid = ?1;",
            [competencia_id.to_string()],
        )?;
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO competencia_atividades (competencia_uuid, atividade_uuid)
             VALUES (?1, ?2);",
        )?;
        for atividade_id in atividades {
            stmt.execute(params![competencia_id.to_string(), atividade_id.to_string()])?;
        }
        Ok(())
    }
}

impl MapaRepository for SqliteMapaRepository<'_> {
    fn criar_mapa(&self) -> RepoResult<Mapa> {
        let mapa = Mapa {
            id: Uuid::new_v4(),
            sugestoes: None,
            created_at: now_epoch_ms(),
        };
        self.conn.execute(
            "INSERT INTO mapas (uuid, sugestoes, created_at) VALUES (?1, NULL, ?2);",
            params![mapa.id.to_string(), mapa.created_at],
        )?;
        Ok(mapa)
    }

    fn buscar_mapa(&self, id: MapaId) -> RepoResult<Option<Mapa>> {
        let found = self
            .conn
            .query_row(
                "SELECT sugestoes, created_at FROM mapas WHERE uuid = ?1;",
                [id.to_string()],
                |row| {
                    Ok(Mapa {
                        id,
                        sugestoes: row.get(0)?,
                        created_at: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }

    fn carregar_conteudo(&self, id: MapaId) -> RepoResult<MapaConteudo> {
        let mapa_key = id.to_string();

        let mut atividades = Vec::new();
        let mut stmt = self.conn.prepare(
            "SELECT uuid, descricao
             FROM atividades
             WHERE mapa_uuid = ?1
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([&mapa_key])?;
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            atividades.push(Atividade {
                id: parse_uuid(&raw, "atividades.uuid")?,
                mapa_id: id,
                descricao: row.get(1)?,
                conhecimentos: Vec::new(),
            });
        }

        let index: HashMap<AtividadeId, usize> = atividades
            .iter()
            .enumerate()
            .map(|(position, atividade)| (atividade.id, position))
            .collect();

        let mut stmt = self.conn.prepare(
            "SELECT c.uuid, c.atividade_uuid, c.descricao
             FROM conhecimentos c
             INNER JOIN atividades a ON a.uuid = c.atividade_uuid
             WHERE a.mapa_uuid = ?1
             ORDER BY c.rowid ASC;",
        )?;
        let mut rows = stmt.query([&mapa_key])?;
        while let Some(row) = rows.next()? {
            let raw_id: String = row.get(0)?;
            let raw_atividade: String = row.get(1)?;
            let atividade_id = parse_uuid(&raw_atividade, "conhecimentos.atividade_uuid")?;
            let conhecimento = Conhecimento {
                id: parse_uuid(&raw_id, "conhecimentos.uuid")?,
                atividade_id,
                descricao: row.get(2)?,
            };
            if let Some(position) = index.get(&atividade_id) {
                atividades[*position].conhecimentos.push(conhecimento);
            }
        }

        let mut competencias = Vec::new();
        let mut stmt = self.conn.prepare(
            "SELECT uuid, descricao
             FROM competencias
             WHERE mapa_uuid = ?1
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([&mapa_key])?;
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            competencias.push(Competencia {
                id: parse_uuid(&raw, "competencias.uuid")?,
                mapa_id: id,
                descricao: row.get(1)?,
                atividades: Vec::new(),
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT ca.competencia_uuid, ca.atividade_uuid
             FROM competencia_atividades ca
             INNER JOIN competencias c ON c.uuid = ca.competencia_uuid
             WHERE c.mapa_uuid = ?1
             ORDER BY ca.rowid ASC;",
        )?;
        let mut rows = stmt.query([&mapa_key])?;
        while let Some(row) = rows.next()? {
            let raw_competencia: String = row.get(0)?;
            let raw_atividade: String = row.get(1)?;
            let competencia_id =
                parse_uuid(&raw_competencia, "competencia_atividades.competencia_uuid")?;
            let atividade_id = parse_uuid(&raw_atividade, "competencia_atividades.atividade_uuid")?;
            if let Some(competencia) = competencias
                .iter_mut()
                .find(|competencia| competencia.id == competencia_id)
            {
                competencia.atividades.push(atividade_id);
            }
        }

        Ok(MapaConteudo {
            atividades,
            competencias,
        })
    }

    fn definir_sugestoes(&self, id: MapaId, sugestoes: Option<&str>) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE mapas SET sugestoes = ?2 WHERE uuid = ?1;",
            params![id.to_string(), sugestoes],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("mapa", id));
        }
        Ok(())
    }

    fn inserir_atividade(&self, mapa_id: MapaId, descricao: &str) -> RepoResult<Atividade> {
        let atividade = Atividade {
            id: Uuid::new_v4(),
            mapa_id,
            descricao: descricao.to_string(),
            conhecimentos: Vec::new(),
        };
        self.conn.execute(
            "INSERT INTO atividades (uuid, mapa_uuid, descricao) VALUES (?1, ?2, ?3);",
            params![atividade.id.to_string(), mapa_id.to_string(), descricao],
        )?;
        Ok(atividade)
    }

    fn buscar_atividade(&self, id: AtividadeId) -> RepoResult<Option<Atividade>> {
        let header = self
            .conn
            .query_row(
                "SELECT mapa_uuid, descricao FROM atividades WHERE uuid = ?1;",
                [id.to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((mapa_raw, descricao)) = header else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT uuid, descricao
             FROM conhecimentos
             WHERE atividade_uuid = ?1
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut conhecimentos = Vec::new();
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            conhecimentos.push(Conhecimento {
                id: parse_uuid(&raw, "conhecimentos.uuid")?,
                atividade_id: id,
                descricao: row.get(1)?,
            });
        }

        Ok(Some(Atividade {
            id,
            mapa_id: parse_uuid(&mapa_raw, "atividades.mapa_uuid")?,
            descricao,
            conhecimentos,
        }))
    }

    fn excluir_atividade(&self, id: AtividadeId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM atividades WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("atividade", id));
        }
        Ok(())
    }

    fn inserir_conhecimento(
        &self,
        atividade_id: AtividadeId,
        descricao: &str,
    ) -> RepoResult<Conhecimento> {
        let conhecimento = Conhecimento {
            id: Uuid::new_v4(),
            atividade_id,
            descricao: descricao.to_string(),
        };
        self.conn.execute(
            "INSERT INTO conhecimentos (uuid, atividade_uuid, descricao) VALUES (?1, ?2, ?3);",
            params![
                conhecimento.id.to_string(),
                atividade_id.to_string(),
                descricao
            ],
        )?;
        Ok(conhecimento)
    }

    fn inserir_competencia(
        &self,
        mapa_id: MapaId,
        descricao: &str,
        atividades: &[AtividadeId],
    ) -> RepoResult<Competencia> {
        let competencia = Competencia {
            id: Uuid::new_v4(),
            mapa_id,
            descricao: descricao.to_string(),
            atividades: atividades.to_vec(),
        };
        self.conn.execute(
            "INSERT INTO competencias (uuid, mapa_uuid, descricao) VALUES (?1, ?2, ?3);",
            params![competencia.id.to_string(), mapa_id.to_string(), descricao],
        )?;
        self.gravar_vinculos(competencia.id, atividades)?;
        Ok(competencia)
    }

    fn buscar_competencia(&self, id: CompetenciaId) -> RepoResult<Option<Competencia>> {
        let header = self
            .conn
            .query_row(
                "SELECT mapa_uuid, descricao FROM competencias WHERE uuid = ?1;",
                [id.to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((mapa_raw, descricao)) = header else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT atividade_uuid
             FROM competencia_atividades
             WHERE competencia_uuid = ?1
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut atividades = Vec::new();
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            atividades.push(parse_uuid(&raw, "competencia_atividades.atividade_uuid")?);
        }

        Ok(Some(Competencia {
            id,
            mapa_id: parse_uuid(&mapa_raw, "competencias.mapa_uuid")?,
            descricao,
            atividades,
        }))
    }

    fn atualizar_competencia(
        &self,
        id: CompetenciaId,
        descricao: &str,
        atividades: &[AtividadeId],
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE competencias SET descricao = ?2 WHERE uuid = ?1;",
            params![id.to_string(), descricao],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("competencia", id));
        }
        self.gravar_vinculos(id, atividades)
    }

    fn excluir_competencia(&self, id: CompetenciaId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM competencias WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("competencia", id));
        }
        Ok(())
    }

    fn contar_competencias(&self, mapa_id: MapaId) -> RepoResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM competencias WHERE mapa_uuid = ?1;",
            [mapa_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn copiar_mapa(&self, origem: MapaId) -> RepoResult<Mapa> {
        if self.buscar_mapa(origem)?.is_none() {
            return Err(RepoError::not_found("mapa", origem));
        }
        let conteudo = self.carregar_conteudo(origem)?;
        let copia = self.criar_mapa()?;

        let mut novos_ids: HashMap<AtividadeId, AtividadeId> = HashMap::new();
        for atividade in &conteudo.atividades {
            let nova = self.inserir_atividade(copia.id, &atividade.descricao)?;
            for conhecimento in &atividade.conhecimentos {
                self.inserir_conhecimento(nova.id, &conhecimento.descricao)?;
            }
            novos_ids.insert(atividade.id, nova.id);
        }
        for competencia in &conteudo.competencias {
            let vinculos: Vec<AtividadeId> = competencia
                .atividades
                .iter()
                .filter_map(|id| novos_ids.get(id).copied())
                .collect();
            self.inserir_competencia(copia.id, &competencia.descricao, &vinculos)?;
        }
        Ok(copia)
    }
}
