//! Cadastro and map content editing.
//!
//! # Responsibility
//! - Add and remove activities and knowledge while the cadastro is open.
//! - Create, update and remove competencies while the map is being built.
//! - Apply the automatic state changes these edits trigger.
//!
//! # Invariants
//! - Edits are guarded like workflow actions (state, role, owning unit).
//! - Automatic state changes write no movement and no alert.
//! - Every activity linked to a competency belongs to the same map.

use crate::model::mapa::{
    Atividade, AtividadeId, Competencia, CompetenciaId, Conhecimento, Mapa, MapaConteudo,
};
use crate::model::subprocesso::{SituacaoSubprocesso, Subprocesso, SubprocessoId};
use crate::model::unidade::UsuarioAtivo;
use crate::notify::LogMailer;
use crate::repo::mapa_repo::MapaRepository;
use crate::repo::{ensure_connection_ready, Repositorios};
use crate::workflow::contexto::{
    aplicar_situacao, carregar, exigir_texto, exigir_visibilidade, guardar, Contexto,
};
use crate::workflow::error::{WorkflowError, WorkflowResult};
use crate::workflow::state_machine::Acao;
use crate::workflow::transacao::em_transacao;
use log::info;
use rusqlite::Connection;

/// Content editing over one SQLite connection.
pub struct MapaService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> MapaService<'conn> {
    pub fn try_new(conn: &'conn Connection) -> WorkflowResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    pub fn criar_atividade(
        &self,
        subprocesso_id: SubprocessoId,
        descricao: &str,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Atividade> {
        self.editar("atividade_criar", subprocesso_id, Acao::EditarCadastro, ator, |repos, ctx| {
            let descricao = exigir_texto(descricao, "descricao")?;
            let atividade = repos.mapas.inserir_atividade(ctx.subprocesso.mapa_id, descricao)?;
            avancar(repos, ctx)?;
            Ok(atividade)
        })
    }

    pub fn adicionar_conhecimento(
        &self,
        subprocesso_id: SubprocessoId,
        atividade_id: AtividadeId,
        descricao: &str,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Conhecimento> {
        self.editar("conhecimento_criar", subprocesso_id, Acao::EditarCadastro, ator, |repos, ctx| {
            let descricao = exigir_texto(descricao, "descricao")?;
            atividade_do_mapa(repos, ctx, atividade_id)?;
            let conhecimento = repos.mapas.inserir_conhecimento(atividade_id, descricao)?;
            avancar(repos, ctx)?;
            Ok(conhecimento)
        })
    }

    /// Removes an activity with its knowledge and competency links.
    pub fn remover_atividade(
        &self,
        subprocesso_id: SubprocessoId,
        atividade_id: AtividadeId,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<()> {
        self.editar("atividade_remover", subprocesso_id, Acao::EditarCadastro, ator, |repos, ctx| {
            atividade_do_mapa(repos, ctx, atividade_id)?;
            repos.mapas.excluir_atividade(atividade_id)?;
            Ok(())
        })
    }

    pub fn criar_competencia(
        &self,
        subprocesso_id: SubprocessoId,
        descricao: &str,
        atividades: &[AtividadeId],
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Competencia> {
        self.editar("competencia_criar", subprocesso_id, Acao::EditarMapa, ator, |repos, ctx| {
            let descricao = exigir_texto(descricao, "descricao")?;
            exigir_atividades_do_mapa(repos, ctx, atividades)?;
            let competencia =
                repos
                    .mapas
                    .inserir_competencia(ctx.subprocesso.mapa_id, descricao, atividades)?;
            avancar(repos, ctx)?;
            Ok(competencia)
        })
    }

    pub fn atualizar_competencia(
        &self,
        subprocesso_id: SubprocessoId,
        competencia_id: CompetenciaId,
        descricao: &str,
        atividades: &[AtividadeId],
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Competencia> {
        self.editar("competencia_atualizar", subprocesso_id, Acao::EditarMapa, ator, |repos, ctx| {
            let descricao = exigir_texto(descricao, "descricao")?;
            competencia_do_mapa(repos, ctx, competencia_id)?;
            exigir_atividades_do_mapa(repos, ctx, atividades)?;
            repos
                .mapas
                .atualizar_competencia(competencia_id, descricao, atividades)?;
            avancar(repos, ctx)?;
            Ok(Competencia {
                id: competencia_id,
                mapa_id: ctx.subprocesso.mapa_id,
                descricao: descricao.to_string(),
                atividades: atividades.to_vec(),
            })
        })
    }

    /// Removing the last competency of a fresh map reopens the map stage.
    pub fn remover_competencia(
        &self,
        subprocesso_id: SubprocessoId,
        competencia_id: CompetenciaId,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<()> {
        self.editar("competencia_remover", subprocesso_id, Acao::EditarMapa, ator, |repos, ctx| {
            competencia_do_mapa(repos, ctx, competencia_id)?;
            repos.mapas.excluir_competencia(competencia_id)?;
            let restantes = repos.mapas.contar_competencias(ctx.subprocesso.mapa_id)?;
            if ctx.subprocesso.situacao == SituacaoSubprocesso::MapeamentoMapaCriado && restantes == 0 {
                aplicar_situacao(
                    repos,
                    &ctx.subprocesso,
                    SituacaoSubprocesso::MapeamentoCadastroHomologado,
                )?;
                return Ok(());
            }
            avancar(repos, ctx)?;
            Ok(())
        })
    }

    /// Activities and competencies of the subprocess's map.
    pub fn obter_conteudo(
        &self,
        subprocesso_id: SubprocessoId,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<MapaConteudo> {
        let repos = Repositorios::sobre(self.conn);
        let subprocesso = visivel(&repos, subprocesso_id, ator)?;
        Ok(repos.mapas.carregar_conteudo(subprocesso.mapa_id)?)
    }

    pub fn obter_mapa(&self, subprocesso_id: SubprocessoId, ator: &UsuarioAtivo) -> WorkflowResult<Mapa> {
        let repos = Repositorios::sobre(self.conn);
        let subprocesso = visivel(&repos, subprocesso_id, ator)?;
        repos
            .mapas
            .buscar_mapa(subprocesso.mapa_id)?
            .ok_or_else(|| WorkflowError::not_found("mapa", subprocesso.mapa_id))
    }

    fn editar<T, F>(
        &self,
        operacao: &str,
        subprocesso_id: SubprocessoId,
        acao: Acao,
        ator: &UsuarioAtivo,
        edicao: F,
    ) -> WorkflowResult<T>
    where
        F: FnOnce(&Repositorios<'_>, &Contexto) -> WorkflowResult<T>,
    {
        em_transacao(self.conn, &LogMailer, operacao, |repos| {
            let ctx = guardar(repos, subprocesso_id, acao, ator)?;
            let valor = edicao(repos, &ctx)?;
            info!(
                "event=content_edit module=service status=ok op={operacao} subprocesso={}",
                subprocesso_id
            );
            Ok((valor, Vec::new()))
        })
    }
}

/// Moves the subprocess to the state the edit action leads to, if different.
fn avancar(repos: &Repositorios<'_>, ctx: &Contexto) -> WorkflowResult<()> {
    if ctx.destino != ctx.subprocesso.situacao {
        aplicar_situacao(repos, &ctx.subprocesso, ctx.destino)?;
        info!(
            "event=auto_transition module=service status=ok subprocesso={} from={} to={}",
            ctx.subprocesso.id,
            ctx.subprocesso.situacao.as_str(),
            ctx.destino.as_str()
        );
    }
    Ok(())
}

fn visivel(
    repos: &Repositorios<'_>,
    subprocesso_id: SubprocessoId,
    ator: &UsuarioAtivo,
) -> WorkflowResult<Subprocesso> {
    let (subprocesso, _) = carregar(repos, subprocesso_id)?;
    exigir_visibilidade(repos, &subprocesso, ator)?;
    Ok(subprocesso)
}

fn atividade_do_mapa(
    repos: &Repositorios<'_>,
    ctx: &Contexto,
    atividade_id: AtividadeId,
) -> WorkflowResult<Atividade> {
    repos
        .mapas
        .buscar_atividade(atividade_id)?
        .filter(|atividade| atividade.mapa_id == ctx.subprocesso.mapa_id)
        .ok_or_else(|| WorkflowError::not_found("atividade", atividade_id))
}

fn competencia_do_mapa(
    repos: &Repositorios<'_>,
    ctx: &Contexto,
    competencia_id: CompetenciaId,
) -> WorkflowResult<Competencia> {
    repos
        .mapas
        .buscar_competencia(competencia_id)?
        .filter(|competencia| competencia.mapa_id == ctx.subprocesso.mapa_id)
        .ok_or_else(|| WorkflowError::not_found("competencia", competencia_id))
}

fn exigir_atividades_do_mapa(
    repos: &Repositorios<'_>,
    ctx: &Contexto,
    atividades: &[AtividadeId],
) -> WorkflowResult<()> {
    let mut inexistentes = Vec::new();
    for &atividade_id in atividades {
        let pertence = repos
            .mapas
            .buscar_atividade(atividade_id)?
            .is_some_and(|atividade| atividade.mapa_id == ctx.subprocesso.mapa_id);
        if !pertence {
            inexistentes.push(atividade_id.to_string());
        }
    }
    if inexistentes.is_empty() {
        return Ok(());
    }
    Err(WorkflowError::validation_with(
        "competency links unknown activities",
        "atividadesInexistentes",
        inexistentes,
    ))
}
