//! Loading and guarding of one subprocess inside a unit of work.
//!
//! # Responsibility
//! - Resolve subprocess, process, hierarchy and current location.
//! - Apply guard checks in order: state (409), then role/unit (403).
//! - A repeated acceptance from a tier the subprocess already left is a
//!   state conflict (409), not a unit mismatch.
//! - Persist state changes as compare-and-set.

use crate::model::processo::{Processo, SituacaoProcesso};
use crate::model::registro::{AcaoAnalise, Analise, TipoAnalise};
use crate::model::subprocesso::{Subprocesso, SubprocessoId, SituacaoSubprocesso};
use crate::model::unidade::{CodigoUnidade, UsuarioAtivo};
use crate::repo::processo_repo::ProcessoRepository;
use crate::repo::registro_repo::RegistroRepository;
use crate::repo::subprocesso_repo::SubprocessoRepository;
use crate::repo::unidade_repo::UnidadeRepository;
use crate::repo::{now_epoch_ms, Repositorios};
use crate::workflow::acesso::{autorizar, perfil_permitido, pode_visualizar};
use crate::workflow::error::{WorkflowError, WorkflowResult};
use crate::workflow::hierarquia::Hierarquia;
use crate::workflow::state_machine::{transicao_permitida, Acao};
use uuid::Uuid;

/// Guarded view of a subprocess about to change.
#[derive(Debug)]
pub(crate) struct Contexto {
    pub processo: Processo,
    pub subprocesso: Subprocesso,
    pub hierarquia: Hierarquia,
    /// Unit that currently owns the subprocess.
    pub localizacao: CodigoUnidade,
    /// State the action leads to according to the transition table.
    pub destino: SituacaoSubprocesso,
}

pub(crate) fn carregar(
    repos: &Repositorios<'_>,
    id: SubprocessoId,
) -> WorkflowResult<(Subprocesso, Processo)> {
    let subprocesso = repos
        .subprocessos
        .buscar(id)?
        .ok_or_else(|| WorkflowError::not_found("subprocesso", id))?;
    let processo = repos
        .processos
        .buscar(subprocesso.processo_id)?
        .ok_or_else(|| WorkflowError::not_found("processo", subprocesso.processo_id))?;
    Ok((subprocesso, processo))
}

pub(crate) fn carregar_hierarquia(repos: &Repositorios<'_>) -> WorkflowResult<Hierarquia> {
    Ok(Hierarquia::construir(repos.unidades.listar_unidades()?)?)
}

/// Destination of the latest movement, or the subprocess's own unit.
pub(crate) fn localizacao(
    repos: &Repositorios<'_>,
    subprocesso: &Subprocesso,
) -> WorkflowResult<CodigoUnidade> {
    Ok(repos
        .registros
        .ultima_movimentacao(subprocesso.id)?
        .map(|movimentacao| movimentacao.unidade_destino)
        .unwrap_or(subprocesso.unidade))
}

/// Read-side check: 403 unless `ator` may see the subprocess's unit.
pub(crate) fn exigir_visibilidade(
    repos: &Repositorios<'_>,
    subprocesso: &Subprocesso,
    ator: &UsuarioAtivo,
) -> WorkflowResult<()> {
    let hierarquia = carregar_hierarquia(repos)?;
    if pode_visualizar(ator, subprocesso.unidade, &hierarquia) {
        return Ok(());
    }
    Err(WorkflowError::Forbidden(format!(
        "unit {} cannot see subprocesso of unit {}",
        ator.unidade_ativa, subprocesso.unidade
    )))
}

pub(crate) fn guardar(
    repos: &Repositorios<'_>,
    id: SubprocessoId,
    acao: Acao,
    ator: &UsuarioAtivo,
) -> WorkflowResult<Contexto> {
    let (subprocesso, processo) = carregar(repos, id)?;

    if processo.situacao != SituacaoProcesso::EmAndamento {
        return Err(WorkflowError::StateConflict(format!(
            "{} requires process EM_ANDAMENTO, got {}",
            acao.as_str(),
            processo.situacao.as_str()
        )));
    }
    let destino = transicao_permitida(subprocesso.situacao, acao, processo.tipo).ok_or_else(|| {
        WorkflowError::StateConflict(format!(
            "{} not allowed from {}",
            acao.as_str(),
            subprocesso.situacao.as_str()
        ))
    })?;

    let hierarquia = carregar_hierarquia(repos)?;
    let localizacao = localizacao(repos, &subprocesso)?;
    if matches!(acao, Acao::AceitarCadastro | Acao::AceitarValidacao)
        && perfil_permitido(acao, ator)
        && ja_encaminhado(&hierarquia, &subprocesso, ator.unidade_ativa, localizacao)
    {
        return Err(WorkflowError::StateConflict(format!(
            "{} already forwarded from unit {} to unit {}",
            acao.as_str(),
            ator.unidade_ativa,
            localizacao
        )));
    }
    autorizar(acao, ator, localizacao, hierarquia.raiz()).map_err(WorkflowError::Forbidden)?;

    Ok(Contexto {
        processo,
        subprocesso,
        hierarquia,
        localizacao,
        destino,
    })
}

/// Whether the subprocess climbed past `unidade` on its way up the chain.
fn ja_encaminhado(
    hierarquia: &Hierarquia,
    subprocesso: &Subprocesso,
    unidade: CodigoUnidade,
    localizacao: CodigoUnidade,
) -> bool {
    unidade != localizacao
        && hierarquia.esta_na_subarvore(subprocesso.unidade, unidade)
        && hierarquia.ancestrais(unidade).contains(&localizacao)
}

/// Compare-and-set of the state; a racing writer surfaces as 409.
pub(crate) fn aplicar_situacao(
    repos: &Repositorios<'_>,
    subprocesso: &Subprocesso,
    para: SituacaoSubprocesso,
) -> WorkflowResult<Subprocesso> {
    if !repos
        .subprocessos
        .transicionar(subprocesso.id, subprocesso.situacao, para)?
    {
        return Err(WorkflowError::StateConflict(format!(
            "subprocesso {} changed concurrently",
            subprocesso.id
        )));
    }
    Ok(Subprocesso {
        situacao: para,
        ..subprocesso.clone()
    })
}

pub(crate) fn registrar_analise(
    repos: &Repositorios<'_>,
    ctx: &Contexto,
    ator: &UsuarioAtivo,
    tipo: TipoAnalise,
    acao: AcaoAnalise,
    observacoes: Option<&str>,
) -> WorkflowResult<Analise> {
    let analise = Analise {
        id: Uuid::new_v4(),
        subprocesso_id: ctx.subprocesso.id,
        tipo,
        acao,
        unidade: ctx.localizacao,
        usuario_titulo: ator.titulo.clone(),
        observacoes: observacoes
            .map(str::trim)
            .filter(|texto| !texto.is_empty())
            .map(str::to_string),
        data_hora: now_epoch_ms(),
    };
    repos.registros.inserir_analise(&analise)?;
    Ok(analise)
}

/// Rejects blank free-text input with a 422 naming `campo`.
pub(crate) fn exigir_texto<'a>(valor: &'a str, campo: &str) -> WorkflowResult<&'a str> {
    let texto = valor.trim();
    if texto.is_empty() {
        return Err(WorkflowError::validation_with(
            format!("{campo} must not be blank"),
            campo,
            Vec::new(),
        ));
    }
    Ok(texto)
}
