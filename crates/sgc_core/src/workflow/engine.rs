//! Subprocess workflow engine.
//!
//! # Responsibility
//! - Expose one operation per business action on a subprocess.
//! - Run each operation as one unit of work: guard, content checks, state
//!   change, stage stamps, analysis record and side effects.
//!
//! # Invariants
//! - Guards run before any write: 404, then 409 (state), then 403
//!   (role/unit), then 422 (content).
//! - Every successful write action except `alterar_data_limite` appends at
//!   least one movement.
//! - Emails leave only after commit.

use crate::config::SgcConfig;
use crate::model::mapa::MapaConteudo;
use crate::model::processo::TipoProcesso;
use crate::model::registro::{AcaoAnalise, Alerta, Analise, Movimentacao, TipoAnalise};
use crate::model::subprocesso::{Etapa, SituacaoSubprocesso, Subprocesso, SubprocessoId};
use crate::model::unidade::{CodigoUnidade, UsuarioAtivo};
use crate::notify::template::{formatar_data, renderizar};
use crate::notify::{LogMailer, Mailer};
use crate::repo::mapa_repo::MapaRepository;
use crate::repo::registro_repo::RegistroRepository;
use crate::repo::subprocesso_repo::SubprocessoRepository;
use crate::repo::unidade_repo::UnidadeRepository;
use crate::repo::{ensure_connection_ready, now_epoch_ms, Repositorios};
use crate::workflow::acesso::pode_verificar_impactos;
use crate::workflow::contexto::{
    aplicar_situacao, carregar, exigir_texto, exigir_visibilidade, guardar, registrar_analise,
    Contexto,
};
use crate::workflow::efeitos::{Efeitos, Passo, TipoTransicao};
use crate::workflow::error::{Detalhes, WorkflowError, WorkflowResult};
use crate::workflow::impacto::{analisar, ImpactoMapa};
use crate::workflow::state_machine::Acao;
use crate::workflow::transacao::em_transacao;
use log::info;
use rusqlite::Connection;

const ALERTA_PRAZO: &str = "Data limite da etapa {{etapa}} alterada para {{prazo}}";
const ASSUNTO_PRAZO: &str = "SGC: Data limite alterada - {{processo}}";

/// Workflow operations over one SQLite connection.
pub struct WorkflowEngine<'conn, M: Mailer = LogMailer> {
    conn: &'conn Connection,
    mailer: M,
    dominio_email: String,
}

impl<'conn, M: Mailer> WorkflowEngine<'conn, M> {
    /// Creates an engine over a migrated connection.
    pub fn try_new(conn: &'conn Connection, mailer: M, config: &SgcConfig) -> WorkflowResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self {
            conn,
            mailer,
            dominio_email: config.email_domain.clone(),
        })
    }

    /// Guarded transition skeleton shared by every write action.
    fn transicionar<F>(
        &self,
        acao: Acao,
        id: SubprocessoId,
        ator: &UsuarioAtivo,
        passo: F,
    ) -> WorkflowResult<Subprocesso>
    where
        F: FnOnce(&Repositorios<'_>, &Contexto, &mut Efeitos<'_>) -> WorkflowResult<Subprocesso>,
    {
        em_transacao(self.conn, &self.mailer, acao.as_str(), |repos| {
            let ctx = guardar(repos, id, acao, ator)?;
            let mut efeitos = Efeitos::new(&ctx.hierarquia, &self.dominio_email);
            let atualizado = passo(repos, &ctx, &mut efeitos)?;
            info!(
                "event=transition module=workflow status=ok acao={} subprocesso={} unidade={} from={} to={}",
                acao.as_str(),
                id,
                ctx.subprocesso.unidade,
                ctx.subprocesso.situacao.as_str(),
                atualizado.situacao.as_str()
            );
            Ok((atualizado, efeitos.into_emails()))
        })
    }

    /// Submits the cadastro to the parent unit.
    pub fn disponibilizar_cadastro(
        &self,
        id: SubprocessoId,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Subprocesso> {
        self.transicionar(Acao::DisponibilizarCadastro, id, ator, |repos, ctx, efeitos| {
            let sub = &ctx.subprocesso;
            let conteudo = repos.mapas.carregar_conteudo(sub.mapa_id)?;
            if conteudo.atividades.is_empty() {
                return Err(WorkflowError::validation(
                    "cadastro must have at least one activity",
                ));
            }
            let sem_conhecimento = conteudo.atividades_sem_conhecimento();
            if !sem_conhecimento.is_empty() {
                return Err(WorkflowError::validation_with(
                    "every activity needs at least one knowledge item",
                    "atividadesSemConhecimento",
                    sem_conhecimento,
                ));
            }
            let pai = ctx.hierarquia.pai(sub.unidade).ok_or_else(|| {
                WorkflowError::StateConflict(format!("unit {} has no parent unit", sub.unidade))
            })?;

            let mut atualizado = Subprocesso {
                data_fim_etapa1: Some(now_epoch_ms()),
                ..sub.clone()
            };
            repos.subprocessos.salvar_prazos(&atualizado)?;
            repos.registros.excluir_analises(sub.id)?;
            atualizado = aplicar_situacao(repos, &atualizado, ctx.destino)?;

            let tipo = match ctx.processo.tipo {
                TipoProcesso::Revisao => TipoTransicao::RevisaoCadastroDisponibilizada,
                _ => TipoTransicao::CadastroDisponibilizado,
            };
            efeitos.movimentar(
                repos,
                &ctx.processo,
                &atualizado,
                ator,
                Passo::new(tipo, Some(sub.unidade), pai),
            )?;
            Ok(atualizado)
        })
    }

    /// Returns the cadastro to the unit for adjustments.
    pub fn devolver_cadastro(
        &self,
        id: SubprocessoId,
        justificativa: &str,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Subprocesso> {
        self.transicionar(Acao::DevolverCadastro, id, ator, |repos, ctx, efeitos| {
            let justificativa = exigir_texto(justificativa, "justificativa")?;
            let sub = &ctx.subprocesso;
            registrar_analise(
                repos,
                ctx,
                ator,
                TipoAnalise::Cadastro,
                AcaoAnalise::Devolucao,
                Some(justificativa),
            )?;

            let mut atualizado = Subprocesso {
                data_fim_etapa1: None,
                ..sub.clone()
            };
            repos.subprocessos.salvar_prazos(&atualizado)?;
            atualizado = aplicar_situacao(repos, &atualizado, ctx.destino)?;

            let tipo = match ctx.processo.tipo {
                TipoProcesso::Revisao => TipoTransicao::RevisaoCadastroDevolvida,
                _ => TipoTransicao::CadastroDevolvido,
            };
            efeitos.movimentar(
                repos,
                &ctx.processo,
                &atualizado,
                ator,
                Passo::new(tipo, Some(ctx.localizacao), sub.unidade).com_observacoes(justificativa),
            )?;
            Ok(atualizado)
        })
    }

    /// Accepts the cadastro at the current tier and forwards it upwards.
    pub fn aceitar_cadastro(
        &self,
        id: SubprocessoId,
        observacoes: Option<&str>,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Subprocesso> {
        self.transicionar(Acao::AceitarCadastro, id, ator, |repos, ctx, efeitos| {
            let pai = ctx.hierarquia.pai(ctx.localizacao).ok_or_else(|| {
                WorkflowError::StateConflict(format!(
                    "unit {} has no parent unit to forward to",
                    ctx.localizacao
                ))
            })?;
            registrar_analise(
                repos,
                ctx,
                ator,
                TipoAnalise::Cadastro,
                AcaoAnalise::Aceite,
                observacoes,
            )?;
            let atualizado = aplicar_situacao(repos, &ctx.subprocesso, ctx.destino)?;

            let tipo = match ctx.processo.tipo {
                TipoProcesso::Revisao => TipoTransicao::RevisaoCadastroAceita,
                _ => TipoTransicao::CadastroAceito,
            };
            efeitos.movimentar(
                repos,
                &ctx.processo,
                &atualizado,
                ator,
                Passo::new(tipo, Some(ctx.localizacao), pai),
            )?;
            Ok(atualizado)
        })
    }

    /// Homologates the cadastro. Revisions branch on impact analysis.
    pub fn homologar_cadastro(
        &self,
        id: SubprocessoId,
        observacoes: Option<&str>,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Subprocesso> {
        self.transicionar(Acao::HomologarCadastro, id, ator, |repos, ctx, efeitos| {
            let sub = &ctx.subprocesso;
            let raiz = ctx.hierarquia.raiz();
            registrar_analise(
                repos,
                ctx,
                ator,
                TipoAnalise::Cadastro,
                AcaoAnalise::Homologacao,
                observacoes,
            )?;

            if ctx.processo.tipo != TipoProcesso::Revisao {
                let atualizado = aplicar_situacao(repos, sub, ctx.destino)?;
                efeitos.movimentar(
                    repos,
                    &ctx.processo,
                    &atualizado,
                    ator,
                    Passo::new(TipoTransicao::CadastroHomologado, Some(raiz), raiz),
                )?;
                return Ok(atualizado);
            }

            let impacto = impacto_do_subprocesso(repos, sub)?;
            let para = if impacto.tem_impactos {
                ctx.destino
            } else {
                SituacaoSubprocesso::RevisaoMapaHomologado
            };
            let atualizado = aplicar_situacao(repos, sub, para)?;
            efeitos.movimentar(
                repos,
                &ctx.processo,
                &atualizado,
                ator,
                Passo::new(TipoTransicao::RevisaoCadastroHomologada, Some(raiz), raiz),
            )?;
            if impacto.tem_impactos {
                efeitos.movimentar(
                    repos,
                    &ctx.processo,
                    &atualizado,
                    ator,
                    Passo::new(TipoTransicao::ImpactoMapaIdentificado, Some(raiz), raiz),
                )?;
            }
            Ok(atualizado)
        })
    }

    /// Confirms the adjusted map of a revision.
    pub fn ajustar_mapa(&self, id: SubprocessoId, ator: &UsuarioAtivo) -> WorkflowResult<Subprocesso> {
        self.transicionar(Acao::AjustarMapa, id, ator, |repos, ctx, efeitos| {
            let conteudo = repos.mapas.carregar_conteudo(ctx.subprocesso.mapa_id)?;
            validar_associacoes(&conteudo)?;
            let raiz = ctx.hierarquia.raiz();
            let atualizado = aplicar_situacao(repos, &ctx.subprocesso, ctx.destino)?;
            efeitos.movimentar(
                repos,
                &ctx.processo,
                &atualizado,
                ator,
                Passo::new(TipoTransicao::MapaAjustado, Some(raiz), raiz),
            )?;
            Ok(atualizado)
        })
    }

    /// Sends the map to the unit for validation with a stage-2 deadline.
    pub fn disponibilizar_mapa(
        &self,
        id: SubprocessoId,
        data_limite: Option<i64>,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Subprocesso> {
        self.transicionar(Acao::DisponibilizarMapa, id, ator, |repos, ctx, efeitos| {
            let data_limite = data_limite.ok_or_else(|| {
                WorkflowError::validation_with("map deadline is required", "dataLimite", Vec::new())
            })?;
            let sub = &ctx.subprocesso;
            let conteudo = repos.mapas.carregar_conteudo(sub.mapa_id)?;
            validar_associacoes(&conteudo)?;

            repos.mapas.definir_sugestoes(sub.mapa_id, None)?;
            repos.registros.excluir_analises(sub.id)?;
            let mut atualizado = Subprocesso {
                data_limite_etapa2: Some(data_limite),
                data_fim_etapa2: None,
                ..sub.clone()
            };
            repos.subprocessos.salvar_prazos(&atualizado)?;
            atualizado = aplicar_situacao(repos, &atualizado, ctx.destino)?;

            efeitos.movimentar(
                repos,
                &ctx.processo,
                &atualizado,
                ator,
                Passo::new(TipoTransicao::MapaDisponibilizado, Some(ctx.localizacao), sub.unidade),
            )?;
            Ok(atualizado)
        })
    }

    /// Records the unit's suggestions and sends the map upwards.
    pub fn apresentar_sugestoes(
        &self,
        id: SubprocessoId,
        sugestoes: &str,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Subprocesso> {
        self.transicionar(Acao::ApresentarSugestoes, id, ator, |repos, ctx, efeitos| {
            let sugestoes = exigir_texto(sugestoes, "sugestoes")?;
            repos
                .mapas
                .definir_sugestoes(ctx.subprocesso.mapa_id, Some(sugestoes))?;
            self.concluir_validacao(repos, ctx, efeitos, ator, TipoTransicao::SugestoesApresentadas)
        })
    }

    /// Validates the map without suggestions and sends it upwards.
    pub fn validar_mapa(&self, id: SubprocessoId, ator: &UsuarioAtivo) -> WorkflowResult<Subprocesso> {
        self.transicionar(Acao::ValidarMapa, id, ator, |repos, ctx, efeitos| {
            self.concluir_validacao(repos, ctx, efeitos, ator, TipoTransicao::MapaValidado)
        })
    }

    fn concluir_validacao(
        &self,
        repos: &Repositorios<'_>,
        ctx: &Contexto,
        efeitos: &mut Efeitos<'_>,
        ator: &UsuarioAtivo,
        tipo: TipoTransicao,
    ) -> WorkflowResult<Subprocesso> {
        let sub = &ctx.subprocesso;
        let pai = ctx.hierarquia.pai(sub.unidade).ok_or_else(|| {
            WorkflowError::StateConflict(format!("unit {} has no parent unit", sub.unidade))
        })?;
        let mut atualizado = Subprocesso {
            data_fim_etapa2: Some(now_epoch_ms()),
            ..sub.clone()
        };
        repos.subprocessos.salvar_prazos(&atualizado)?;
        atualizado = aplicar_situacao(repos, &atualizado, ctx.destino)?;
        efeitos.movimentar(
            repos,
            &ctx.processo,
            &atualizado,
            ator,
            Passo::new(tipo, Some(sub.unidade), pai),
        )?;
        Ok(atualizado)
    }

    /// Returns the validation to the unit.
    pub fn devolver_validacao(
        &self,
        id: SubprocessoId,
        justificativa: &str,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Subprocesso> {
        self.transicionar(Acao::DevolverValidacao, id, ator, |repos, ctx, efeitos| {
            let justificativa = exigir_texto(justificativa, "justificativa")?;
            let sub = &ctx.subprocesso;
            registrar_analise(
                repos,
                ctx,
                ator,
                TipoAnalise::Validacao,
                AcaoAnalise::Devolucao,
                Some(justificativa),
            )?;
            let mut atualizado = Subprocesso {
                data_fim_etapa2: None,
                ..sub.clone()
            };
            repos.subprocessos.salvar_prazos(&atualizado)?;
            atualizado = aplicar_situacao(repos, &atualizado, ctx.destino)?;
            efeitos.movimentar(
                repos,
                &ctx.processo,
                &atualizado,
                ator,
                Passo::new(TipoTransicao::ValidacaoDevolvida, Some(ctx.localizacao), sub.unidade)
                    .com_observacoes(justificativa),
            )?;
            Ok(atualizado)
        })
    }

    /// Accepts the validation at the current tier; at the top tier this
    /// homologates the map.
    pub fn aceitar_validacao(
        &self,
        id: SubprocessoId,
        observacoes: Option<&str>,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Subprocesso> {
        self.transicionar(Acao::AceitarValidacao, id, ator, |repos, ctx, efeitos| {
            registrar_analise(
                repos,
                ctx,
                ator,
                TipoAnalise::Validacao,
                AcaoAnalise::Aceite,
                observacoes,
            )?;
            let (para, passo) = match ctx.hierarquia.pai(ctx.localizacao) {
                Some(pai) => (
                    ctx.destino,
                    Passo::new(TipoTransicao::ValidacaoAceita, Some(ctx.localizacao), pai),
                ),
                None => (
                    homologado(ctx)?,
                    Passo::new(
                        TipoTransicao::MapaHomologado,
                        Some(ctx.localizacao),
                        ctx.localizacao,
                    ),
                ),
            };
            let atualizado = aplicar_situacao(repos, &ctx.subprocesso, para)?;
            efeitos.movimentar(repos, &ctx.processo, &atualizado, ator, passo)?;
            Ok(atualizado)
        })
    }

    /// Homologates the validated map.
    pub fn homologar_validacao(
        &self,
        id: SubprocessoId,
        observacoes: Option<&str>,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Subprocesso> {
        self.transicionar(Acao::HomologarValidacao, id, ator, |repos, ctx, efeitos| {
            registrar_analise(
                repos,
                ctx,
                ator,
                TipoAnalise::Validacao,
                AcaoAnalise::Homologacao,
                observacoes,
            )?;
            let raiz = ctx.hierarquia.raiz();
            let atualizado = aplicar_situacao(repos, &ctx.subprocesso, ctx.destino)?;
            efeitos.movimentar(
                repos,
                &ctx.processo,
                &atualizado,
                ator,
                Passo::new(TipoTransicao::MapaHomologado, Some(raiz), raiz),
            )?;
            Ok(atualizado)
        })
    }

    /// Reopens the cadastro of a MAPEAMENTO subprocess.
    pub fn reabrir_cadastro(
        &self,
        id: SubprocessoId,
        justificativa: &str,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Subprocesso> {
        self.reabrir(id, justificativa, ator, Acao::ReabrirCadastro, TipoProcesso::Mapeamento)
    }

    /// Reopens the cadastro of a REVISAO subprocess.
    pub fn reabrir_revisao_cadastro(
        &self,
        id: SubprocessoId,
        justificativa: &str,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Subprocesso> {
        self.reabrir(
            id,
            justificativa,
            ator,
            Acao::ReabrirRevisaoCadastro,
            TipoProcesso::Revisao,
        )
    }

    fn reabrir(
        &self,
        id: SubprocessoId,
        justificativa: &str,
        ator: &UsuarioAtivo,
        acao: Acao,
        tipo_esperado: TipoProcesso,
    ) -> WorkflowResult<Subprocesso> {
        let tipo_atual = carregar(&Repositorios::sobre(self.conn), id)?.1.tipo;
        if tipo_atual != tipo_esperado {
            return Err(WorkflowError::validation(format!(
                "{} only applies to {} processes, got {}",
                acao.as_str(),
                tipo_esperado.as_str(),
                tipo_atual.as_str()
            )));
        }

        self.transicionar(acao, id, ator, |repos, ctx, efeitos| {
            let justificativa = exigir_texto(justificativa, "justificativa")?;
            let sub = &ctx.subprocesso;
            let mut atualizado = Subprocesso {
                data_fim_etapa1: None,
                ..sub.clone()
            };
            repos.subprocessos.salvar_prazos(&atualizado)?;
            atualizado = aplicar_situacao(repos, &atualizado, ctx.destino)?;

            let tipo = match tipo_esperado {
                TipoProcesso::Revisao => TipoTransicao::RevisaoCadastroReaberta,
                _ => TipoTransicao::CadastroReaberto,
            };
            let raiz = ctx.hierarquia.raiz();
            efeitos.movimentar(
                repos,
                &ctx.processo,
                &atualizado,
                ator,
                Passo::new(tipo, Some(raiz), sub.unidade).com_observacoes(justificativa),
            )?;
            Ok(atualizado)
        })
    }

    /// Changes the deadline of the current stage. Alerts the unit, no movement.
    pub fn alterar_data_limite(
        &self,
        id: SubprocessoId,
        nova_data: i64,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Subprocesso> {
        self.transicionar(Acao::AlterarDataLimite, id, ator, |repos, ctx, efeitos| {
            let sub = &ctx.subprocesso;
            let em_cadastro = matches!(
                sub.situacao.etapa(),
                None | Some((
                    _,
                    Etapa::CadastroEmAndamento | Etapa::CadastroDisponibilizado
                ))
            );
            let (atualizado, etapa) = if em_cadastro {
                (
                    Subprocesso {
                        data_limite_etapa1: nova_data,
                        ..sub.clone()
                    },
                    "1",
                )
            } else {
                (
                    Subprocesso {
                        data_limite_etapa2: Some(nova_data),
                        ..sub.clone()
                    },
                    "2",
                )
            };
            repos.subprocessos.salvar_prazos(&atualizado)?;

            let prazo = formatar_data(nova_data);
            let texto = renderizar(ALERTA_PRAZO, &[("etapa", etapa), ("prazo", prazo.as_str())]);
            let raiz = ctx.hierarquia.raiz();
            efeitos.alertar(repos, ctx.processo.id, Some(raiz), sub.unidade, &texto)?;
            let assunto = renderizar(ASSUNTO_PRAZO, &[("processo", ctx.processo.descricao.as_str())]);
            efeitos.notificar_unidade(sub.unidade, &assunto, &texto, &ctx.processo.descricao);
            Ok(atualizado)
        })
    }

    /// Loads a subprocess visible to `ator`.
    pub fn obter_subprocesso(
        &self,
        id: SubprocessoId,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Subprocesso> {
        let repos = Repositorios::sobre(self.conn);
        let (subprocesso, _) = carregar(&repos, id)?;
        exigir_visibilidade(&repos, &subprocesso, ator)?;
        Ok(subprocesso)
    }

    /// Movement history, newest first.
    pub fn listar_movimentacoes(
        &self,
        id: SubprocessoId,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Vec<Movimentacao>> {
        let subprocesso = self.obter_subprocesso(id, ator)?;
        let repos = Repositorios::sobre(self.conn);
        Ok(repos.registros.listar_movimentacoes(subprocesso.id)?)
    }

    /// Cadastro analyses, newest first.
    pub fn historico_cadastro(
        &self,
        id: SubprocessoId,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Vec<Analise>> {
        self.historico(id, TipoAnalise::Cadastro, ator)
    }

    /// Validation analyses, newest first.
    pub fn historico_validacao(
        &self,
        id: SubprocessoId,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Vec<Analise>> {
        self.historico(id, TipoAnalise::Validacao, ator)
    }

    fn historico(
        &self,
        id: SubprocessoId,
        tipo: TipoAnalise,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Vec<Analise>> {
        let subprocesso = self.obter_subprocesso(id, ator)?;
        let repos = Repositorios::sobre(self.conn);
        Ok(repos.registros.listar_analises(subprocesso.id, tipo)?)
    }

    /// Impact projection of a revision subprocess.
    pub fn obter_impactos(
        &self,
        id: SubprocessoId,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<ImpactoMapa> {
        let repos = Repositorios::sobre(self.conn);
        let (subprocesso, processo) = carregar(&repos, id)?;
        exigir_visibilidade(&repos, &subprocesso, ator)?;
        if !pode_verificar_impactos(ator, processo.tipo, subprocesso.situacao) {
            return Err(WorkflowError::Forbidden(format!(
                "profile {} cannot check impacts in {}",
                ator.perfil.as_str(),
                subprocesso.situacao.as_str()
            )));
        }
        impacto_do_subprocesso(&repos, &subprocesso)
    }

    /// Alerts addressed to the actor's active unit, newest first.
    pub fn listar_alertas(&self, ator: &UsuarioAtivo) -> WorkflowResult<Vec<Alerta>> {
        let repos = Repositorios::sobre(self.conn);
        Ok(repos.registros.listar_alertas_unidade(ator.unidade_ativa)?)
    }

    /// Resolves each unit's subprocess in the same process as `contexto`.
    pub(crate) fn resolver_alvos(
        &self,
        contexto: SubprocessoId,
        unidades: &[CodigoUnidade],
    ) -> WorkflowResult<Vec<(CodigoUnidade, Option<SubprocessoId>)>> {
        let repos = Repositorios::sobre(self.conn);
        let (referencia, _) = carregar(&repos, contexto)?;
        unidades
            .iter()
            .map(|&unidade| -> WorkflowResult<_> {
                let alvo = repos
                    .subprocessos
                    .buscar_por_unidade(referencia.processo_id, unidade)?
                    .map(|subprocesso| subprocesso.id);
                Ok((unidade, alvo))
            })
            .collect()
    }
}

fn homologado(ctx: &Contexto) -> WorkflowResult<SituacaoSubprocesso> {
    SituacaoSubprocesso::de(ctx.processo.tipo, Etapa::MapaHomologado).ok_or_else(|| {
        WorkflowError::StateConflict(format!(
            "process type {} has no homologated state",
            ctx.processo.tipo.as_str()
        ))
    })
}

fn validar_associacoes(conteudo: &MapaConteudo) -> WorkflowResult<()> {
    let mut details = Detalhes::new();
    let atividades = conteudo.atividades_sem_competencia();
    if !atividades.is_empty() {
        details.insert("atividadesSemCompetencia".to_string(), atividades);
    }
    let competencias = conteudo.competencias_sem_atividade();
    if !competencias.is_empty() {
        details.insert("competenciasSemAtividade".to_string(), competencias);
    }
    if details.is_empty() {
        return Ok(());
    }
    Err(WorkflowError::Validation {
        message: "every activity and competency must be associated".to_string(),
        details,
    })
}

/// Impact of the working map against the unit's vigente map.
pub(crate) fn impacto_do_subprocesso(
    repos: &Repositorios<'_>,
    subprocesso: &Subprocesso,
) -> WorkflowResult<ImpactoMapa> {
    let atual = repos.mapas.carregar_conteudo(subprocesso.mapa_id)?;
    let vigente = match repos.unidades.mapa_vigente(subprocesso.unidade)? {
        Some(mapa_id) if mapa_id != subprocesso.mapa_id => {
            Some(repos.mapas.carregar_conteudo(mapa_id)?)
        }
        _ => None,
    };
    Ok(analisar(vigente.as_ref(), &atual))
}
