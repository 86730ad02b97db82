//! Process lifecycle service.
//!
//! # Responsibility
//! - Create, update and delete processes while they are CRIADO.
//! - Start a process (fan-out of one subprocess and map per unit) and
//!   finalize it (fan-in, vigente map promotion).
//! - Send deadline reminders and list processes by hierarchy scope.
//!
//! # Invariants
//! - Only ADMIN writes processes.
//! - Participants are sorted, deduplicated and frozen once the process starts.
//! - Finalization is all-or-nothing: any non-terminal subprocess aborts it
//!   before a single write.

use crate::config::SgcConfig;
use crate::model::processo::{Processo, ProcessoId, SituacaoProcesso, TipoProcesso};
use crate::model::registro::Alerta;
use crate::model::subprocesso::{SituacaoSubprocesso, Subprocesso};
use crate::model::unidade::{CodigoUnidade, UsuarioAtivo};
use crate::notify::template::{formatar_data, renderizar};
use crate::notify::{caixa_da_unidade, Email, LogMailer, Mailer};
use crate::repo::mapa_repo::MapaRepository;
use crate::repo::processo_repo::ProcessoRepository;
use crate::repo::subprocesso_repo::SubprocessoRepository;
use crate::repo::unidade_repo::UnidadeRepository;
use crate::repo::{ensure_connection_ready, now_epoch_ms, Repositorios};
use crate::workflow::acesso::pode_visualizar;
use crate::workflow::contexto::{carregar_hierarquia, exigir_texto};
use crate::workflow::efeitos::{Efeitos, Passo, TipoTransicao};
use crate::workflow::error::{Detalhes, WorkflowError, WorkflowResult};
use crate::workflow::hierarquia::Hierarquia;
use crate::workflow::transacao::em_transacao;
use log::info;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

const ALERTA_SUBORDINADAS: &str = "Início do processo em unidades subordinadas";
const ASSUNTO_INICIO_SUBORDINADAS: &str = "SGC: Início do processo {{processo}} em unidades subordinadas";
const ASSUNTO_CONCLUSAO: &str = "SGC: Conclusão do processo {{processo}}";
const CORPO_CONCLUSAO: &str = "Prezado(a) {{nome}},\n\nO processo {{processo}} foi finalizado e o mapa de competências da unidade {{sigla}} passa a ser o vigente.";
const ALERTA_LEMBRETE: &str = "Lembrete: Prazo do processo {{processo}} encerra em {{prazo}}";
const ASSUNTO_LEMBRETE: &str = "SGC: Lembrete de prazo - {{processo}}";

/// Input for creating a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriarProcessoRequest {
    pub descricao: String,
    pub tipo: TipoProcesso,
    /// Epoch ms; first-stage deadline of every subprocess.
    pub data_limite: i64,
    pub unidades: Vec<CodigoUnidade>,
}

/// Updates replace every editable field.
pub type AtualizarProcessoRequest = CriarProcessoRequest;

/// Process lifecycle operations over one SQLite connection.
pub struct ProcessoService<'conn, M: Mailer = LogMailer> {
    conn: &'conn Connection,
    mailer: M,
    dominio_email: String,
}

impl<'conn, M: Mailer> ProcessoService<'conn, M> {
    /// Creates a service over a migrated connection.
    pub fn try_new(conn: &'conn Connection, mailer: M, config: &SgcConfig) -> WorkflowResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self {
            conn,
            mailer,
            dominio_email: config.email_domain.clone(),
        })
    }

    pub fn criar(&self, dados: CriarProcessoRequest, ator: &UsuarioAtivo) -> WorkflowResult<Processo> {
        exigir_admin(ator, "criar processo")?;
        em_transacao(self.conn, &self.mailer, "processo_criar", |repos| {
            let hierarquia = carregar_hierarquia(repos)?;
            let participantes = validar_dados(repos, &hierarquia, &dados)?;
            let processo = Processo {
                id: Uuid::new_v4(),
                descricao: dados.descricao.trim().to_string(),
                tipo: dados.tipo,
                situacao: SituacaoProcesso::Criado,
                data_criacao: now_epoch_ms(),
                data_limite: dados.data_limite,
                data_finalizacao: None,
                participantes,
            };
            repos.processos.inserir(&processo)?;
            info!(
                "event=processo_criar module=service status=ok processo={} tipo={} unidades={}",
                processo.id,
                processo.tipo.as_str(),
                processo.participantes.len()
            );
            Ok((processo, Vec::new()))
        })
    }

    pub fn atualizar(
        &self,
        id: ProcessoId,
        dados: AtualizarProcessoRequest,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Processo> {
        exigir_admin(ator, "atualizar processo")?;
        em_transacao(self.conn, &self.mailer, "processo_atualizar", |repos| {
            let atual = buscar_em(repos, id, SituacaoProcesso::Criado)?;
            let hierarquia = carregar_hierarquia(repos)?;
            let participantes = validar_dados(repos, &hierarquia, &dados)?;
            let processo = Processo {
                descricao: dados.descricao.trim().to_string(),
                tipo: dados.tipo,
                data_limite: dados.data_limite,
                participantes,
                ..atual
            };
            repos.processos.atualizar(&processo)?;
            Ok((processo, Vec::new()))
        })
    }

    pub fn excluir(&self, id: ProcessoId, ator: &UsuarioAtivo) -> WorkflowResult<()> {
        exigir_admin(ator, "excluir processo")?;
        em_transacao(self.conn, &self.mailer, "processo_excluir", |repos| {
            buscar_em(repos, id, SituacaoProcesso::Criado)?;
            repos.processos.excluir(id)?;
            Ok(((), Vec::new()))
        })
    }

    /// Starts a process: one map and one NAO_INICIADO subprocess per unit.
    pub fn iniciar(&self, id: ProcessoId, ator: &UsuarioAtivo) -> WorkflowResult<Processo> {
        exigir_admin(ator, "iniciar processo")?;
        em_transacao(self.conn, &self.mailer, "processo_iniciar", |repos| {
            let processo = buscar_em(repos, id, SituacaoProcesso::Criado)?;
            if processo.tipo == TipoProcesso::Diagnostico {
                return Err(WorkflowError::validation(
                    "DIAGNOSTICO processes cannot be started",
                ));
            }
            let hierarquia = carregar_hierarquia(repos)?;

            let ocupadas: BTreeSet<CodigoUnidade> =
                repos.processos.unidades_em_andamento(id)?.into_iter().collect();
            let em_conflito = siglas(
                &hierarquia,
                processo
                    .participantes
                    .iter()
                    .copied()
                    .filter(|unidade| ocupadas.contains(unidade)),
            );
            if !em_conflito.is_empty() {
                return Err(WorkflowError::validation_with(
                    "units already take part in another active process",
                    "unidadesEmProcessoAtivo",
                    em_conflito,
                ));
            }

            let mut efeitos = Efeitos::new(&hierarquia, &self.dominio_email);
            for &unidade in &processo.participantes {
                let mapa = match processo.tipo {
                    TipoProcesso::Revisao => {
                        let vigente = repos.unidades.mapa_vigente(unidade)?.ok_or_else(|| {
                            WorkflowError::validation_with(
                                "revision needs a vigente map for every unit",
                                "unidadesSemMapaVigente",
                                siglas(&hierarquia, [unidade]),
                            )
                        })?;
                        repos.mapas.copiar_mapa(vigente)?
                    }
                    _ => repos.mapas.criar_mapa()?,
                };
                let subprocesso = Subprocesso {
                    id: Uuid::new_v4(),
                    processo_id: processo.id,
                    unidade,
                    mapa_id: mapa.id,
                    situacao: SituacaoSubprocesso::NaoIniciado,
                    data_limite_etapa1: processo.data_limite,
                    data_fim_etapa1: None,
                    data_limite_etapa2: None,
                    data_fim_etapa2: None,
                };
                repos.subprocessos.inserir(&subprocesso)?;
                efeitos.movimentar(
                    repos,
                    &processo,
                    &subprocesso,
                    ator,
                    Passo::new(TipoTransicao::ProcessoIniciado, None, unidade),
                )?;
            }

            let participantes: BTreeSet<CodigoUnidade> =
                processo.participantes.iter().copied().collect();
            let superiores: BTreeSet<CodigoUnidade> = processo
                .participantes
                .iter()
                .flat_map(|&unidade| hierarquia.ancestrais(unidade))
                .filter(|unidade| !participantes.contains(unidade))
                .collect();
            let assunto = renderizar(
                ASSUNTO_INICIO_SUBORDINADAS,
                &[("processo", processo.descricao.as_str())],
            );
            for superior in superiores {
                efeitos.alertar(
                    repos,
                    processo.id,
                    Some(ator.unidade_ativa),
                    superior,
                    ALERTA_SUBORDINADAS,
                )?;
                efeitos.notificar_unidade(superior, &assunto, ALERTA_SUBORDINADAS, &processo.descricao);
            }

            if !repos.processos.transicionar(
                id,
                SituacaoProcesso::Criado,
                SituacaoProcesso::EmAndamento,
                None,
            )? {
                return Err(WorkflowError::StateConflict(format!(
                    "processo {id} changed concurrently"
                )));
            }
            info!(
                "event=processo_iniciar module=service status=ok processo={} subprocessos={}",
                processo.id,
                processo.participantes.len()
            );
            Ok((
                Processo {
                    situacao: SituacaoProcesso::EmAndamento,
                    ..processo
                },
                efeitos.into_emails(),
            ))
        })
    }

    /// Finalizes a process once every subprocess is homologated.
    pub fn finalizar(&self, id: ProcessoId, ator: &UsuarioAtivo) -> WorkflowResult<Processo> {
        exigir_admin(ator, "finalizar processo")?;
        em_transacao(self.conn, &self.mailer, "processo_finalizar", |repos| {
            let processo = buscar_em(repos, id, SituacaoProcesso::EmAndamento)?;
            let hierarquia = carregar_hierarquia(repos)?;
            let subprocessos = repos.subprocessos.listar_por_processo(id)?;

            let pendentes = siglas(
                &hierarquia,
                subprocessos
                    .iter()
                    .filter(|subprocesso| !subprocesso.situacao.is_terminal())
                    .map(|subprocesso| subprocesso.unidade),
            );
            if !pendentes.is_empty() {
                return Err(WorkflowError::StateConflict(format!(
                    "subprocessos not homologated yet: {}",
                    pendentes.join(", ")
                )));
            }

            let agora = now_epoch_ms();
            for subprocesso in &subprocessos {
                repos
                    .unidades
                    .definir_mapa_vigente(subprocesso.unidade, subprocesso.mapa_id, agora)?;
            }
            if !repos.processos.transicionar(
                id,
                SituacaoProcesso::EmAndamento,
                SituacaoProcesso::Finalizado,
                Some(agora),
            )? {
                return Err(WorkflowError::StateConflict(format!(
                    "processo {id} changed concurrently"
                )));
            }

            let mut efeitos = Efeitos::new(&hierarquia, &self.dominio_email);
            let assunto = renderizar(ASSUNTO_CONCLUSAO, &[("processo", processo.descricao.as_str())]);
            for subprocesso in &subprocessos {
                let sigla = hierarquia
                    .sigla(subprocesso.unidade)
                    .map(str::to_string)
                    .unwrap_or_else(|| subprocesso.unidade.to_string());
                let responsaveis = repos.unidades.listar_responsaveis(subprocesso.unidade)?;
                let mut destinatarios: Vec<(String, String)> = responsaveis
                    .into_iter()
                    .filter_map(|responsavel| {
                        responsavel.email.map(|email| (email, responsavel.nome))
                    })
                    .collect();
                if destinatarios.is_empty() {
                    destinatarios.push((caixa_da_unidade(&sigla, &self.dominio_email), sigla.clone()));
                }
                for (destinatario, nome) in destinatarios {
                    let corpo = renderizar(
                        CORPO_CONCLUSAO,
                        &[
                            ("nome", nome.as_str()),
                            ("processo", processo.descricao.as_str()),
                            ("sigla", sigla.as_str()),
                        ],
                    );
                    efeitos.enfileirar(Email {
                        destinatario,
                        assunto: assunto.clone(),
                        corpo,
                    });
                }
            }

            info!(
                "event=processo_finalizar module=service status=ok processo={} mapas_vigentes={}",
                processo.id,
                subprocessos.len()
            );
            Ok((
                Processo {
                    situacao: SituacaoProcesso::Finalizado,
                    data_finalizacao: Some(agora),
                    ..processo
                },
                efeitos.into_emails(),
            ))
        })
    }

    /// Sends a deadline reminder to one participating unit.
    pub fn enviar_lembrete(
        &self,
        id: ProcessoId,
        unidade: CodigoUnidade,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Alerta> {
        exigir_admin(ator, "enviar lembrete")?;
        em_transacao(self.conn, &self.mailer, "processo_lembrete", |repos| {
            let processo = buscar_em(repos, id, SituacaoProcesso::EmAndamento)?;
            if !processo.participantes.contains(&unidade) {
                return Err(WorkflowError::validation_with(
                    "unit does not take part in this process",
                    "unidade",
                    vec![unidade.to_string()],
                ));
            }
            let hierarquia = carregar_hierarquia(repos)?;
            let mut efeitos = Efeitos::new(&hierarquia, &self.dominio_email);

            let prazo = formatar_data(processo.data_limite);
            let valores = [("processo", processo.descricao.as_str()), ("prazo", prazo.as_str())];
            let texto = renderizar(ALERTA_LEMBRETE, &valores);
            let alerta = efeitos.alertar(repos, processo.id, Some(ator.unidade_ativa), unidade, &texto)?;
            let assunto = renderizar(ASSUNTO_LEMBRETE, &valores);
            efeitos.notificar_unidade(unidade, &assunto, &texto, &processo.descricao);
            Ok((alerta, efeitos.into_emails()))
        })
    }

    /// Loads a process visible to `ator`.
    pub fn obter(&self, id: ProcessoId, ator: &UsuarioAtivo) -> WorkflowResult<Processo> {
        let repos = Repositorios::sobre(self.conn);
        let processo = repos
            .processos
            .buscar(id)?
            .ok_or_else(|| WorkflowError::not_found("processo", id))?;
        let hierarquia = carregar_hierarquia(&repos)?;
        if !visivel(&processo, ator, &hierarquia) {
            return Err(WorkflowError::Forbidden(format!(
                "unit {} cannot see processo {id}",
                ator.unidade_ativa
            )));
        }
        Ok(processo)
    }

    /// Processes visible to `ator`, newest first. CRIADO ones are ADMIN-only.
    pub fn listar_visiveis(&self, ator: &UsuarioAtivo) -> WorkflowResult<Vec<Processo>> {
        let repos = Repositorios::sobre(self.conn);
        let hierarquia = carregar_hierarquia(&repos)?;
        Ok(repos
            .processos
            .listar()?
            .into_iter()
            .filter(|processo| visivel(processo, ator, &hierarquia))
            .collect())
    }

    /// Subprocesses of a process that `ator` may see, by unit code.
    pub fn listar_subprocessos(
        &self,
        id: ProcessoId,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<Vec<Subprocesso>> {
        self.obter(id, ator)?;
        let repos = Repositorios::sobre(self.conn);
        let hierarquia = carregar_hierarquia(&repos)?;
        Ok(repos
            .subprocessos
            .listar_por_processo(id)?
            .into_iter()
            .filter(|subprocesso| pode_visualizar(ator, subprocesso.unidade, &hierarquia))
            .collect())
    }
}

fn exigir_admin(ator: &UsuarioAtivo, operacao: &str) -> WorkflowResult<()> {
    if ator.is_admin() {
        return Ok(());
    }
    Err(WorkflowError::Forbidden(format!(
        "{operacao} requires profile ADMIN, got {}",
        ator.perfil.as_str()
    )))
}

fn buscar_em(
    repos: &Repositorios<'_>,
    id: ProcessoId,
    esperada: SituacaoProcesso,
) -> WorkflowResult<Processo> {
    let processo = repos
        .processos
        .buscar(id)?
        .ok_or_else(|| WorkflowError::not_found("processo", id))?;
    if processo.situacao != esperada {
        return Err(WorkflowError::StateConflict(format!(
            "processo {id} must be {}, got {}",
            esperada.as_str(),
            processo.situacao.as_str()
        )));
    }
    Ok(processo)
}

fn visivel(processo: &Processo, ator: &UsuarioAtivo, hierarquia: &Hierarquia) -> bool {
    if ator.is_admin() {
        return true;
    }
    processo.situacao != SituacaoProcesso::Criado
        && processo
            .participantes
            .iter()
            .any(|&unidade| pode_visualizar(ator, unidade, hierarquia))
}

fn siglas(hierarquia: &Hierarquia, unidades: impl IntoIterator<Item = CodigoUnidade>) -> Vec<String> {
    unidades
        .into_iter()
        .map(|unidade| {
            hierarquia
                .sigla(unidade)
                .map(str::to_string)
                .unwrap_or_else(|| unidade.to_string())
        })
        .collect()
}

/// Checks description, units and vigente maps; returns sorted unique units.
fn validar_dados(
    repos: &Repositorios<'_>,
    hierarquia: &Hierarquia,
    dados: &CriarProcessoRequest,
) -> WorkflowResult<Vec<CodigoUnidade>> {
    exigir_texto(&dados.descricao, "descricao")?;
    let unidades: BTreeSet<CodigoUnidade> = dados.unidades.iter().copied().collect();
    if unidades.is_empty() {
        return Err(WorkflowError::validation_with(
            "at least one unit is required",
            "unidades",
            Vec::new(),
        ));
    }

    let mut details = Detalhes::new();
    let inexistentes: Vec<String> = unidades
        .iter()
        .filter(|unidade| hierarquia.unidade(**unidade).is_none())
        .map(|unidade| unidade.to_string())
        .collect();
    if !inexistentes.is_empty() {
        details.insert("unidadesInexistentes".to_string(), inexistentes);
    }
    let nao_participantes = siglas(
        hierarquia,
        unidades.iter().copied().filter(|unidade| {
            hierarquia
                .unidade(*unidade)
                .is_some_and(|registro| !registro.pode_participar())
        }),
    );
    if !nao_participantes.is_empty() {
        details.insert("unidadesNaoParticipantes".to_string(), nao_participantes);
    }
    if dados.tipo.exige_mapa_vigente() {
        let mut sem_mapa = Vec::new();
        for &unidade in &unidades {
            if hierarquia.unidade(unidade).is_some() && repos.unidades.mapa_vigente(unidade)?.is_none() {
                sem_mapa.extend(siglas(hierarquia, [unidade]));
            }
        }
        if !sem_mapa.is_empty() {
            details.insert("unidadesSemMapaVigente".to_string(), sem_mapa);
        }
    }

    if !details.is_empty() {
        return Err(WorkflowError::Validation {
            message: "invalid process units".to_string(),
            details,
        });
    }
    Ok(unidades.into_iter().collect())
}
