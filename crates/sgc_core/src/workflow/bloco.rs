//! Bulk ("em bloco") variants of reviewer actions.
//!
//! # Invariants
//! - Each target unit runs in its own unit of work; a failure never undoes
//!   another unit's commit.
//! - The report lists units in request order, one entry per unit.

use crate::model::subprocesso::{SituacaoSubprocesso, Subprocesso, SubprocessoId};
use crate::model::unidade::{CodigoUnidade, UsuarioAtivo};
use crate::notify::Mailer;
use crate::workflow::engine::WorkflowEngine;
use crate::workflow::error::WorkflowResult;
use log::info;
use serde::{Deserialize, Serialize};

/// Outcome for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resultado", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultadoUnidade {
    Sucesso { situacao: SituacaoSubprocesso },
    Falha { status: u16, mensagem: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBloco {
    pub unidade: CodigoUnidade,
    pub subprocesso_id: Option<SubprocessoId>,
    #[serde(flatten)]
    pub resultado: ResultadoUnidade,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatorioBloco {
    pub itens: Vec<ItemBloco>,
}

impl RelatorioBloco {
    pub fn sucessos(&self) -> usize {
        self.itens
            .iter()
            .filter(|item| matches!(item.resultado, ResultadoUnidade::Sucesso { .. }))
            .count()
    }

    pub fn falhas(&self) -> usize {
        self.itens.len() - self.sucessos()
    }
}

impl<M: Mailer> WorkflowEngine<'_, M> {
    pub fn aceitar_cadastro_em_bloco(
        &self,
        contexto: SubprocessoId,
        unidades: &[CodigoUnidade],
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<RelatorioBloco> {
        self.em_bloco("aceitar_cadastro", contexto, unidades, |id| {
            self.aceitar_cadastro(id, None, ator)
        })
    }

    pub fn homologar_cadastro_em_bloco(
        &self,
        contexto: SubprocessoId,
        unidades: &[CodigoUnidade],
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<RelatorioBloco> {
        self.em_bloco("homologar_cadastro", contexto, unidades, |id| {
            self.homologar_cadastro(id, None, ator)
        })
    }

    pub fn aceitar_validacao_em_bloco(
        &self,
        contexto: SubprocessoId,
        unidades: &[CodigoUnidade],
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<RelatorioBloco> {
        self.em_bloco("aceitar_validacao", contexto, unidades, |id| {
            self.aceitar_validacao(id, None, ator)
        })
    }

    pub fn homologar_validacao_em_bloco(
        &self,
        contexto: SubprocessoId,
        unidades: &[CodigoUnidade],
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<RelatorioBloco> {
        self.em_bloco("homologar_validacao", contexto, unidades, |id| {
            self.homologar_validacao(id, None, ator)
        })
    }

    pub fn disponibilizar_mapa_em_bloco(
        &self,
        contexto: SubprocessoId,
        unidades: &[CodigoUnidade],
        data_limite: Option<i64>,
        ator: &UsuarioAtivo,
    ) -> WorkflowResult<RelatorioBloco> {
        self.em_bloco("disponibilizar_mapa", contexto, unidades, |id| {
            self.disponibilizar_mapa(id, data_limite, ator)
        })
    }

    /// Resolves each unit's subprocess under the context's process and runs
    /// `operacao_unitaria` on it. Only an unknown context subprocess fails
    /// the whole call.
    fn em_bloco<F>(
        &self,
        operacao: &str,
        contexto: SubprocessoId,
        unidades: &[CodigoUnidade],
        operacao_unitaria: F,
    ) -> WorkflowResult<RelatorioBloco>
    where
        F: Fn(SubprocessoId) -> WorkflowResult<Subprocesso>,
    {
        let mut relatorio = RelatorioBloco::default();
        for (unidade, alvo) in self.resolver_alvos(contexto, unidades)? {
            let resultado = match alvo {
                None => ResultadoUnidade::Falha {
                    status: 404,
                    mensagem: format!("unit {unidade} has no subprocesso in this process"),
                },
                Some(id) => match operacao_unitaria(id) {
                    Ok(subprocesso) => ResultadoUnidade::Sucesso {
                        situacao: subprocesso.situacao,
                    },
                    Err(err) => ResultadoUnidade::Falha {
                        status: err.http_status(),
                        mensagem: err.to_string(),
                    },
                },
            };
            relatorio.itens.push(ItemBloco {
                unidade,
                subprocesso_id: alvo,
                resultado,
            });
        }

        info!(
            "event=bulk_op module=workflow status=ok op={operacao} total={} ok={} failed={}",
            relatorio.itens.len(),
            relatorio.sucessos(),
            relatorio.falhas()
        );
        Ok(relatorio)
    }
}
