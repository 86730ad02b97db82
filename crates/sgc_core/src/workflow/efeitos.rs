//! Side effects attached to transitions: movements, alerts and emails.
//!
//! # Responsibility
//! - Map each transition kind to its movement text, alert template and email
//!   subject through one fixed table.
//! - Write movements and alerts inside the caller's transaction and queue
//!   emails for dispatch after commit.
//!
//! # Invariants
//! - Exactly one movement per `movimentar` call.
//! - Queued emails are unique per (recipient, subject).

use crate::model::processo::{Processo, ProcessoId};
use crate::model::registro::{Alerta, Movimentacao};
use crate::model::subprocesso::Subprocesso;
use crate::model::unidade::{CodigoUnidade, UsuarioAtivo};
use crate::notify::template::renderizar;
use crate::notify::{caixa_da_unidade, Email};
use crate::repo::registro_repo::RegistroRepository;
use crate::repo::{now_epoch_ms, Repositorios};
use crate::workflow::error::WorkflowResult;
use crate::workflow::hierarquia::Hierarquia;
use uuid::Uuid;

const CORPO_EMAIL: &str = "Ao responsável pela {{unidade}},\n\n{{texto}}\n\nProcesso: {{processo}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TipoTransicao {
    ProcessoIniciado,
    CadastroDisponibilizado,
    RevisaoCadastroDisponibilizada,
    CadastroDevolvido,
    RevisaoCadastroDevolvida,
    CadastroAceito,
    RevisaoCadastroAceita,
    CadastroHomologado,
    RevisaoCadastroHomologada,
    ImpactoMapaIdentificado,
    MapaAjustado,
    MapaDisponibilizado,
    SugestoesApresentadas,
    MapaValidado,
    ValidacaoDevolvida,
    ValidacaoAceita,
    MapaHomologado,
    CadastroReaberto,
    RevisaoCadastroReaberta,
}

/// Row of the side-effect table.
#[derive(Debug, Clone, Copy)]
struct Definicao {
    movimentacao: &'static str,
    alerta: Option<&'static str>,
    assunto: Option<&'static str>,
    /// Email every ancestor of the subprocess unit too.
    email_superiores: bool,
    /// Alert every ancestor of the destination too.
    alerta_superiores: bool,
}

const fn def(
    movimentacao: &'static str,
    alerta: Option<&'static str>,
    assunto: Option<&'static str>,
) -> Definicao {
    Definicao {
        movimentacao,
        alerta,
        assunto,
        email_superiores: false,
        alerta_superiores: false,
    }
}

impl TipoTransicao {
    fn definicao(self) -> Definicao {
        match self {
            Self::ProcessoIniciado => def(
                "Processo iniciado",
                Some("Início do processo"),
                Some("SGC: Início do processo {{processo}}"),
            ),
            Self::CadastroDisponibilizado => Definicao {
                email_superiores: true,
                ..def(
                    "Disponibilização do cadastro de atividades",
                    Some("Cadastro de atividades da unidade {{sigla}} disponibilizado para análise"),
                    Some("SGC: Cadastro de atividades e conhecimentos da {{sigla}} submetido para análise"),
                )
            },
            Self::RevisaoCadastroDisponibilizada => Definicao {
                email_superiores: true,
                ..def(
                    "Disponibilização da revisão do cadastro de atividades",
                    Some("Revisão do cadastro de atividades da unidade {{sigla}} disponibilizada para análise"),
                    Some("SGC: Revisão do cadastro de atividades e conhecimentos da {{sigla}} submetido para análise"),
                )
            },
            Self::CadastroDevolvido => def(
                "Devolução do cadastro de atividades para ajustes",
                Some("Cadastro de atividades da unidade {{sigla}} devolvido para ajustes"),
                Some("SGC: Cadastro de atividades e conhecimentos da {{sigla}} devolvido para ajustes"),
            ),
            Self::RevisaoCadastroDevolvida => def(
                "Devolução da revisão do cadastro de atividades para ajustes",
                Some("Revisão do cadastro de atividades da unidade {{sigla}} devolvida para ajustes"),
                Some("SGC: Revisão do cadastro de atividades e conhecimentos da {{sigla}} devolvida para ajustes"),
            ),
            Self::CadastroAceito => def(
                "Cadastro de atividades e conhecimentos aceito",
                Some("Cadastro de atividades da unidade {{sigla}} submetido para análise"),
                Some("SGC: Cadastro de atividades e conhecimentos da {{sigla}} submetido para análise"),
            ),
            Self::RevisaoCadastroAceita => def(
                "Revisão do cadastro de atividades e conhecimentos aceita",
                Some("Revisão do cadastro de atividades da unidade {{sigla}} submetida para análise"),
                Some("SGC: Revisão do cadastro de atividades e conhecimentos da {{sigla}} submetido para análise"),
            ),
            Self::CadastroHomologado => {
                def("Cadastro de atividades e conhecimentos homologado", None, None)
            }
            Self::RevisaoCadastroHomologada => def(
                "Revisão do cadastro de atividades e conhecimentos homologada",
                None,
                None,
            ),
            Self::ImpactoMapaIdentificado => def(
                "Impactos no mapa de competências identificados na revisão do cadastro",
                None,
                None,
            ),
            Self::MapaAjustado => def("Ajuste do mapa de competências", None, None),
            Self::MapaDisponibilizado => Definicao {
                email_superiores: true,
                ..def(
                    "Disponibilização do mapa de competências para validação",
                    Some("Mapa de competências da unidade {{sigla}} disponibilizado para validação"),
                    Some("SGC: Mapa de competências da unidade {{sigla}} disponibilizado para validação"),
                )
            },
            Self::SugestoesApresentadas => def(
                "Apresentação de sugestões para o mapa de competências",
                Some("Sugestões para o mapa de competências da unidade {{sigla}} apresentadas"),
                Some("SGC: Sugestões apresentadas para o mapa de competências da {{sigla}}"),
            ),
            Self::MapaValidado => def(
                "Validação do mapa de competências",
                Some("Validação do mapa de competências da unidade {{sigla}} submetida para análise"),
                Some("SGC: Validação do mapa de competências da {{sigla}} submetida para análise"),
            ),
            Self::ValidacaoDevolvida => def(
                "Devolução da validação do mapa de competências para ajustes",
                Some("Validação do mapa de competências da unidade {{sigla}} devolvida para ajustes"),
                Some("SGC: Validação do mapa de competências da {{sigla}} devolvida para ajustes"),
            ),
            Self::ValidacaoAceita => def(
                "Validação do mapa de competências aceita",
                Some("Validação do mapa de competências da unidade {{sigla}} submetida para análise"),
                Some("SGC: Validação do mapa de competências da {{sigla}} submetida para análise"),
            ),
            Self::MapaHomologado => def("Mapa de competências homologado", None, None),
            Self::CadastroReaberto => Definicao {
                alerta_superiores: true,
                ..def(
                    "Reabertura de cadastro",
                    Some("Cadastro de atividades da unidade {{sigla}} reaberto"),
                    Some("SGC: Cadastro de atividades da unidade {{sigla}} reaberto"),
                )
            },
            Self::RevisaoCadastroReaberta => Definicao {
                alerta_superiores: true,
                ..def(
                    "Reabertura de revisão de cadastro",
                    Some("Revisão do cadastro de atividades da unidade {{sigla}} reaberta"),
                    Some("SGC: Revisão do cadastro de atividades da unidade {{sigla}} reaberta"),
                )
            },
        }
    }

    /// Movement description recorded for this transition.
    pub fn descricao(self) -> &'static str {
        self.definicao().movimentacao
    }
}

/// One routed step: transition kind, origin and destination units.
#[derive(Debug, Clone, Copy)]
pub struct Passo<'a> {
    pub tipo: TipoTransicao,
    /// `None` only when a process starts.
    pub origem: Option<CodigoUnidade>,
    pub destino: CodigoUnidade,
    /// Justification appended to alert and email texts.
    pub observacoes: Option<&'a str>,
}

impl<'a> Passo<'a> {
    pub fn new(tipo: TipoTransicao, origem: Option<CodigoUnidade>, destino: CodigoUnidade) -> Self {
        Self {
            tipo,
            origem,
            destino,
            observacoes: None,
        }
    }

    pub fn com_observacoes(mut self, observacoes: &'a str) -> Self {
        self.observacoes = Some(observacoes);
        self
    }
}

/// Side-effect writer bound to one unit of work.
pub struct Efeitos<'h> {
    hierarquia: &'h Hierarquia,
    dominio_email: &'h str,
    emails: Vec<Email>,
}

impl<'h> Efeitos<'h> {
    pub fn new(hierarquia: &'h Hierarquia, dominio_email: &'h str) -> Self {
        Self {
            hierarquia,
            dominio_email,
            emails: Vec::new(),
        }
    }

    /// Appends the movement of `passo` and the alert/emails its table row asks for.
    pub fn movimentar(
        &mut self,
        repos: &Repositorios<'_>,
        processo: &Processo,
        subprocesso: &Subprocesso,
        ator: &UsuarioAtivo,
        passo: Passo<'_>,
    ) -> WorkflowResult<Movimentacao> {
        let definicao = passo.tipo.definicao();
        let movimentacao = Movimentacao {
            id: Uuid::new_v4(),
            processo_id: processo.id,
            subprocesso_id: subprocesso.id,
            unidade_origem: passo.origem,
            unidade_destino: passo.destino,
            descricao: definicao.movimentacao.to_string(),
            usuario_titulo: ator.titulo.clone(),
            data_hora: now_epoch_ms(),
        };
        repos.registros.inserir_movimentacao(&movimentacao)?;

        let sigla = self.sigla(subprocesso.unidade);
        let valores = [("sigla", sigla.as_str()), ("processo", processo.descricao.as_str())];
        let com_observacoes = |texto: String| match passo.observacoes {
            Some(observacoes) => format!("{texto}. Justificativa: {observacoes}"),
            None => texto,
        };

        if let Some(template) = definicao.alerta {
            let texto = com_observacoes(renderizar(template, &valores));
            let remetente = passo.origem.unwrap_or(ator.unidade_ativa);
            self.alertar(repos, processo.id, Some(remetente), passo.destino, &texto)?;
            if definicao.alerta_superiores {
                for ancestral in self.hierarquia.ancestrais(passo.destino) {
                    self.alertar(repos, processo.id, Some(remetente), ancestral, &texto)?;
                }
            }
        }

        if let Some(template) = definicao.assunto {
            let assunto = renderizar(template, &valores);
            let texto = com_observacoes(
                definicao
                    .alerta
                    .map(|alerta| renderizar(alerta, &valores))
                    .unwrap_or_else(|| definicao.movimentacao.to_string()),
            );
            self.notificar_unidade(passo.destino, &assunto, &texto, &processo.descricao);
            if definicao.email_superiores {
                for ancestral in self.hierarquia.ancestrais(subprocesso.unidade) {
                    self.notificar_unidade(ancestral, &assunto, &texto, &processo.descricao);
                }
            }
        }

        Ok(movimentacao)
    }

    /// Writes one alert.
    pub fn alertar(
        &mut self,
        repos: &Repositorios<'_>,
        processo_id: ProcessoId,
        origem: Option<CodigoUnidade>,
        destino: CodigoUnidade,
        descricao: &str,
    ) -> WorkflowResult<Alerta> {
        let alerta = Alerta {
            id: Uuid::new_v4(),
            processo_id,
            unidade_origem: origem,
            unidade_destino: destino,
            usuario_destino: None,
            descricao: descricao.to_string(),
            data_hora: now_epoch_ms(),
        };
        repos.registros.inserir_alerta(&alerta)?;
        Ok(alerta)
    }

    /// Queues an email to the mailbox of `unidade`.
    pub fn notificar_unidade(
        &mut self,
        unidade: CodigoUnidade,
        assunto: &str,
        texto: &str,
        processo: &str,
    ) {
        let sigla = self.sigla(unidade);
        let destinatario = caixa_da_unidade(&sigla, self.dominio_email);
        let corpo = renderizar(
            CORPO_EMAIL,
            &[("unidade", sigla.as_str()), ("texto", texto), ("processo", processo)],
        );
        self.enfileirar(Email {
            destinatario,
            assunto: assunto.to_string(),
            corpo,
        });
    }

    /// Queues an email to an explicit address.
    pub fn enfileirar(&mut self, email: Email) {
        let repetido = self
            .emails
            .iter()
            .any(|fila| fila.destinatario == email.destinatario && fila.assunto == email.assunto);
        if !repetido {
            self.emails.push(email);
        }
    }

    pub fn into_emails(self) -> Vec<Email> {
        self.emails
    }

    fn sigla(&self, unidade: CodigoUnidade) -> String {
        self.hierarquia
            .sigla(unidade)
            .map(str::to_string)
            .unwrap_or_else(|| unidade.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{Efeitos, TipoTransicao};
    use crate::model::unidade::{TipoUnidade, Unidade};
    use crate::notify::Email;
    use crate::workflow::hierarquia::Hierarquia;

    #[test]
    fn queued_emails_are_unique_per_recipient_and_subject() {
        let h = Hierarquia::construir(vec![
            Unidade::new(1, "SEDOC", "Raiz", TipoUnidade::Raiz, None),
            Unidade::new(2, "SESEL", "Secao", TipoUnidade::Operacional, Some(1)),
        ])
        .unwrap();
        let mut efeitos = Efeitos::new(&h, "tre-pe.jus.br");
        efeitos.notificar_unidade(2, "SGC: a", "texto", "P");
        efeitos.notificar_unidade(2, "SGC: a", "texto", "P");
        efeitos.notificar_unidade(2, "SGC: b", "texto", "P");
        efeitos.enfileirar(Email {
            destinatario: "sesel@tre-pe.jus.br".to_string(),
            assunto: "SGC: b".to_string(),
            corpo: String::new(),
        });

        let emails = efeitos.into_emails();
        assert_eq!(emails.len(), 2);
        assert_eq!(emails[0].destinatario, "sesel@tre-pe.jus.br");
        assert!(emails[0].corpo.contains("SESEL"));
    }

    #[test]
    fn movement_texts_are_stable() {
        assert_eq!(TipoTransicao::ProcessoIniciado.descricao(), "Processo iniciado");
        assert_eq!(
            TipoTransicao::CadastroDisponibilizado.descricao(),
            "Disponibilização do cadastro de atividades"
        );
        assert_eq!(TipoTransicao::CadastroReaberto.descricao(), "Reabertura de cadastro");
    }
}
