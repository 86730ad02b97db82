//! Subprocess transition table.
//!
//! # Responsibility
//! - Decide, without touching storage, whether an action is allowed from a
//!   state and which state it leads to.
//!
//! # Invariants
//! - Source and target always belong to the same process type.
//! - Terminal states (`*_MAPA_HOMOLOGADO`) only accept reopening actions.
//! - Actions that do not move the state (aceites, deadline changes) return
//!   the current state.

use crate::model::processo::TipoProcesso;
use crate::model::subprocesso::{Etapa, SituacaoSubprocesso};

/// Business action that may be attempted on a subprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Acao {
    EditarCadastro,
    DisponibilizarCadastro,
    DevolverCadastro,
    AceitarCadastro,
    HomologarCadastro,
    EditarMapa,
    AjustarMapa,
    DisponibilizarMapa,
    ApresentarSugestoes,
    ValidarMapa,
    DevolverValidacao,
    AceitarValidacao,
    HomologarValidacao,
    ReabrirCadastro,
    ReabrirRevisaoCadastro,
    AlterarDataLimite,
}

impl Acao {
    pub const TODAS: [Acao; 16] = [
        Self::EditarCadastro,
        Self::DisponibilizarCadastro,
        Self::DevolverCadastro,
        Self::AceitarCadastro,
        Self::HomologarCadastro,
        Self::EditarMapa,
        Self::AjustarMapa,
        Self::DisponibilizarMapa,
        Self::ApresentarSugestoes,
        Self::ValidarMapa,
        Self::DevolverValidacao,
        Self::AceitarValidacao,
        Self::HomologarValidacao,
        Self::ReabrirCadastro,
        Self::ReabrirRevisaoCadastro,
        Self::AlterarDataLimite,
    ];

    /// Stable snake_case name used in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EditarCadastro => "editar_cadastro",
            Self::DisponibilizarCadastro => "disponibilizar_cadastro",
            Self::DevolverCadastro => "devolver_cadastro",
            Self::AceitarCadastro => "aceitar_cadastro",
            Self::HomologarCadastro => "homologar_cadastro",
            Self::EditarMapa => "editar_mapa",
            Self::AjustarMapa => "ajustar_mapa",
            Self::DisponibilizarMapa => "disponibilizar_mapa",
            Self::ApresentarSugestoes => "apresentar_sugestoes",
            Self::ValidarMapa => "validar_mapa",
            Self::DevolverValidacao => "devolver_validacao",
            Self::AceitarValidacao => "aceitar_validacao",
            Self::HomologarValidacao => "homologar_validacao",
            Self::ReabrirCadastro => "reabrir_cadastro",
            Self::ReabrirRevisaoCadastro => "reabrir_revisao_cadastro",
            Self::AlterarDataLimite => "alterar_data_limite",
        }
    }
}

/// Returns the state `acao` leads to from `situacao`, or `None` when the
/// action is not allowed there.
///
/// `HomologarCadastro` answers with `*_CADASTRO_HOMOLOGADO`; the revision
/// branch that skips straight to `REVISAO_MAPA_HOMOLOGADO` depends on impact
/// analysis and is taken by the engine.
pub fn transicao_permitida(
    situacao: SituacaoSubprocesso,
    acao: Acao,
    tipo: TipoProcesso,
) -> Option<SituacaoSubprocesso> {
    use Etapa::*;

    if !situacao.compativel_com(tipo) {
        return None;
    }
    let etapa = situacao.etapa().map(|(_, etapa)| etapa);

    let alvo = match (acao, etapa) {
        (Acao::EditarCadastro, None | Some(CadastroEmAndamento)) => CadastroEmAndamento,
        (Acao::DisponibilizarCadastro, Some(CadastroEmAndamento)) => CadastroDisponibilizado,
        (Acao::DevolverCadastro, Some(CadastroDisponibilizado)) => CadastroEmAndamento,
        (Acao::AceitarCadastro, Some(CadastroDisponibilizado)) => CadastroDisponibilizado,
        (Acao::HomologarCadastro, Some(CadastroDisponibilizado)) => CadastroHomologado,

        (Acao::EditarMapa, Some(CadastroHomologado)) => match tipo {
            TipoProcesso::Revisao => MapaAjustado,
            _ => MapaCriado,
        },
        (Acao::EditarMapa, Some(atual @ (MapaCriado | MapaAjustado | MapaComSugestoes))) => atual,
        (Acao::AjustarMapa, Some(CadastroHomologado | MapaAjustado)) => MapaAjustado,
        (Acao::DisponibilizarMapa, Some(MapaCriado | MapaAjustado | MapaComSugestoes)) => {
            MapaDisponibilizado
        }

        (Acao::ApresentarSugestoes, Some(MapaDisponibilizado)) => MapaComSugestoes,
        (Acao::ValidarMapa, Some(MapaDisponibilizado)) => MapaValidado,
        (Acao::DevolverValidacao, Some(MapaComSugestoes | MapaValidado)) => MapaDisponibilizado,
        (Acao::AceitarValidacao, Some(atual @ (MapaComSugestoes | MapaValidado))) => atual,
        (Acao::HomologarValidacao, Some(MapaComSugestoes | MapaValidado)) => MapaHomologado,

        (Acao::ReabrirCadastro, Some(atual)) if tipo == TipoProcesso::Mapeamento => {
            if atual == CadastroEmAndamento {
                return None;
            }
            CadastroEmAndamento
        }
        (Acao::ReabrirRevisaoCadastro, Some(atual)) if tipo == TipoProcesso::Revisao => {
            if atual == CadastroEmAndamento {
                return None;
            }
            CadastroEmAndamento
        }

        (Acao::AlterarDataLimite, _) if !situacao.is_terminal() => return Some(situacao),
        _ => return None,
    };

    SituacaoSubprocesso::de(tipo, alvo)
}
