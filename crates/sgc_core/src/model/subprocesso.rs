//! Subprocess model: one unit's workflow instance within a process.
//!
//! # Responsibility
//! - Enumerate every workflow state with its stable storage code.
//! - Split a state into process type and phase-neutral `Etapa`, so transition
//!   tables can be written once for both MAPEAMENTO and REVISAO.
//!
//! # Invariants
//! - A state is only valid for the process type its prefix names;
//!   `NaoIniciado` is valid for every type.
//! - `MAPA_CRIADO` exists only for MAPEAMENTO, `MAPA_AJUSTADO` only for
//!   REVISAO.

use crate::model::mapa::MapaId;
use crate::model::processo::{ProcessoId, TipoProcesso};
use crate::model::unidade::CodigoUnidade;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type SubprocessoId = Uuid;

/// Workflow state of a subprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SituacaoSubprocesso {
    NaoIniciado,
    MapeamentoCadastroEmAndamento,
    MapeamentoCadastroDisponibilizado,
    MapeamentoCadastroHomologado,
    MapeamentoMapaCriado,
    MapeamentoMapaDisponibilizado,
    MapeamentoMapaComSugestoes,
    MapeamentoMapaValidado,
    MapeamentoMapaHomologado,
    RevisaoCadastroEmAndamento,
    RevisaoCadastroDisponibilizada,
    RevisaoCadastroHomologada,
    RevisaoMapaAjustado,
    RevisaoMapaDisponibilizado,
    RevisaoMapaComSugestoes,
    RevisaoMapaValidado,
    RevisaoMapaHomologado,
}

/// Phase-neutral position inside the cadastro/mapa cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Etapa {
    CadastroEmAndamento,
    CadastroDisponibilizado,
    CadastroHomologado,
    MapaCriado,
    MapaAjustado,
    MapaDisponibilizado,
    MapaComSugestoes,
    MapaValidado,
    MapaHomologado,
}

impl SituacaoSubprocesso {
    pub const TODAS: [SituacaoSubprocesso; 17] = [
        Self::NaoIniciado,
        Self::MapeamentoCadastroEmAndamento,
        Self::MapeamentoCadastroDisponibilizado,
        Self::MapeamentoCadastroHomologado,
        Self::MapeamentoMapaCriado,
        Self::MapeamentoMapaDisponibilizado,
        Self::MapeamentoMapaComSugestoes,
        Self::MapeamentoMapaValidado,
        Self::MapeamentoMapaHomologado,
        Self::RevisaoCadastroEmAndamento,
        Self::RevisaoCadastroDisponibilizada,
        Self::RevisaoCadastroHomologada,
        Self::RevisaoMapaAjustado,
        Self::RevisaoMapaDisponibilizado,
        Self::RevisaoMapaComSugestoes,
        Self::RevisaoMapaValidado,
        Self::RevisaoMapaHomologado,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NaoIniciado => "NAO_INICIADO",
            Self::MapeamentoCadastroEmAndamento => "MAPEAMENTO_CADASTRO_EM_ANDAMENTO",
            Self::MapeamentoCadastroDisponibilizado => "MAPEAMENTO_CADASTRO_DISPONIBILIZADO",
            Self::MapeamentoCadastroHomologado => "MAPEAMENTO_CADASTRO_HOMOLOGADO",
            Self::MapeamentoMapaCriado => "MAPEAMENTO_MAPA_CRIADO",
            Self::MapeamentoMapaDisponibilizado => "MAPEAMENTO_MAPA_DISPONIBILIZADO",
            Self::MapeamentoMapaComSugestoes => "MAPEAMENTO_MAPA_COM_SUGESTOES",
            Self::MapeamentoMapaValidado => "MAPEAMENTO_MAPA_VALIDADO",
            Self::MapeamentoMapaHomologado => "MAPEAMENTO_MAPA_HOMOLOGADO",
            Self::RevisaoCadastroEmAndamento => "REVISAO_CADASTRO_EM_ANDAMENTO",
            Self::RevisaoCadastroDisponibilizada => "REVISAO_CADASTRO_DISPONIBILIZADA",
            Self::RevisaoCadastroHomologada => "REVISAO_CADASTRO_HOMOLOGADA",
            Self::RevisaoMapaAjustado => "REVISAO_MAPA_AJUSTADO",
            Self::RevisaoMapaDisponibilizado => "REVISAO_MAPA_DISPONIBILIZADO",
            Self::RevisaoMapaComSugestoes => "REVISAO_MAPA_COM_SUGESTOES",
            Self::RevisaoMapaValidado => "REVISAO_MAPA_VALIDADO",
            Self::RevisaoMapaHomologado => "REVISAO_MAPA_HOMOLOGADO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::TODAS
            .into_iter()
            .find(|situacao| situacao.as_str() == value)
    }

    /// Splits the state into its process type and phase.
    ///
    /// Returns `None` for `NaoIniciado`, which belongs to no phase yet.
    pub fn etapa(self) -> Option<(TipoProcesso, Etapa)> {
        use Etapa::*;
        use TipoProcesso::{Mapeamento, Revisao};
        let pair = match self {
            Self::NaoIniciado => return None,
            Self::MapeamentoCadastroEmAndamento => (Mapeamento, CadastroEmAndamento),
            Self::MapeamentoCadastroDisponibilizado => (Mapeamento, CadastroDisponibilizado),
            Self::MapeamentoCadastroHomologado => (Mapeamento, CadastroHomologado),
            Self::MapeamentoMapaCriado => (Mapeamento, MapaCriado),
            Self::MapeamentoMapaDisponibilizado => (Mapeamento, MapaDisponibilizado),
            Self::MapeamentoMapaComSugestoes => (Mapeamento, MapaComSugestoes),
            Self::MapeamentoMapaValidado => (Mapeamento, MapaValidado),
            Self::MapeamentoMapaHomologado => (Mapeamento, MapaHomologado),
            Self::RevisaoCadastroEmAndamento => (Revisao, CadastroEmAndamento),
            Self::RevisaoCadastroDisponibilizada => (Revisao, CadastroDisponibilizado),
            Self::RevisaoCadastroHomologada => (Revisao, CadastroHomologado),
            Self::RevisaoMapaAjustado => (Revisao, MapaAjustado),
            Self::RevisaoMapaDisponibilizado => (Revisao, MapaDisponibilizado),
            Self::RevisaoMapaComSugestoes => (Revisao, MapaComSugestoes),
            Self::RevisaoMapaValidado => (Revisao, MapaValidado),
            Self::RevisaoMapaHomologado => (Revisao, MapaHomologado),
        };
        Some(pair)
    }

    /// Builds the concrete state for a process type and phase.
    ///
    /// Returns `None` when the combination does not exist.
    pub fn de(tipo: TipoProcesso, etapa: Etapa) -> Option<Self> {
        Self::TODAS
            .into_iter()
            .find(|situacao| situacao.etapa() == Some((tipo, etapa)))
    }

    /// Whether this state may appear in a process of type `tipo`.
    pub fn compativel_com(self, tipo: TipoProcesso) -> bool {
        match self.etapa() {
            None => true,
            Some((proprio, _)) => proprio == tipo,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self.etapa(), Some((_, Etapa::MapaHomologado)))
    }
}

/// One unit's workflow instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subprocesso {
    pub id: SubprocessoId,
    pub processo_id: ProcessoId,
    pub unidade: CodigoUnidade,
    pub mapa_id: MapaId,
    pub situacao: SituacaoSubprocesso,
    /// Cadastro stage deadline, epoch ms.
    pub data_limite_etapa1: i64,
    /// Set when the cadastro is made available for review.
    pub data_fim_etapa1: Option<i64>,
    /// Map stage deadline, set when the map is made available.
    pub data_limite_etapa2: Option<i64>,
    /// Set when the unit validates the map or presents suggestions.
    pub data_fim_etapa2: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::{Etapa, SituacaoSubprocesso};
    use crate::model::processo::TipoProcesso;

    #[test]
    fn storage_codes_round_trip_for_every_state() {
        for situacao in SituacaoSubprocesso::TODAS {
            assert_eq!(SituacaoSubprocesso::parse(situacao.as_str()), Some(situacao));
        }
        assert_eq!(SituacaoSubprocesso::parse("MAPA_CRIADO"), None);
    }

    #[test]
    fn phase_specific_states_exist_only_for_their_type() {
        assert_eq!(
            SituacaoSubprocesso::de(TipoProcesso::Mapeamento, Etapa::MapaAjustado),
            None
        );
        assert_eq!(
            SituacaoSubprocesso::de(TipoProcesso::Revisao, Etapa::MapaCriado),
            None
        );
        assert_eq!(
            SituacaoSubprocesso::de(TipoProcesso::Diagnostico, Etapa::CadastroEmAndamento),
            None
        );
        assert_eq!(
            SituacaoSubprocesso::de(TipoProcesso::Revisao, Etapa::CadastroHomologado),
            Some(SituacaoSubprocesso::RevisaoCadastroHomologada)
        );
    }

    #[test]
    fn not_started_is_compatible_with_any_type() {
        assert!(SituacaoSubprocesso::NaoIniciado.compativel_com(TipoProcesso::Revisao));
        assert!(!SituacaoSubprocesso::MapeamentoMapaCriado.compativel_com(TipoProcesso::Revisao));
        assert!(SituacaoSubprocesso::RevisaoMapaHomologado.is_terminal());
        assert!(!SituacaoSubprocesso::RevisaoMapaValidado.is_terminal());
    }
}
