//! Process (campaign) model.
//!
//! # Invariants
//! - `situacao` only moves forward: CRIADO -> EM_ANDAMENTO -> FINALIZADO.
//! - `participantes` is frozen once the process leaves CRIADO.

use crate::model::unidade::CodigoUnidade;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ProcessoId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TipoProcesso {
    /// First competency mapping of the participating units.
    Mapeamento,
    /// Revision of an existing vigente map.
    Revisao,
    /// Competency diagnosis. Can be registered but has no workflow here.
    Diagnostico,
}

impl TipoProcesso {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mapeamento => "MAPEAMENTO",
            Self::Revisao => "REVISAO",
            Self::Diagnostico => "DIAGNOSTICO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "MAPEAMENTO" => Some(Self::Mapeamento),
            "REVISAO" => Some(Self::Revisao),
            "DIAGNOSTICO" => Some(Self::Diagnostico),
            _ => None,
        }
    }

    /// Whether participants need a vigente map before the process is created.
    pub fn exige_mapa_vigente(self) -> bool {
        matches!(self, Self::Revisao | Self::Diagnostico)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SituacaoProcesso {
    Criado,
    EmAndamento,
    Finalizado,
}

impl SituacaoProcesso {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Criado => "CRIADO",
            Self::EmAndamento => "EM_ANDAMENTO",
            Self::Finalizado => "FINALIZADO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CRIADO" => Some(Self::Criado),
            "EM_ANDAMENTO" => Some(Self::EmAndamento),
            "FINALIZADO" => Some(Self::Finalizado),
            _ => None,
        }
    }
}

/// One administrative campaign spanning many units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Processo {
    pub id: ProcessoId,
    pub descricao: String,
    pub tipo: TipoProcesso,
    pub situacao: SituacaoProcesso,
    /// Epoch ms.
    pub data_criacao: i64,
    /// Epoch ms; becomes the first-stage deadline of every subprocess.
    pub data_limite: i64,
    pub data_finalizacao: Option<i64>,
    /// Participating unit codes, ascending.
    pub participantes: Vec<CodigoUnidade>,
}
