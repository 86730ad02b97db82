//! Audit and notification records written by workflow transitions.
//!
//! # Invariants
//! - `Movimentacao` rows are append-only.
//! - `Analise` rows are append-only but purged when a cadastro or map cycle
//!   is submitted again.
//! - `Alerta` rows are write-once.

use crate::model::processo::ProcessoId;
use crate::model::subprocesso::SubprocessoId;
use crate::model::unidade::CodigoUnidade;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit record of one transition between units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movimentacao {
    pub id: Uuid,
    pub processo_id: ProcessoId,
    pub subprocesso_id: SubprocessoId,
    /// `None` for the movement recorded when the process starts.
    pub unidade_origem: Option<CodigoUnidade>,
    pub unidade_destino: CodigoUnidade,
    pub descricao: String,
    pub usuario_titulo: String,
    pub data_hora: i64,
}

/// Stage an analysis refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TipoAnalise {
    Cadastro,
    Validacao,
}

impl TipoAnalise {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cadastro => "CADASTRO",
            Self::Validacao => "VALIDACAO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CADASTRO" => Some(Self::Cadastro),
            "VALIDACAO" => Some(Self::Validacao),
            _ => None,
        }
    }
}

/// Reviewer decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcaoAnalise {
    Aceite,
    Devolucao,
    Homologacao,
}

impl AcaoAnalise {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aceite => "ACEITE",
            Self::Devolucao => "DEVOLUCAO",
            Self::Homologacao => "HOMOLOGACAO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ACEITE" => Some(Self::Aceite),
            "DEVOLUCAO" => Some(Self::Devolucao),
            "HOMOLOGACAO" => Some(Self::Homologacao),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analise {
    pub id: Uuid,
    pub subprocesso_id: SubprocessoId,
    pub tipo: TipoAnalise,
    pub acao: AcaoAnalise,
    /// Unit where the reviewer sat when deciding.
    pub unidade: CodigoUnidade,
    pub usuario_titulo: String,
    pub observacoes: Option<String>,
    pub data_hora: i64,
}

/// Persistent notice for a unit (and optionally one user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alerta {
    pub id: Uuid,
    pub processo_id: ProcessoId,
    pub unidade_origem: Option<CodigoUnidade>,
    pub unidade_destino: CodigoUnidade,
    pub usuario_destino: Option<String>,
    pub descricao: String,
    pub data_hora: i64,
}
