//! Competency map model.
//!
//! # Responsibility
//! - Represent a map's activities, knowledge items and competencies as an
//!   owned snapshot (`MapaConteudo`) keyed by id.
//! - Provide the completeness checks the workflow needs before a cadastro or
//!   map is made available.
//!
//! # Invariants
//! - Activity <-> competency links are stored only on the competency side
//!   (`Competencia::atividades`); the reverse direction is computed on demand.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type MapaId = Uuid;
pub type AtividadeId = Uuid;
pub type ConhecimentoId = Uuid;
pub type CompetenciaId = Uuid;

/// Map header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapa {
    pub id: MapaId,
    /// Suggestions presented by the unit during validation.
    pub sugestoes: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conhecimento {
    pub id: ConhecimentoId,
    pub atividade_id: AtividadeId,
    pub descricao: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Atividade {
    pub id: AtividadeId,
    pub mapa_id: MapaId,
    pub descricao: String,
    pub conhecimentos: Vec<Conhecimento>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competencia {
    pub id: CompetenciaId,
    pub mapa_id: MapaId,
    pub descricao: String,
    /// Linked activity ids, all from the same map.
    pub atividades: Vec<AtividadeId>,
}

/// Full content of one map, loaded in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapaConteudo {
    pub atividades: Vec<Atividade>,
    pub competencias: Vec<Competencia>,
}

impl MapaConteudo {
    /// Competencies linked to one activity.
    pub fn competencias_de(&self, atividade_id: AtividadeId) -> impl Iterator<Item = &Competencia> {
        self.competencias
            .iter()
            .filter(move |competencia| competencia.atividades.contains(&atividade_id))
    }

    /// Descriptions of activities with no knowledge item.
    pub fn atividades_sem_conhecimento(&self) -> Vec<String> {
        self.atividades
            .iter()
            .filter(|atividade| atividade.conhecimentos.is_empty())
            .map(|atividade| atividade.descricao.clone())
            .collect()
    }

    /// Descriptions of activities not linked to any competency.
    pub fn atividades_sem_competencia(&self) -> Vec<String> {
        self.atividades
            .iter()
            .filter(|atividade| self.competencias_de(atividade.id).next().is_none())
            .map(|atividade| atividade.descricao.clone())
            .collect()
    }

    /// Descriptions of competencies without a linked activity of this map.
    pub fn competencias_sem_atividade(&self) -> Vec<String> {
        self.competencias
            .iter()
            .filter(|competencia| {
                !competencia
                    .atividades
                    .iter()
                    .any(|id| self.atividades.iter().any(|atividade| atividade.id == *id))
            })
            .map(|competencia| competencia.descricao.clone())
            .collect()
    }
}
