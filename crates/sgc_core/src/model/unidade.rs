//! Organizational units and acting users.
//!
//! # Responsibility
//! - Describe the unit tree nodes used for routing and visibility.
//! - Carry the explicit acting-user context passed to every workflow call.
//!
//! # Invariants
//! - A unit has at most one parent; exactly one unit in the tree has none.
//! - `UsuarioAtivo` is immutable for the duration of a call.

use serde::{Deserialize, Serialize};

/// Natural organizational code of a unit.
pub type CodigoUnidade = i64;

/// Kind of organizational unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TipoUnidade {
    /// Leaf-level unit with its own staff.
    Operacional,
    /// Grouping unit with no staff of its own; never a process participant.
    Intermediaria,
    /// Unit that is operational and also supervises subordinates.
    Interoperacional,
    /// Top of the hierarchy, where administrators sit.
    Raiz,
}

impl TipoUnidade {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Operacional => "OPERACIONAL",
            Self::Intermediaria => "INTERMEDIARIA",
            Self::Interoperacional => "INTEROPERACIONAL",
            Self::Raiz => "RAIZ",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OPERACIONAL" => Some(Self::Operacional),
            "INTERMEDIARIA" => Some(Self::Intermediaria),
            "INTEROPERACIONAL" => Some(Self::Interoperacional),
            "RAIZ" => Some(Self::Raiz),
            _ => None,
        }
    }
}

/// One node of the organizational tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unidade {
    pub codigo: CodigoUnidade,
    /// Short unique acronym, also used to derive the unit mailbox.
    pub sigla: String,
    pub nome: String,
    pub tipo: TipoUnidade,
    /// `None` only for the root unit.
    pub unidade_superior: Option<CodigoUnidade>,
}

impl Unidade {
    pub fn new(
        codigo: CodigoUnidade,
        sigla: impl Into<String>,
        nome: impl Into<String>,
        tipo: TipoUnidade,
        unidade_superior: Option<CodigoUnidade>,
    ) -> Self {
        Self {
            codigo,
            sigla: sigla.into(),
            nome: nome.into(),
            tipo,
            unidade_superior,
        }
    }

    /// Whether this unit may take part in a process.
    pub fn pode_participar(&self) -> bool {
        self.tipo != TipoUnidade::Intermediaria
    }
}

/// Person responsible for a unit (receives process-level notifications).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Responsavel {
    pub unidade: CodigoUnidade,
    /// Voter-registration style identifier used as login.
    pub titulo: String,
    pub nome: String,
    pub email: Option<String>,
}

/// Access profile of the acting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Perfil {
    Admin,
    Gestor,
    Chefe,
    Servidor,
}

impl Perfil {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Gestor => "GESTOR",
            Self::Chefe => "CHEFE",
            Self::Servidor => "SERVIDOR",
        }
    }
}

/// Acting user for one call: identity, active profile and active unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsuarioAtivo {
    pub titulo: String,
    pub perfil: Perfil,
    pub unidade_ativa: CodigoUnidade,
}

impl UsuarioAtivo {
    pub fn new(titulo: impl Into<String>, perfil: Perfil, unidade_ativa: CodigoUnidade) -> Self {
        Self {
            titulo: titulo.into(),
            perfil,
            unidade_ativa,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.perfil == Perfil::Admin
    }
}
