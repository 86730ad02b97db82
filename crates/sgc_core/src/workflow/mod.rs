//! Subprocess workflow: transition table, guards, routing and side effects.
//!
//! # Responsibility
//! - Own the closed set of subprocess states and the actions between them.
//! - Route approvals up and down the unit hierarchy.
//! - Compare working maps with vigente maps for revisions.
//!
//! # Invariants
//! - Pure helpers (`state_machine`, `hierarquia`, `impacto`, `acesso`) never
//!   touch storage.
//! - Every write goes through `transacao::em_transacao`.

pub mod acesso;
pub mod bloco;
pub mod efeitos;
pub mod engine;
pub mod error;
pub mod hierarquia;
pub mod impacto;
pub mod state_machine;

pub(crate) mod contexto;
pub(crate) mod transacao;

pub use bloco::{ItemBloco, RelatorioBloco, ResultadoUnidade};
pub use engine::WorkflowEngine;
pub use error::{Detalhes, WorkflowError, WorkflowResult};
pub use hierarquia::{Hierarquia, HierarquiaError};
pub use impacto::{AtividadeImpactada, CompetenciaImpactada, ImpactoMapa, TipoImpacto};
pub use state_machine::{transicao_permitida, Acao};
