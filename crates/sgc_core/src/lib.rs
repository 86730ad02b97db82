//! Core domain logic for SGC, the competency-mapping workflow.
//! This crate is the single source of truth for workflow invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;
pub mod workflow;

pub use config::{ConfigError, SgcConfig};
pub use db::{open_configured, open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, LogTarget, LoggingError};
pub use model::processo::{Processo, ProcessoId, SituacaoProcesso, TipoProcesso};
pub use model::subprocesso::{SituacaoSubprocesso, Subprocesso, SubprocessoId};
pub use model::unidade::{CodigoUnidade, Perfil, TipoUnidade, Unidade, UsuarioAtivo};
pub use notify::{Email, LogMailer, Mailer, NotifyError};
pub use repo::{RepoError, RepoResult};
pub use service::{AtualizarProcessoRequest, CriarProcessoRequest, MapaService, ProcessoService};
pub use workflow::{
    ImpactoMapa, RelatorioBloco, ResultadoUnidade, WorkflowEngine, WorkflowError, WorkflowResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
