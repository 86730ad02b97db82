//! Use-case services outside the subprocess state machine.
//!
//! # Responsibility
//! - Process lifecycle: creation, start fan-out, finalization fan-in.
//! - Cadastro and map content edits with their automatic transitions.
//!
//! # See also
//! - `crate::workflow` for reviewer actions on a single subprocess.

pub mod mapa_service;
pub mod processo_service;

pub use mapa_service::MapaService;
pub use processo_service::{AtualizarProcessoRequest, CriarProcessoRequest, ProcessoService};
