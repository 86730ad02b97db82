//! Domain model for competency-mapping processes.
//!
//! # Responsibility
//! - Define canonical data structures used by workflow and process services.
//! - Own the closed enumerations (profiles, process types, subprocess states)
//!   together with their stable storage codes.
//!
//! # Invariants
//! - Workflow entities are identified by stable UUIDs; units by their
//!   natural organizational code.
//! - Storage codes (`as_str`/`parse`) never change once persisted.

pub mod mapa;
pub mod processo;
pub mod registro;
pub mod subprocesso;
pub mod unidade;
