//! Authorization rules per action and hierarchy-scoped visibility.
//!
//! # Invariants
//! - ADMIN bypasses the role list but not the active-unit rule.
//! - Homologation and map-building actions run only once the subprocess has
//!   climbed to the root unit.
//! - Actions with `exige_localizacao == false` are ADMIN-only and may be run
//!   from any unit.

use crate::model::processo::TipoProcesso;
use crate::model::subprocesso::SituacaoSubprocesso;
use crate::model::unidade::{CodigoUnidade, Perfil, UsuarioAtivo};
use crate::workflow::hierarquia::Hierarquia;
use crate::workflow::state_machine::Acao;

/// Who may run an action and from where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegraAcesso {
    pub perfis: &'static [Perfil],
    /// Whether the actor's active unit must own the subprocess.
    pub exige_localizacao: bool,
    /// Whether the owning unit must be the root of the hierarchy.
    pub exige_raiz: bool,
}

pub fn regra(acao: Acao) -> RegraAcesso {
    const CHEFE: &[Perfil] = &[Perfil::Chefe];
    const GESTOR: &[Perfil] = &[Perfil::Gestor];
    const REVISOR: &[Perfil] = &[Perfil::Admin, Perfil::Gestor];
    const ADMIN: &[Perfil] = &[Perfil::Admin];

    let (perfis, exige_localizacao, exige_raiz) = match acao {
        Acao::EditarCadastro
        | Acao::DisponibilizarCadastro
        | Acao::ApresentarSugestoes
        | Acao::ValidarMapa => (CHEFE, true, false),
        Acao::DevolverCadastro | Acao::DevolverValidacao => (REVISOR, true, false),
        Acao::AceitarCadastro | Acao::AceitarValidacao => (GESTOR, true, false),
        Acao::HomologarCadastro
        | Acao::HomologarValidacao
        | Acao::EditarMapa
        | Acao::AjustarMapa
        | Acao::DisponibilizarMapa => (ADMIN, true, true),
        Acao::ReabrirCadastro | Acao::ReabrirRevisaoCadastro | Acao::AlterarDataLimite => {
            (ADMIN, false, false)
        }
    };
    RegraAcesso {
        perfis,
        exige_localizacao,
        exige_raiz,
    }
}

/// Whether the actor's profile may run `acao` at all.
pub fn perfil_permitido(acao: Acao, ator: &UsuarioAtivo) -> bool {
    ator.is_admin() || regra(acao).perfis.contains(&ator.perfil)
}

/// Checks role and active unit for a write action.
///
/// `localizacao` is the unit that currently owns the subprocess and `raiz`
/// the root of the hierarchy.
pub fn autorizar(
    acao: Acao,
    ator: &UsuarioAtivo,
    localizacao: CodigoUnidade,
    raiz: CodigoUnidade,
) -> Result<(), String> {
    let regra = regra(acao);
    if !regra.exige_localizacao {
        if ator.is_admin() {
            return Ok(());
        }
        return Err(format!(
            "{} requires profile ADMIN, got {}",
            acao.as_str(),
            ator.perfil.as_str()
        ));
    }

    if !perfil_permitido(acao, ator) {
        let esperados: Vec<&str> = regra.perfis.iter().map(|perfil| perfil.as_str()).collect();
        return Err(format!(
            "{} requires profile {}, got {}",
            acao.as_str(),
            esperados.join("|"),
            ator.perfil.as_str()
        ));
    }
    if ator.unidade_ativa != localizacao {
        return Err(format!(
            "{} requires active unit {}, got {}",
            acao.as_str(),
            localizacao,
            ator.unidade_ativa
        ));
    }
    if regra.exige_raiz && localizacao != raiz {
        return Err(format!(
            "{} requires the subprocess at root unit {}, it is at {}",
            acao.as_str(),
            raiz,
            localizacao
        ));
    }
    Ok(())
}

/// Whether `ator` may read data owned by `unidade`.
pub fn pode_visualizar(ator: &UsuarioAtivo, unidade: CodigoUnidade, hierarquia: &Hierarquia) -> bool {
    match ator.perfil {
        Perfil::Admin => true,
        Perfil::Gestor => hierarquia.esta_na_subarvore(unidade, ator.unidade_ativa),
        Perfil::Chefe | Perfil::Servidor => ator.unidade_ativa == unidade,
    }
}

/// Profile/state gate for reading the impact projection of a revision.
pub fn pode_verificar_impactos(
    ator: &UsuarioAtivo,
    tipo: TipoProcesso,
    situacao: SituacaoSubprocesso,
) -> bool {
    use SituacaoSubprocesso::*;

    if tipo != TipoProcesso::Revisao {
        return false;
    }
    match ator.perfil {
        Perfil::Admin => matches!(
            situacao,
            NaoIniciado
                | RevisaoCadastroEmAndamento
                | RevisaoCadastroDisponibilizada
                | RevisaoCadastroHomologada
                | RevisaoMapaAjustado
        ),
        Perfil::Gestor => situacao == RevisaoCadastroDisponibilizada,
        Perfil::Chefe => matches!(situacao, NaoIniciado | RevisaoCadastroEmAndamento),
        Perfil::Servidor => false,
    }
}
