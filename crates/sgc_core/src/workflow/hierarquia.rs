//! Organizational hierarchy resolver.
//!
//! # Responsibility
//! - Hold the unit tree as an arena keyed by unit code.
//! - Answer parent / ancestor / descendant / subtree queries for routing and
//!   visibility.
//!
//! # Invariants
//! - Built trees are acyclic, every parent exists and there is exactly one
//!   root; violations are configuration errors.
//! - Child lists are sorted by unit code.

use crate::model::unidade::{CodigoUnidade, Unidade};
use std::collections::{HashMap, HashSet, VecDeque};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarquiaError {
    /// No unit without parent.
    SemRaiz,
    /// More than one unit without parent.
    MultiplasRaizes(Vec<CodigoUnidade>),
    /// A unit references a parent that does not exist.
    PaiInexistente {
        unidade: CodigoUnidade,
        pai: CodigoUnidade,
    },
    /// Following parents from this unit never reaches the root.
    Ciclo(CodigoUnidade),
}

impl Display for HierarquiaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SemRaiz => write!(f, "unit hierarchy has no root"),
            Self::MultiplasRaizes(raizes) => {
                write!(f, "unit hierarchy has multiple roots: {raizes:?}")
            }
            Self::PaiInexistente { unidade, pai } => {
                write!(f, "unit {unidade} references missing parent {pai}")
            }
            Self::Ciclo(unidade) => write!(f, "unit hierarchy has a cycle through {unidade}"),
        }
    }
}

impl Error for HierarquiaError {}

#[derive(Debug, Clone)]
struct No {
    unidade: Unidade,
    filhos: Vec<CodigoUnidade>,
}

/// Immutable snapshot of the unit tree.
#[derive(Debug, Clone)]
pub struct Hierarquia {
    nos: HashMap<CodigoUnidade, No>,
    raiz: CodigoUnidade,
}

impl Hierarquia {
    pub fn construir(unidades: Vec<Unidade>) -> Result<Self, HierarquiaError> {
        let mut nos: HashMap<CodigoUnidade, No> = unidades
            .into_iter()
            .map(|unidade| {
                (
                    unidade.codigo,
                    No {
                        unidade,
                        filhos: Vec::new(),
                    },
                )
            })
            .collect();

        let mut raizes = Vec::new();
        let mut arestas = Vec::new();
        for (codigo, no) in &nos {
            match no.unidade.unidade_superior {
                None => raizes.push(*codigo),
                Some(pai) if !nos.contains_key(&pai) => {
                    return Err(HierarquiaError::PaiInexistente {
                        unidade: *codigo,
                        pai,
                    })
                }
                Some(pai) => arestas.push((pai, *codigo)),
            }
        }
        raizes.sort_unstable();
        let raiz = match raizes.as_slice() {
            [] => return Err(HierarquiaError::SemRaiz),
            [unica] => *unica,
            _ => return Err(HierarquiaError::MultiplasRaizes(raizes)),
        };

        for (pai, filho) in arestas {
            if let Some(no) = nos.get_mut(&pai) {
                no.filhos.push(filho);
            }
        }
        for no in nos.values_mut() {
            no.filhos.sort_unstable();
        }

        let hierarquia = Self { nos, raiz };
        hierarquia.verificar_aciclica()?;
        Ok(hierarquia)
    }

    fn verificar_aciclica(&self) -> Result<(), HierarquiaError> {
        let alcancaveis = self.descendentes(self.raiz).len() + 1;
        if alcancaveis == self.nos.len() {
            return Ok(());
        }
        let mut fora: Vec<CodigoUnidade> = self
            .nos
            .keys()
            .copied()
            .filter(|codigo| *codigo != self.raiz && !self.esta_na_subarvore(*codigo, self.raiz))
            .collect();
        fora.sort_unstable();
        Err(HierarquiaError::Ciclo(fora.first().copied().unwrap_or(self.raiz)))
    }

    pub fn raiz(&self) -> CodigoUnidade {
        self.raiz
    }

    pub fn unidade(&self, codigo: CodigoUnidade) -> Option<&Unidade> {
        self.nos.get(&codigo).map(|no| &no.unidade)
    }

    pub fn sigla(&self, codigo: CodigoUnidade) -> Option<&str> {
        self.unidade(codigo).map(|unidade| unidade.sigla.as_str())
    }

    /// Parent of a unit; `None` for the root or unknown units.
    pub fn pai(&self, codigo: CodigoUnidade) -> Option<CodigoUnidade> {
        self.unidade(codigo)
            .and_then(|unidade| unidade.unidade_superior)
    }

    pub fn filhos_de(&self, codigo: CodigoUnidade) -> &[CodigoUnidade] {
        self.nos
            .get(&codigo)
            .map(|no| no.filhos.as_slice())
            .unwrap_or(&[])
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestrais(&self, codigo: CodigoUnidade) -> Vec<CodigoUnidade> {
        let mut ancestrais = Vec::new();
        let mut visitados = HashSet::from([codigo]);
        let mut atual = self.pai(codigo);
        while let Some(pai) = atual {
            if !visitados.insert(pai) {
                break;
            }
            ancestrais.push(pai);
            atual = self.pai(pai);
        }
        ancestrais
    }

    /// Transitive descendants in breadth-first order, excluding `codigo`.
    pub fn descendentes(&self, codigo: CodigoUnidade) -> Vec<CodigoUnidade> {
        let mut resultado = Vec::new();
        let mut visitados = HashSet::from([codigo]);
        let mut fila: VecDeque<CodigoUnidade> = self.filhos_de(codigo).iter().copied().collect();
        while let Some(atual) = fila.pop_front() {
            if !visitados.insert(atual) {
                continue;
            }
            resultado.push(atual);
            fila.extend(self.filhos_de(atual).iter().copied());
        }
        resultado
    }

    /// Whether `candidata` is `raiz` or one of its descendants.
    pub fn esta_na_subarvore(&self, candidata: CodigoUnidade, raiz: CodigoUnidade) -> bool {
        candidata == raiz || self.ancestrais(candidata).contains(&raiz)
    }
}
