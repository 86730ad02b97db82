//! Error taxonomy shared by workflow and process operations.
//!
//! # Invariants
//! - Every guard violation maps to exactly one HTTP-like status:
//!   404 / 403 / 409 / 422; storage and configuration faults map to 500.
//! - `Validation.details` keys are camelCase and list offending descriptions.

use crate::repo::RepoError;
use crate::workflow::hierarquia::HierarquiaError;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Itemized validation details: field -> offending descriptions.
pub type Detalhes = BTreeMap<String, Vec<String>>;

#[derive(Debug)]
pub enum WorkflowError {
    /// Entity id does not resolve.
    NotFound { entidade: &'static str, id: String },
    /// Role or active-unit rule failed.
    Forbidden(String),
    /// Current state is not an allowed source state.
    StateConflict(String),
    /// Content-completeness or input rule failed.
    Validation { message: String, details: Detalhes },
    /// Organizational tree is inconsistent.
    Hierarchy(HierarquiaError),
    /// Repository-level failure.
    Repo(RepoError),
}

impl WorkflowError {
    pub(crate) fn not_found(entidade: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entidade,
            id: id.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: Detalhes::new(),
        }
    }

    pub(crate) fn validation_with(
        message: impl Into<String>,
        campo: &str,
        itens: Vec<String>,
    ) -> Self {
        let mut details = Detalhes::new();
        details.insert(campo.to_string(), itens);
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    /// HTTP status the REST boundary should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Forbidden(_) => 403,
            Self::StateConflict(_) => 409,
            Self::Validation { .. } => 422,
            Self::Hierarchy(_) | Self::Repo(_) => 500,
        }
    }

    /// Validation details, when this is a validation failure.
    pub fn details(&self) -> Option<&Detalhes> {
        match self {
            Self::Validation { details, .. } => Some(details),
            _ => None,
        }
    }
}

impl Display for WorkflowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entidade, id } => write!(f, "{entidade} not found: {id}"),
            Self::Forbidden(message) => write!(f, "forbidden: {message}"),
            Self::StateConflict(message) => write!(f, "state conflict: {message}"),
            Self::Validation { message, details } => {
                write!(f, "validation failed: {message}")?;
                for (campo, itens) in details {
                    write!(f, "; {campo}=[{}]", itens.join(", "))?;
                }
                Ok(())
            }
            Self::Hierarchy(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WorkflowError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Hierarchy(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for WorkflowError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entidade, id } => Self::NotFound { entidade, id },
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for WorkflowError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

impl From<HierarquiaError> for WorkflowError {
    fn from(value: HierarquiaError) -> Self {
        Self::Hierarchy(value)
    }
}
