//! Runtime configuration for the workflow core.
//!
//! # Responsibility
//! - Hold the few settings the core needs (mail domain, logging, database).
//! - Read overrides from `SGC_*` environment variables.
//!
//! # Invariants
//! - A validated config has a non-blank mail domain without `@`.
//! - `log_dir`, when present, is absolute and `log_level` is one `init_logging`
//!   accepts.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "SGC_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "SGC_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "SGC_LOG_DIR";
pub const ENV_EMAIL_DOMAIN: &str = "SGC_EMAIL_DOMAIN";

const DEFAULT_EMAIL_DOMAIN: &str = "tre-pe.jus.br";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    BlankEmailDomain,
    InvalidEmailDomain(String),
    RelativeLogDir(PathBuf),
    UnsupportedLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankEmailDomain => write!(f, "email domain must not be blank"),
            Self::InvalidEmailDomain(value) => {
                write!(f, "email domain `{value}` must not contain `@` or spaces")
            }
            Self::RelativeLogDir(path) => {
                write!(f, "log dir must be an absolute path, got `{}`", path.display())
            }
            Self::UnsupportedLogLevel(level) => write!(f, "unsupported log level `{level}`"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SgcConfig {
    /// Domain appended to unit siglas to build mailboxes.
    pub email_domain: String,
    pub log_level: String,
    /// `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    /// `None` means an in-memory database.
    pub db_path: Option<PathBuf>,
}

impl Default for SgcConfig {
    fn default() -> Self {
        Self {
            email_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
            log_level: default_log_level().to_string(),
            log_dir: None,
            db_path: None,
        }
    }
}

impl SgcConfig {
    /// Builds a config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; blank values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let mut config = Self::default();
        if let Some(domain) = value(ENV_EMAIL_DOMAIN) {
            config.email_domain = domain;
        }
        if let Some(level) = value(ENV_LOG_LEVEL) {
            config.log_level = normalize_level(&level)
                .map_err(|_| ConfigError::UnsupportedLogLevel(level))?
                .to_string();
        }
        config.log_dir = value(ENV_LOG_DIR).map(PathBuf::from);
        config.db_path = value(ENV_DB_PATH).map(PathBuf::from);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let domain = self.email_domain.trim();
        if domain.is_empty() {
            return Err(ConfigError::BlankEmailDomain);
        }
        if domain.contains('@') || domain.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidEmailDomain(domain.to_string()));
        }
        if normalize_level(&self.log_level).is_err() {
            return Err(ConfigError::UnsupportedLogLevel(self.log_level.clone()));
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.clone()));
            }
        }
        Ok(())
    }
}
