//! Outbound notification seam.
//!
//! # Responsibility
//! - Define the `Mailer` transport contract used after a workflow commit.
//! - Dispatch collected emails best-effort, logging each failure.
//!
//! # Invariants
//! - A dispatch failure never propagates to the caller of a workflow
//!   operation; state has already been committed when emails are sent.
//! - Log lines carry recipient and subject only, never the body.

use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod template;

/// One outbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub destinatario: String,
    pub assunto: String,
    pub corpo: String,
}

/// Errors reported by a mail transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// Transport unavailable or timed out.
    Transport(String),
    /// Transport refused the recipient.
    Rejected { destinatario: String, motivo: String },
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "mail transport failed: {message}"),
            Self::Rejected {
                destinatario,
                motivo,
            } => write!(f, "recipient {destinatario} rejected: {motivo}"),
        }
    }
}

impl Error for NotifyError {}

/// Mail transport.
pub trait Mailer {
    fn enviar(&self, email: &Email) -> Result<(), NotifyError>;
}

impl<M: Mailer + ?Sized> Mailer for &M {
    fn enviar(&self, email: &Email) -> Result<(), NotifyError> {
        (**self).enviar(email)
    }
}

/// Default transport: writes one log line per email and never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn enviar(&self, email: &Email) -> Result<(), NotifyError> {
        info!(
            "event=email_send module=notify status=ok to={} subject={}",
            email.destinatario, email.assunto
        );
        Ok(())
    }
}

/// Sends every email, returning how many were accepted by the transport.
pub fn despachar<M: Mailer + ?Sized>(mailer: &M, emails: &[Email]) -> usize {
    let mut enviados = 0;
    for email in emails {
        match mailer.enviar(email) {
            Ok(()) => enviados += 1,
            Err(err) => warn!(
                "event=email_send module=notify status=error to={} subject={} error={}",
                email.destinatario, email.assunto, err
            ),
        }
    }
    enviados
}

/// Builds the institutional mailbox of a unit.
pub fn caixa_da_unidade(sigla: &str, dominio: &str) -> String {
    format!("{}@{}", sigla.to_ascii_lowercase(), dominio)
}
