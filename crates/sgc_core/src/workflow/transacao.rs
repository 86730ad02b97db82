//! Unit-of-work wrapper shared by workflow and process operations.
//!
//! # Invariants
//! - One `BEGIN IMMEDIATE` transaction per call; the write lock is taken
//!   before any state is read.
//! - Emails are dispatched only after a successful commit.
//! - Errors roll back every write of the unit of work (transaction drop).

use crate::notify::{despachar, Email, Mailer};
use crate::repo::Repositorios;
use crate::workflow::error::WorkflowResult;
use log::{info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;

/// Runs `trabalho` in one immediate transaction and dispatches the emails it
/// returns after commit.
pub(crate) fn em_transacao<T, M, F>(
    conn: &Connection,
    mailer: &M,
    operacao: &str,
    trabalho: F,
) -> WorkflowResult<T>
where
    M: Mailer + ?Sized,
    F: FnOnce(&Repositorios<'_>) -> WorkflowResult<(T, Vec<Email>)>,
{
    let started_at = Instant::now();
    match executar(conn, trabalho) {
        Ok((valor, emails)) => {
            info!(
                "event=workflow_op module=workflow status=ok op={operacao} duration_ms={} emails={}",
                started_at.elapsed().as_millis(),
                emails.len()
            );
            despachar(mailer, &emails);
            Ok(valor)
        }
        Err(err) => {
            warn!(
                "event=workflow_op module=workflow status=error op={operacao} duration_ms={} status_code={} error={}",
                started_at.elapsed().as_millis(),
                err.http_status(),
                err
            );
            Err(err)
        }
    }
}

fn executar<T, F>(conn: &Connection, trabalho: F) -> WorkflowResult<(T, Vec<Email>)>
where
    F: FnOnce(&Repositorios<'_>) -> WorkflowResult<(T, Vec<Email>)>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let saida = trabalho(&Repositorios::sobre(&tx))?;
    tx.commit()?;
    Ok(saida)
}
