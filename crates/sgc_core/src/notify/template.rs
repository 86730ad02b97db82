//! `{{placeholder}}` rendering for alert and email texts.
//!
//! # Invariants
//! - Unknown placeholders are left untouched.
//! - Substituted values are inserted verbatim (no recursive expansion).

use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid placeholder regex")
});

/// Renders `template`, replacing each `{{name}}` with the matching value.
pub fn renderizar(template: &str, valores: &[(&str, &str)]) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| {
            let nome = &caps[1];
            valores
                .iter()
                .find(|(chave, _)| *chave == nome)
                .map(|(_, valor)| (*valor).to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Formats an epoch-ms deadline as `dd/mm/yyyy` (UTC).
pub fn formatar_data(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|data| data.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| epoch_ms.to_string())
}
