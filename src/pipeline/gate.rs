//! Pre-execution allow-list for generated SQL.
//!
//! This is a keyword block-list, not a parser. Keywords match as raw substrings
//! anywhere in the statement, so `updated_at`, `created_at` or a literal such as
//! `'%update%'` are rejected as well.

use super::PipelineError;

pub const BLOCKED_KEYWORDS: [&str; 9] = [
    "drop", "delete", "insert", "update", "alter", "truncate", "create", "grant", "revoke",
];

pub fn check_select_only(sql: &str) -> Result<(), PipelineError> {
    let normalized = sql.trim().to_lowercase();

    if !normalized.starts_with("select") {
        return Err(PipelineError::RejectedQuery(
            "statement must start with SELECT".to_string(),
        ));
    }

    if let Some(keyword) = BLOCKED_KEYWORDS.iter().find(|kw| normalized.contains(*kw)) {
        return Err(PipelineError::RejectedQuery(format!(
            "statement contains blocked keyword '{}'",
            keyword
        )));
    }

    Ok(())
}
