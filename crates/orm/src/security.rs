//! Identifier validation for SQL injection prevention
//!
//! Values always travel as bound parameters. Identifiers (table and column
//! names) cannot be bound, so they are validated here before the compiler
//! quotes them into SQL text.

use crate::error::QueryError;

/// Characters allowed in SQL identifiers (alphanumeric, underscore)
const ALLOWED_IDENTIFIER_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_";

/// Longest identifier accepted (PostgreSQL limit)
const MAX_IDENTIFIER_LEN: usize = 63;

/// Validate that an identifier is safe for use in SQL
///
/// Accepts `column` or a single `table.column` qualifier. Each part must be
/// non-empty, at most 63 characters, ASCII alphanumeric or underscore, and
/// must not start with a digit.
pub fn validate_identifier(identifier: &str) -> Result<(), QueryError> {
    let parts: Vec<&str> = identifier.split('.').collect();
    if parts.len() > 2 {
        return Err(QueryError::InvalidIdentifier(format!(
            "'{}' has more than one qualifier",
            identifier
        )));
    }

    for part in parts {
        validate_part(identifier, part)?;
    }

    Ok(())
}

fn validate_part(identifier: &str, part: &str) -> Result<(), QueryError> {
    let Some(first) = part.chars().next() else {
        return Err(QueryError::InvalidIdentifier(format!(
            "'{}' contains an empty name",
            identifier
        )));
    };

    if part.len() > MAX_IDENTIFIER_LEN {
        return Err(QueryError::InvalidIdentifier(format!(
            "'{}' is too long (max {} characters)",
            identifier, MAX_IDENTIFIER_LEN
        )));
    }

    if let Some(c) = part.chars().find(|c| !ALLOWED_IDENTIFIER_CHARS.contains(*c)) {
        return Err(QueryError::InvalidIdentifier(format!(
            "'{}' contains invalid character '{}'",
            identifier, c
        )));
    }

    if first.is_ascii_digit() {
        return Err(QueryError::InvalidIdentifier(format!(
            "'{}' cannot start with a number",
            identifier
        )));
    }

    Ok(())
}

/// Escape `%`, `_` and `\` so a user-supplied value matches literally inside LIKE
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
