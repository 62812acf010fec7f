//! Identifier validation and quoting.
//!
//! Table names cannot be bound as parameters, so every identifier that ends
//! up in generated SQL goes through [`validate_identifier`] first. Table
//! prefixes come from configuration and get the stricter [`validate_prefix`].

use crate::error::{MigrateError, Result};

/// Maximum identifier length (PostgreSQL truncates at 63 bytes).
const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Maximum table prefix length; leaves room for the longest table name.
const MAX_PREFIX_LENGTH: usize = 40;

/// Validate an identifier for security issues.
///
/// Rejects empty identifiers, null bytes and overlong names.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Validate a table prefix: ASCII letters, digits and underscores only,
/// not starting with a digit. An empty prefix is allowed.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.len() > MAX_PREFIX_LENGTH {
        return Err(MigrateError::Config(format!(
            "Table prefix is longer than {} characters: {:?}",
            MAX_PREFIX_LENGTH, prefix
        )));
    }

    if prefix.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(MigrateError::Config(format!(
            "Table prefix cannot start with a digit: {:?}",
            prefix
        )));
    }

    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(MigrateError::Config(format!(
            "Table prefix may only contain letters, digits and '_': {:?}",
            prefix
        )));
    }

    Ok(())
}

/// Quote with double quotes (PostgreSQL, SQLite).
pub fn quote_double(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote with backticks (MySQL).
pub fn quote_backtick(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
