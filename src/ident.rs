//! Identifier validation for dynamically composed SQL.
//!
//! Every caller-supplied schema or index name that ends up concatenated into a
//! SQL string (table names cannot be bound as parameters) is checked against
//! this module before use. This is the core's only defense against SQL
//! injection through identifiers — every other value is passed through a bound
//! parameter.

use crate::error::DiskAnnError;

const MAX_IDENT_LEN: usize = 64;

/// Validates a database or index identifier against `[A-Za-z_][A-Za-z0-9_]{0,63}`.
///
/// # Errors
///
/// Returns [`DiskAnnError::Invalid`] if `ident` is empty, too long, starts with
/// a non-letter/underscore, or contains any character outside
/// `[A-Za-z0-9_]`.
pub fn validate_identifier(ident: &str) -> Result<(), DiskAnnError> {
    if ident.is_empty() || ident.len() > MAX_IDENT_LEN {
        return Err(DiskAnnError::Invalid(format!(
            "identifier length must be 1..={MAX_IDENT_LEN}, got {}",
            ident.len()
        )));
    }

    let mut chars = ident.chars();
    let first = chars.next().expect("non-empty checked above");
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(DiskAnnError::Invalid(format!(
            "identifier {ident:?} must start with a letter or underscore"
        )));
    }

    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DiskAnnError::Invalid(format!(
            "identifier {ident:?} must match [A-Za-z_][A-Za-z0-9_]*"
        )));
    }

    Ok(())
}

/// Quotes an already-validated identifier for interpolation into SQL as a
/// double-quoted SQL identifier.
///
/// # Panics
///
/// Debug-asserts that `ident` passes [`validate_identifier`]; callers must
/// validate before quoting.
#[must_use]
pub fn quote_identifier(ident: &str) -> String {
    debug_assert!(validate_identifier(ident).is_ok(), "unvalidated identifier quoted: {ident}");
    format!("\"{ident}\"")
}

/// Derives the shadow-table name for an index: `{index_name}_shadow`.
#[must_use]
pub fn shadow_table_name(index_name: &str) -> String {
    format!("{index_name}_shadow")
}

/// Derives the metadata-table name for an index: `{index_name}_metadata`.
#[must_use]
pub fn metadata_table_name(index_name: &str) -> String {
    format!("{index_name}_metadata")
}
