//! Unified error hierarchy for the DiskANN core.
//!
//! - [`DiskAnnError`] — top-level error type returned by every public entry point.
//! - [`HostError`] — errors surfaced by the [`crate::host::Host`] trait, wrapped
//!   transparently into [`DiskAnnError::Host`].
//!
//! The variant names track the error kinds enumerated in the design: `NotFound`,
//! `Invalid`, `Dimension`, `Exists`, `Version`, plus an internal-only
//! `RowNotFound` used to drive dangling-edge tolerance during search and delete.
//! `RowNotFound` never escapes the crate: every call site that can observe it
//! either recovers (search, delete) or maps it to a different public variant.

use thiserror::Error;

/// Errors returned by the host database abstraction.
#[derive(Debug, Error)]
pub enum HostError {
    /// The underlying `rusqlite` call failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A BLOB handle was used after its row was deleted or after `release_handles`.
    #[error("blob handle aborted; row {0} must be reopened")]
    HandleAborted(i64),
}

/// Top-level error type for the DiskANN core.
#[derive(Debug, Error)]
pub enum DiskAnnError {
    /// Host database I/O or SQL failure.
    #[error(transparent)]
    Host(#[from] HostError),

    /// Named index, or a row referenced by id, does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad argument: null, out of range, or a malformed identifier.
    #[error("invalid argument: {0}")]
    Invalid(String),

    /// Vector dimensionality does not match the index configuration.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    Dimension {
        /// Dimensions configured on the index.
        expected: u32,
        /// Dimensions of the vector supplied by the caller.
        actual: u32,
    },

    /// Index or vector id already exists.
    #[error("already exists: {0}")]
    Exists(String),

    /// The index's stored `format_version` is newer than this build supports.
    #[error("unsupported format version: stored {stored}, supported up to {supported}")]
    Version {
        /// Version recorded in the metadata table.
        stored: u32,
        /// Highest version this build can open.
        supported: u32,
    },

    /// Internal-only: a BLOB open hit a row that does not exist.
    ///
    /// Never returned from a public entry point; search and delete both catch
    /// this case and treat it as a dangling edge instead of propagating it.
    #[error("row not found")]
    RowNotFound,
}

impl From<rusqlite::Error> for DiskAnnError {
    fn from(e: rusqlite::Error) -> Self {
        DiskAnnError::Host(HostError::Sqlite(e))
    }
}

impl DiskAnnError {
    /// True if this error is the internal dangling-row sentinel.
    #[must_use]
    pub fn is_row_not_found(&self) -> bool {
        matches!(self, DiskAnnError::RowNotFound)
    }
}
