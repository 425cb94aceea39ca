//! The narrow interface this crate requires of its embedded relational host:
//! parameterized SQL execution, `sqlite_master` introspection, incremental
//! BLOB I/O, savepoint nesting, and a random-integer source.
//!
//! Keeping this as a trait rather than hard-wiring `rusqlite` calls
//! throughout the core follows the same seam the surrounding corpus draws
//! between pure algorithm state and its storage backend: everything above
//! this module only ever talks to `Host`/`HostBlob`, never to
//! `rusqlite::Connection` directly.

mod rusqlite_host;

pub use rusqlite_host::RusqliteHost;

use crate::error::HostError;

/// The host database operations the core needs, independent of any
/// particular SQL engine binding.
///
/// A single `Host` is used from one thread at a time (single-threaded
/// per index handle); implementations may use interior mutability to
/// satisfy `&self` methods without requiring callers to hold `&mut`.
pub trait Host {
    /// A handle to one open incremental BLOB, borrowing this host.
    type Blob<'a>: HostBlob
    where
        Self: 'a;

    /// True if a table named `table` exists (via `sqlite_master` or
    /// equivalent introspection).
    fn table_exists(&self, table: &str) -> Result<bool, HostError>;

    /// Creates the shadow table `(id INTEGER PRIMARY KEY, data BLOB NOT NULL)`.
    fn create_shadow_table(&self, table: &str) -> Result<(), HostError>;

    /// Creates the metadata table `(key TEXT PRIMARY KEY, value INTEGER NOT NULL)`.
    fn create_metadata_table(&self, table: &str) -> Result<(), HostError>;

    /// Drops `table` if it exists; a no-op if it does not.
    fn drop_table_if_exists(&self, table: &str) -> Result<(), HostError>;

    /// Deletes all rows from `table`, preserving its schema.
    fn clear_table(&self, table: &str) -> Result<(), HostError>;

    /// Reads one integer value from the metadata table, or `None` if `key`
    /// is absent.
    fn metadata_get(&self, table: &str, key: &str) -> Result<Option<i64>, HostError>;

    /// Upserts `key = value` into the metadata table.
    fn metadata_set(&self, table: &str, key: &str, value: i64) -> Result<(), HostError>;

    /// True if a row `id` is present in `table`.
    fn row_exists(&self, table: &str, id: i64) -> Result<bool, HostError>;

    /// Inserts a new zero-filled BLOB row of `size` bytes at `id`.
    ///
    /// Returns `HostError::Sqlite` wrapping a constraint-violation error if
    /// `id` already exists; callers translate that into
    /// [`crate::error::DiskAnnError::Exists`].
    fn insert_zero_row(&self, table: &str, id: i64, size: usize) -> Result<(), HostError>;

    /// Deletes the row `id` from `table`. Returns the number of rows
    /// affected (0 or 1).
    fn delete_row(&self, table: &str, id: i64) -> Result<u64, HostError>;

    /// Picks a uniformly random existing row id from `table`, or `None` if
    /// the table is empty.
    fn random_row_id(&self, table: &str) -> Result<Option<i64>, HostError>;

    /// A random `i64`, used as a fallback entropy source where a row
    /// selection is not applicable.
    fn random_i64(&self) -> i64;

    /// Opens an incremental BLOB handle onto `table.data` at `row_id`.
    fn open_blob(&self, table: &str, row_id: i64, writable: bool) -> Result<Self::Blob<'_>, HostError>;

    /// Attempts to start a nested savepoint. Returns `Ok(true)` if one was
    /// started (the caller must later `release_savepoint` or
    /// `rollback_savepoint`), or `Ok(false)` if the host is already
    /// mid-statement and cannot start one — the caller then relies on the
    /// host's enclosing implicit transaction.
    fn begin_savepoint(&self) -> Result<bool, HostError>;

    /// Releases (commits) the most recently started savepoint.
    fn release_savepoint(&self) -> Result<(), HostError>;

    /// Rolls back to, and releases, the most recently started savepoint.
    fn rollback_savepoint(&self) -> Result<(), HostError>;
}

/// One incremental BLOB handle, borrowed from a [`Host`].
pub trait HostBlob {
    /// Rebinds this handle to a different row without closing the
    /// underlying host handle, per the wrapper's reopen optimization.
    fn reopen(&mut self, row_id: i64) -> Result<(), HostError>;

    /// Reads `buf.len()` bytes starting at byte `offset` into `buf`.
    fn read_at(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), HostError>;

    /// Writes `buf` starting at byte `offset`.
    fn write_at(&mut self, offset: usize, buf: &[u8]) -> Result<(), HostError>;

    /// Total size in bytes of the underlying BLOB.
    fn len(&self) -> usize;

    /// True if the BLOB is zero-length (never the case for a block-sized row).
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
