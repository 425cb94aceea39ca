//! The sole concrete [`super::Host`] binding, built directly on
//! `rusqlite::Connection`.
//!
//! Uses `rusqlite`'s `blob` feature for incremental BLOB I/O
//! (`Connection::blob_open`, `Blob::reopen`) and raw `SAVEPOINT` /
//! `RELEASE` / `ROLLBACK TO` statements for transaction nesting —
//! `rusqlite::Savepoint` itself requires `&mut Connection`, which does not
//! fit a trait whose methods take `&self`, so the core talks to SQLite's
//! savepoint machinery the same way it talks to everything else here: text
//! SQL over a shared connection.

use std::cell::{Cell, RefCell};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rusqlite::{Connection, DatabaseName, OptionalExtension};

use super::{Host, HostBlob};
use crate::error::HostError;
use crate::ident::quote_identifier;

/// A [`Host`] backed by a single `rusqlite::Connection`.
///
/// Not `Sync`/`Send`-shared across threads by design (one handle, one
/// thread at a time); the random-number generator and savepoint-name stack
/// use `Cell`/`RefCell` purely to keep `Host`'s methods `&self` rather than
/// `&mut self`, not to support concurrent access.
pub struct RusqliteHost {
    conn: Connection,
    savepoints: RefCell<Vec<String>>,
    savepoint_seq: Cell<u64>,
    rng: RefCell<ChaCha8Rng>,
}

impl RusqliteHost {
    /// Wraps an already-open connection.
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        RusqliteHost {
            conn,
            savepoints: RefCell::new(Vec::new()),
            savepoint_seq: Cell::new(0),
            rng: RefCell::new(ChaCha8Rng::from_entropy()),
        }
    }

    /// Opens (creating if absent) a file-backed database.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Sqlite`] if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HostError> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    /// Opens a private in-memory database, primarily for tests.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Sqlite`] if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self, HostError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    /// Borrows the underlying connection, for host-level operations this
    /// crate does not mediate (e.g. the vtab layer's own bookkeeping).
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Host for RusqliteHost {
    type Blob<'a> = RusqliteBlob<'a>;

    fn table_exists(&self, table: &str) -> Result<bool, HostError> {
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        Ok(exists)
    }

    fn create_shadow_table(&self, table: &str) -> Result<(), HostError> {
        let sql = format!(
            "CREATE TABLE {} (id INTEGER PRIMARY KEY, data BLOB NOT NULL)",
            quote_identifier(table)
        );
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    fn create_metadata_table(&self, table: &str) -> Result<(), HostError> {
        let sql = format!(
            "CREATE TABLE {} (key TEXT PRIMARY KEY, value INTEGER NOT NULL)",
            quote_identifier(table)
        );
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    fn drop_table_if_exists(&self, table: &str) -> Result<(), HostError> {
        let sql = format!("DROP TABLE IF EXISTS {}", quote_identifier(table));
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    fn clear_table(&self, table: &str) -> Result<(), HostError> {
        let sql = format!("DELETE FROM {}", quote_identifier(table));
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    fn metadata_get(&self, table: &str, key: &str) -> Result<Option<i64>, HostError> {
        let sql = format!("SELECT value FROM {} WHERE key = ?1", quote_identifier(table));
        let value = self.conn.query_row(&sql, [key], |row| row.get(0)).optional()?;
        Ok(value)
    }

    fn metadata_set(&self, table: &str, key: &str, value: i64) -> Result<(), HostError> {
        let sql = format!(
            "INSERT INTO {} (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            quote_identifier(table)
        );
        self.conn.execute(&sql, rusqlite::params![key, value])?;
        Ok(())
    }

    fn row_exists(&self, table: &str, id: i64) -> Result<bool, HostError> {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?1", quote_identifier(table));
        let exists = self.conn.query_row(&sql, [id], |_| Ok(())).optional()?.is_some();
        Ok(exists)
    }

    fn insert_zero_row(&self, table: &str, id: i64, size: usize) -> Result<(), HostError> {
        let sql = format!(
            "INSERT INTO {} (id, data) VALUES (?1, zeroblob(?2))",
            quote_identifier(table)
        );
        self.conn.execute(&sql, rusqlite::params![id, size as i64])?;
        Ok(())
    }

    fn delete_row(&self, table: &str, id: i64) -> Result<u64, HostError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", quote_identifier(table));
        let changes = self.conn.execute(&sql, [id])?;
        Ok(changes as u64)
    }

    fn random_row_id(&self, table: &str) -> Result<Option<i64>, HostError> {
        let count_sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let count: i64 = self.conn.query_row(&count_sql, [], |row| row.get(0))?;
        if count == 0 {
            return Ok(None);
        }
        let offset = self.rng.borrow_mut().gen_range(0..count);
        let sql = format!("SELECT id FROM {} LIMIT 1 OFFSET ?1", quote_identifier(table));
        let id: i64 = self.conn.query_row(&sql, [offset], |row| row.get(0))?;
        Ok(Some(id))
    }

    fn random_i64(&self) -> i64 {
        self.rng.borrow_mut().gen()
    }

    fn open_blob(&self, table: &str, row_id: i64, writable: bool) -> Result<Self::Blob<'_>, HostError> {
        let blob = self.conn.blob_open(DatabaseName::Main, table, "data", row_id, !writable)?;
        Ok(RusqliteBlob { blob })
    }

    fn begin_savepoint(&self) -> Result<bool, HostError> {
        let seq = self.savepoint_seq.get();
        let name = format!("diskann_sp{seq}");
        match self.conn.execute_batch(&format!("SAVEPOINT {name}")) {
            Ok(()) => {
                self.savepoint_seq.set(seq + 1);
                self.savepoints.borrow_mut().push(name);
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    fn release_savepoint(&self) -> Result<(), HostError> {
        let name = self
            .savepoints
            .borrow_mut()
            .pop()
            .expect("release_savepoint called without a matching begin_savepoint");
        self.conn.execute_batch(&format!("RELEASE {name}"))?;
        Ok(())
    }

    fn rollback_savepoint(&self) -> Result<(), HostError> {
        let name = self
            .savepoints
            .borrow_mut()
            .pop()
            .expect("rollback_savepoint called without a matching begin_savepoint");
        self.conn.execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}"))?;
        Ok(())
    }
}

/// One incremental BLOB handle borrowed from a [`RusqliteHost`].
pub struct RusqliteBlob<'a> {
    blob: rusqlite::blob::Blob<'a>,
}

impl HostBlob for RusqliteBlob<'_> {
    fn reopen(&mut self, row_id: i64) -> Result<(), HostError> {
        self.blob.reopen(row_id)?;
        Ok(())
    }

    fn read_at(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), HostError> {
        self.blob.seek(SeekFrom::Start(offset as u64))?;
        self.blob.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, offset: usize, buf: &[u8]) -> Result<(), HostError> {
        self.blob.seek(SeekFrom::Start(offset as u64))?;
        self.blob.write_all(buf)?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.blob.size() as usize
    }
}

impl From<std::io::Error> for HostError {
    fn from(e: std::io::Error) -> Self {
        HostError::Sqlite(rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
    }
}
