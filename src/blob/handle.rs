//! A single BLOB handle wrapper: one host BLOB handle plus a page-sized
//! buffer, supporting rebinding to a different row without closing.

use crate::error::DiskAnnError;
use crate::host::{Host, HostBlob};

/// Owns one host BLOB handle and its page buffer.
///
/// `aborted` tracks handles force-closed across a transaction boundary;
/// the next [`BlobHandle::reload`] transparently reopens rather than
/// erroring.
pub struct BlobHandle<'h, H: Host> {
    host: &'h H,
    table: String,
    blob: Option<H::Blob<'h>>,
    buf: Vec<u8>,
    row_id: Option<i64>,
    writable: bool,
    initialized: bool,
    aborted: bool,
}

impl<'h, H: Host> BlobHandle<'h, H> {
    /// Opens a handle bound to `row_id` and immediately loads its contents.
    ///
    /// # Errors
    ///
    /// Returns [`DiskAnnError::RowNotFound`] if `row_id` does not exist in
    /// `table`.
    pub fn open(host: &'h H, table: &str, row_id: i64, writable: bool, block_size: usize) -> Result<Self, DiskAnnError> {
        let mut handle = BlobHandle {
            host,
            table: table.to_string(),
            blob: None,
            buf: vec![0u8; block_size],
            row_id: None,
            writable,
            initialized: false,
            aborted: true,
        };
        handle.reload(row_id)?;
        Ok(handle)
    }

    /// Rebinds to `row_id` if different from the currently bound row (or if
    /// the handle was previously aborted), then reads the full block into
    /// the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`DiskAnnError::RowNotFound`] if `row_id` does not exist.
    /// This is the dangling-edge signal callers in search and delete catch
    /// and recover from.
    pub fn reload(&mut self, row_id: i64) -> Result<(), DiskAnnError> {
        if self.aborted || self.blob.is_none() {
            let blob = self
                .host
                .open_blob(&self.table, row_id, self.writable)
                .map_err(|_| DiskAnnError::RowNotFound)?;
            self.blob = Some(blob);
            self.aborted = false;
        } else if self.row_id != Some(row_id) {
            if self.blob.as_mut().expect("checked Some above").reopen(row_id).is_err() {
                self.aborted = true;
                self.blob = None;
                return Err(DiskAnnError::RowNotFound);
            }
        }

        self.blob
            .as_mut()
            .expect("blob present after (re)open above")
            .read_at(0, &mut self.buf)?;
        self.row_id = Some(row_id);
        self.initialized = true;
        Ok(())
    }

    /// Writes the buffer back to the host. No-op unless the handle is
    /// writable and has completed at least one successful load.
    ///
    /// # Errors
    ///
    /// Returns a host I/O error if the write fails.
    pub fn flush(&mut self) -> Result<(), DiskAnnError> {
        if !self.writable || !self.initialized {
            return Ok(());
        }
        let buf = self.buf.clone();
        self.blob
            .as_mut()
            .ok_or(DiskAnnError::RowNotFound)?
            .write_at(0, &buf)?;
        Ok(())
    }

    /// Releases the underlying host handle (without discarding the buffer
    /// contents), marking this wrapper as aborted. Used when relinquishing
    /// handles across a transaction boundary.
    pub fn release(&mut self) {
        self.blob = None;
        self.aborted = true;
    }

    /// Ensures the handle is open, not aborted, and opened in at least
    /// `writable` mode, reopening the underlying host handle if necessary.
    ///
    /// A handle opened read-only is reopened writable in place when a
    /// writer needs it; a handle already writable is left alone even if
    /// only read access is requested, since downgrading would discard a
    /// capability a concurrent caller may still rely on. An aborted handle
    /// is always reopened against its last bound row id.
    ///
    /// # Errors
    ///
    /// Returns [`DiskAnnError::RowNotFound`] if the bound row no longer
    /// exists, or if called on a handle that has never been bound.
    pub fn ensure_mode(&mut self, writable: bool) -> Result<(), DiskAnnError> {
        let row_id = self.row_id.ok_or(DiskAnnError::RowNotFound)?;
        if writable && !self.writable {
            self.writable = true;
            self.aborted = true;
        }
        if self.aborted {
            self.reload(row_id)?;
        }
        Ok(())
    }

    /// The row id currently bound to this handle, if any.
    #[must_use]
    pub fn row_id(&self) -> Option<i64> {
        self.row_id
    }

    /// Read-only view of the page buffer.
    #[must_use]
    pub fn buffer(&self) -> &[u8] {
        &self.buf
    }

    /// Mutable view of the page buffer, for in-place block mutation.
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// True if this handle was opened for writing.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// True if the underlying host handle was released and must be
    /// reopened on next use.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}
