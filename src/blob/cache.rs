//! Bounded LRU cache of BLOB handles, keyed by row id.
//!
//! Entries are reference-counted (`Rc<RefCell<BlobHandle>>`) so a handle can
//! be shared between the cache's own LRU bookkeeping and an active search
//! context without the two fighting over ownership: eviction from the cache
//! only drops the cache's own reference, and the underlying handle stays
//! alive for as long as anyone else still holds a clone. This crate is
//! single-threaded per index handle, so `Rc`/`RefCell` are sufficient — no
//! `Arc`/`Mutex` needed.
//!
//! The LRU chain itself is two integer arrays (`prev`/`next`) over a fixed
//! slot vector, with a `HashMap<row_id, slot>`
//! standing in for the "array keyed by row id" — reaching for the standard
//! hash map here instead of hand-rolling a second open-addressed table
//! alongside [`crate::util::VisitedSet`] is the idiomatic choice when the
//! keys (row ids) are not bounded to a beam-sized range the way the visited
//! set's are.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::blob::handle::BlobHandle;
use crate::error::DiskAnnError;
use crate::host::Host;

const NIL: usize = usize::MAX;

struct Slot<'h, H: Host> {
    row_id: i64,
    handle: Rc<RefCell<BlobHandle<'h, H>>>,
    prev: usize,
    next: usize,
}

/// A fixed-capacity, reference-counted LRU cache of [`BlobHandle`]s.
pub struct BlobCache<'h, H: Host> {
    host: &'h H,
    table: String,
    block_size: usize,
    capacity: usize,
    slots: Vec<Option<Slot<'h, H>>>,
    index: HashMap<i64, usize>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    hits: u64,
    misses: u64,
}

impl<'h, H: Host> BlobCache<'h, H> {
    /// Builds a cache over `table`, holding up to `capacity` blocks of
    /// `block_size` bytes each.
    #[must_use]
    pub fn new(host: &'h H, table: &str, block_size: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        BlobCache {
            host,
            table: table.to_string(),
            block_size,
            capacity,
            slots: (0..capacity).map(|_| None).collect(),
            index: HashMap::with_capacity(capacity),
            free: (0..capacity).rev().collect(),
            head: NIL,
            tail: NIL,
            hits: 0,
            misses: 0,
        }
    }

    /// Cache hits observed so far.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Cache misses observed so far.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Returns a shared handle for `row_id`, opening it (in `writable` mode)
    /// and inserting it into the cache on a miss.
    ///
    /// A hit whose handle was released across a transaction boundary, or
    /// that was previously opened read-only but is now needed writable, is
    /// transparently reopened in place before being returned — otherwise a
    /// writer could silently inherit a stale or read-only handle and have
    /// its writes dropped by [`BlobHandle::flush`]'s read-only no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DiskAnnError::RowNotFound`] if `row_id` does not exist.
    pub fn get(&mut self, row_id: i64, writable: bool) -> Result<Rc<RefCell<BlobHandle<'h, H>>>, DiskAnnError> {
        if let Some(&slot) = self.index.get(&row_id) {
            self.hits += 1;
            self.promote(slot);
            let handle = Rc::clone(&self.slots[slot].as_ref().expect("indexed slot present").handle);
            {
                let mut h = handle.borrow_mut();
                if h.is_aborted() || (writable && !h.is_writable()) {
                    h.ensure_mode(writable)?;
                }
            }
            return Ok(handle);
        }

        self.misses += 1;
        let handle = BlobHandle::open(self.host, &self.table, row_id, writable, self.block_size)?;
        let handle = Rc::new(RefCell::new(handle));
        self.insert(row_id, Rc::clone(&handle));
        Ok(handle)
    }

    fn insert(&mut self, row_id: i64, handle: Rc<RefCell<BlobHandle<'h, H>>>) {
        let slot = self.free.pop().unwrap_or_else(|| self.evict_tail());
        self.slots[slot] = Some(Slot { row_id, handle, prev: NIL, next: NIL });
        self.index.insert(row_id, slot);
        self.push_front(slot);
    }

    fn evict_tail(&mut self) -> usize {
        let victim = self.tail;
        assert_ne!(victim, NIL, "evict_tail called on an empty cache");
        self.unlink(victim);
        let row_id = self.slots[victim].as_ref().expect("tail slot occupied").row_id;
        self.index.remove(&row_id);
        self.slots[victim] = None;
        victim
    }

    fn promote(&mut self, slot: usize) {
        if self.head == slot {
            return;
        }
        self.unlink(slot);
        self.push_front(slot);
    }

    fn push_front(&mut self, slot: usize) {
        let old_head = self.head;
        if let Some(s) = self.slots[slot].as_mut() {
            s.prev = NIL;
            s.next = old_head;
        }
        if old_head != NIL {
            self.slots[old_head].as_mut().expect("head slot occupied").prev = slot;
        }
        self.head = slot;
        if self.tail == NIL {
            self.tail = slot;
        }
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = {
            let s = self.slots[slot].as_ref().expect("unlink on occupied slot");
            (s.prev, s.next)
        };
        if prev != NIL {
            self.slots[prev].as_mut().expect("prev slot occupied").next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.slots[next].as_mut().expect("next slot occupied").prev = prev;
        } else {
            self.tail = prev;
        }
    }

    /// Closes every underlying host handle while preserving buffer
    /// contents, and marks each as aborted. Used when the caller needs to
    /// relinquish handles across a transaction boundary; the next
    /// `reload` on any surviving `Rc` clone reopens transparently.
    pub fn release_handles(&mut self) {
        for slot in &self.slots {
            if let Some(s) = slot {
                s.handle.borrow_mut().release();
            }
        }
    }

    /// Number of entries currently resident.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Configured maximum number of resident entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
