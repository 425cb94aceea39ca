//! Typed public entry points: [`DiskAnnIndex`], the handle every
//! caller drives create/open/insert/search/delete/drop/clear through.
//!
//! A plain struct wrapping a storage backend with `Result`-returning
//! methods, built around a borrowed-host model: the handle does not own the
//! database connection, only strings, configuration, and a [`BlobCache`] of
//! handles borrowed from it.

use std::cell::Cell;

use crate::blob::BlobCache;
use crate::block::NodeBlock;
use crate::config::IndexConfig;
use crate::delete;
use crate::error::DiskAnnError;
use crate::ident::{metadata_table_name, shadow_table_name};
use crate::insert;
use crate::lifecycle;
use crate::metric::Metric;
use crate::search::beam_search;
use crate::host::Host;

/// Default number of BLOB handles a [`DiskAnnIndex`] keeps warm in its cache.
///
/// Chosen as a multiple of the default beam width so a single search or
/// insert rarely evicts its own in-flight candidates; callers with larger
/// beams should expect more cache churn rather than incorrect results — the
/// cache's reference counting keeps correctness independent of size.
const DEFAULT_CACHE_CAPACITY: usize = 256;

/// One result row from [`DiskAnnIndex::search`] or
/// [`DiskAnnIndex::search_filtered`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    /// The matched vector's row id.
    pub id: i64,
    /// Distance from the query vector under the index's configured metric.
    pub distance: f32,
}

/// Per-call batch-mode state: an outer savepoint held open across
/// several inserts/deletes, which suppresses their own per-call savepoints.
struct BatchState {
    /// Whether `begin_batch` actually managed to start the outer savepoint
    /// (it may not, if invoked from an already-nested host statement).
    opened_savepoint: bool,
}

/// A handle to one open DiskANN index.
///
/// Borrows `host` for its entire lifetime: [`DiskAnnIndex::open`] and
/// [`DiskAnnIndex::create`] do not take ownership of the connection, and
/// every subsequent method re-accepts the same `host` reference purely so
/// the borrow checker ties the handle's BLOB cache and the operations that
/// drive it to one consistent lifetime — not because the value itself can
/// change between calls.
pub struct DiskAnnIndex<'h, H: Host> {
    shadow_table: String,
    metadata_table: String,
    config: IndexConfig,
    block: NodeBlock,
    cache: BlobCache<'h, H>,
    reads: Cell<u64>,
    writes: Cell<u64>,
    batch: Option<BatchState>,
}

impl<'h, H: Host> DiskAnnIndex<'h, H> {
    /// Creates a new index's shadow and metadata tables and persists
    /// `config`.
    ///
    /// # Errors
    ///
    /// See [`lifecycle::create`].
    pub fn create(host: &H, schema: &str, name: &str, config: Option<IndexConfig>) -> Result<(), DiskAnnError> {
        lifecycle::create(host, schema, name, config)
    }

    /// Opens an existing index.
    ///
    /// # Errors
    ///
    /// See [`lifecycle::open_config`].
    pub fn open(host: &'h H, schema: &str, name: &str) -> Result<Self, DiskAnnError> {
        let config = lifecycle::open_config(host, schema, name)?;
        let block = NodeBlock::new(config.dimensions, config.max_edges());
        let shadow_table = shadow_table_name(name);
        let metadata_table = metadata_table_name(name);
        let cache = BlobCache::new(host, &shadow_table, config.block_size as usize, DEFAULT_CACHE_CAPACITY);
        log::debug!("opened index {schema}.{name}: dims={}, metric={}", config.dimensions, config.metric);
        Ok(DiskAnnIndex {
            shadow_table,
            metadata_table,
            config,
            block,
            cache,
            reads: Cell::new(0),
            writes: Cell::new(0),
            batch: None,
        })
    }

    /// Releases this handle's owned state. Never touches `host`, which the
    /// caller continues to own.
    pub fn close(self) {}

    /// Drops `{name}_shadow` and `{name}_metadata`.
    ///
    /// # Errors
    ///
    /// See [`lifecycle::drop_index`].
    pub fn drop(host: &H, schema: &str, name: &str) -> Result<(), DiskAnnError> {
        lifecycle::drop_index(host, schema, name)
    }

    /// Deletes every row from this index's shadow table, preserving
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns a host I/O error if the delete fails.
    pub fn clear(&mut self, host: &'h H) -> Result<(), DiskAnnError> {
        lifecycle::clear(host, &self.shadow_table)?;
        self.cache = BlobCache::new(host, &self.shadow_table, self.config.block_size as usize, DEFAULT_CACHE_CAPACITY);
        Ok(())
    }

    /// This index's configuration, as loaded at `open` or supplied at
    /// `create`.
    #[must_use]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Total BLOB reads served (cache hits + misses) since this handle was
    /// opened.
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads.get()
    }

    /// Total BLOB flushes issued since this handle was opened.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.get()
    }

    /// Opens an outer savepoint (if the host permits one) that subsequent
    /// `insert`/`delete` calls join instead of opening their own.
    ///
    /// # Errors
    ///
    /// Returns a host I/O error if the savepoint statement itself fails.
    pub fn begin_batch(&mut self, host: &H) -> Result<(), DiskAnnError> {
        let opened_savepoint = host.begin_savepoint()?;
        self.batch = Some(BatchState { opened_savepoint });
        Ok(())
    }

    /// Ends batch mode, releasing or rolling back the outer savepoint
    /// opened by [`DiskAnnIndex::begin_batch`].
    ///
    /// # Errors
    ///
    /// Returns a host I/O error if the release/rollback statement fails.
    pub fn end_batch(&mut self, host: &H, commit: bool) -> Result<(), DiskAnnError> {
        let Some(state) = self.batch.take() else {
            return Ok(());
        };
        if state.opened_savepoint {
            if commit {
                host.release_savepoint()?;
            } else {
                host.rollback_savepoint()?;
            }
        }
        Ok(())
    }

    /// Inserts `vector` under `id`, using the index's configured insert beam
    /// width.
    ///
    /// # Errors
    ///
    /// Returns [`DiskAnnError::Dimension`] if `vector.len() != dimensions`,
    /// [`DiskAnnError::Exists`] if `id` already has a row, or a host I/O
    /// error. Validation happens before any state change.
    pub fn insert(&mut self, host: &'h H, id: i64, vector: &[f32]) -> Result<(), DiskAnnError> {
        self.insert_with_beam_width(host, id, vector, None)
    }

    /// As [`DiskAnnIndex::insert`], but overrides `insert_list_size` for
    /// this call only; the override is never persisted.
    ///
    /// # Errors
    ///
    /// See [`DiskAnnIndex::insert`].
    pub fn insert_with_beam_width(
        &mut self,
        host: &'h H,
        id: i64,
        vector: &[f32],
        beam_width: Option<u32>,
    ) -> Result<(), DiskAnnError> {
        if vector.len() as u32 != self.config.dimensions {
            return Err(DiskAnnError::Dimension { expected: self.config.dimensions, actual: vector.len() as u32 });
        }
        if host.row_exists(&self.shadow_table, id)? {
            return Err(DiskAnnError::Exists(format!("id {id}")));
        }

        let beam_width = beam_width.unwrap_or(self.config.insert_list_size) as usize;
        let alpha = self.config.pruning_alpha();

        self.with_savepoint(host, |this| {
            insert::insert_vector(
                host,
                &this.shadow_table,
                &this.block,
                this.config.metric,
                alpha,
                beam_width,
                &mut this.cache,
                this.config.block_size as usize,
                id,
                vector,
            )
        })?;
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    /// Finds the `k` nearest vectors to `query`.
    ///
    /// Returns an empty vector (not an error) when the index has no rows.
    ///
    /// # Errors
    ///
    /// Returns [`DiskAnnError::Dimension`] if `query.len() != dimensions`, or
    /// a host I/O error.
    pub fn search(&mut self, host: &'h H, query: &[f32], k: usize) -> Result<Vec<SearchResult>, DiskAnnError> {
        self.search_filtered(host, query, k, None)
    }

    /// As [`DiskAnnIndex::search`], gated by an optional per-row predicate.
    /// `None` is equivalent to [`DiskAnnIndex::search`]. When a
    /// filter is supplied, the beam is widened to
    /// `max(search_list_size * 2, k * 4)` to compensate for the reduced
    /// acceptance rate.
    ///
    /// # Errors
    ///
    /// See [`DiskAnnIndex::search`].
    pub fn search_filtered(
        &mut self,
        host: &'h H,
        query: &[f32],
        k: usize,
        filter: Option<&dyn Fn(i64) -> bool>,
    ) -> Result<Vec<SearchResult>, DiskAnnError> {
        if query.len() as u32 != self.config.dimensions {
            return Err(DiskAnnError::Dimension { expected: self.config.dimensions, actual: query.len() as u32 });
        }
        let Some(start_row) = host.random_row_id(&self.shadow_table)? else {
            return Ok(Vec::new());
        };

        let max_candidates = if filter.is_some() {
            (self.config.search_list_size as usize * 2).max(k * 4)
        } else {
            self.config.search_list_size as usize
        };

        let outcome = beam_search(
            &mut self.cache,
            &self.block,
            self.config.metric,
            query,
            start_row,
            max_candidates,
            k,
            false,
            filter,
        )?;
        self.reads.set(self.reads.get() + outcome.visited_list.len() as u64);

        Ok(outcome.top_results.into_iter().map(|c| SearchResult { id: c.row_id, distance: c.distance }).collect())
    }

    /// Deletes `id`, stripping back-edges from every neighbor it pointed
    /// to. No graph repair is performed.
    ///
    /// # Errors
    ///
    /// Returns [`DiskAnnError::NotFound`] if `id` is absent, or a host I/O
    /// error.
    pub fn delete(&mut self, host: &'h H, id: i64) -> Result<(), DiskAnnError> {
        self.cache.release_handles();
        self.with_savepoint(host, |this| {
            delete::delete(host, &this.shadow_table, &this.block, this.config.block_size as usize, id)
        })?;
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    /// The derived shadow-table name this index reads and writes.
    #[must_use]
    pub fn shadow_table(&self) -> &str {
        &self.shadow_table
    }

    /// The derived metadata-table name this index's configuration is stored in.
    #[must_use]
    pub fn metadata_table(&self) -> &str {
        &self.metadata_table
    }

    /// Runs `f` inside a savepoint, unless batch mode is active, in which
    /// case `f` joins the already-open outer savepoint instead.
    fn with_savepoint<T>(
        &mut self,
        host: &H,
        f: impl FnOnce(&mut Self) -> Result<T, DiskAnnError>,
    ) -> Result<T, DiskAnnError> {
        let opened = if self.batch.is_some() {
            false
        } else {
            host.begin_savepoint().inspect(|started| {
                if !*started {
                    log::debug!("savepoint could not be started; relying on host's enclosing transaction");
                }
            })?
        };

        match f(self) {
            Ok(value) => {
                if opened {
                    host.release_savepoint()?;
                }
                Ok(value)
            }
            Err(err) => {
                if opened {
                    host.rollback_savepoint()?;
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RusqliteHost;

    fn cfg(dims: u32) -> IndexConfig {
        IndexConfig::with_params(dims, Metric::L2, 8, 20, 20, 4096, 1300).unwrap()
    }

    #[test]
    fn empty_index_search_returns_no_results() {
        let host = RusqliteHost::open_in_memory().unwrap();
        DiskAnnIndex::create(&host, "main", "idx", Some(cfg(3))).unwrap();
        let mut idx = DiskAnnIndex::open(&host, "main", "idx").unwrap();
        let results = idx.search(&host, &[1.0, 0.0, 0.0], 10).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn single_vector_exact_match() {
        let host = RusqliteHost::open_in_memory().unwrap();
        DiskAnnIndex::create(&host, "main", "idx", Some(cfg(3))).unwrap();
        let mut idx = DiskAnnIndex::open(&host, "main", "idx").unwrap();
        idx.insert(&host, 1, &[1.0, 0.0, 0.0]).unwrap();
        let results = idx.search(&host, &[1.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 1);
        assert_eq!(results[0].distance, 0.0);
    }

    #[test]
    fn dimension_mismatch_rejected_before_mutation() {
        let host = RusqliteHost::open_in_memory().unwrap();
        DiskAnnIndex::create(&host, "main", "idx", Some(cfg(3))).unwrap();
        let mut idx = DiskAnnIndex::open(&host, "main", "idx").unwrap();
        let err = idx.insert(&host, 1, &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, DiskAnnError::Dimension { expected: 3, actual: 2 }));
        assert!(!host.row_exists(idx.shadow_table(), 1).unwrap());
    }

    #[test]
    fn duplicate_id_returns_exists_without_changing_row_count() {
        let host = RusqliteHost::open_in_memory().unwrap();
        DiskAnnIndex::create(&host, "main", "idx", Some(cfg(3))).unwrap();
        let mut idx = DiskAnnIndex::open(&host, "main", "idx").unwrap();
        idx.insert(&host, 1, &[1.0, 0.0, 0.0]).unwrap();
        let err = idx.insert(&host, 1, &[0.0, 1.0, 0.0]).unwrap_err();
        assert!(matches!(err, DiskAnnError::Exists(_)));
        let count: i64 = host
            .connection()
            .query_row(&format!("SELECT COUNT(*) FROM {}", idx.shadow_table()), [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn delete_then_search_excludes_deleted_id() {
        let host = RusqliteHost::open_in_memory().unwrap();
        DiskAnnIndex::create(&host, "main", "idx", Some(cfg(3))).unwrap();
        let mut idx = DiskAnnIndex::open(&host, "main", "idx").unwrap();
        idx.insert(&host, 1, &[1.0, 0.0, 0.0]).unwrap();
        idx.insert(&host, 2, &[0.0, 1.0, 0.0]).unwrap();
        idx.insert(&host, 3, &[0.0, 0.0, 1.0]).unwrap();
        idx.insert(&host, 4, &[1.0, 1.0, 0.0]).unwrap();

        idx.delete(&host, 2).unwrap();
        let results = idx.search(&host, &[0.0, 1.0, 0.0], 4).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.id != 2));
    }

    #[test]
    fn delete_missing_id_is_not_found() {
        let host = RusqliteHost::open_in_memory().unwrap();
        DiskAnnIndex::create(&host, "main", "idx", Some(cfg(3))).unwrap();
        let mut idx = DiskAnnIndex::open(&host, "main", "idx").unwrap();
        let err = idx.delete(&host, 99).unwrap_err();
        assert!(matches!(err, DiskAnnError::NotFound(_)));
    }

    #[test]
    fn filtered_accept_all_matches_unfiltered_search() {
        let host = RusqliteHost::open_in_memory().unwrap();
        DiskAnnIndex::create(&host, "main", "idx", Some(cfg(2))).unwrap();
        let mut idx = DiskAnnIndex::open(&host, "main", "idx").unwrap();
        for i in 0..50i64 {
            let angle = i as f32 * 0.12;
            idx.insert(&host, i + 1, &[angle.cos(), angle.sin()]).unwrap();
        }
        let query = [0.3, 0.9];
        let plain = idx.search(&host, &query, 5).unwrap();
        let accept_all = |_: i64| true;
        let filtered = idx.search_filtered(&host, &query, 5, Some(&accept_all)).unwrap();
        let plain_ids: Vec<i64> = plain.iter().map(|r| r.id).collect();
        let filtered_ids: Vec<i64> = filtered.iter().map(|r| r.id).collect();
        assert_eq!(plain_ids, filtered_ids);
    }

    #[test]
    fn batch_mode_suppresses_per_call_savepoints() {
        let host = RusqliteHost::open_in_memory().unwrap();
        DiskAnnIndex::create(&host, "main", "idx", Some(cfg(2))).unwrap();
        let mut idx = DiskAnnIndex::open(&host, "main", "idx").unwrap();
        idx.begin_batch(&host).unwrap();
        idx.insert(&host, 1, &[0.0, 0.0]).unwrap();
        idx.insert(&host, 2, &[1.0, 0.0]).unwrap();
        idx.end_batch(&host, true).unwrap();
        assert!(host.row_exists(idx.shadow_table(), 1).unwrap());
        assert!(host.row_exists(idx.shadow_table(), 2).unwrap());
    }
}
