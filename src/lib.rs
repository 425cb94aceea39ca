//! # diskann-core
//!
//! A disk-resident approximate-nearest-neighbor graph index built atop an
//! embedded relational store.
//!
//! The index pages a Vamana/DiskANN-style graph in and out of a
//! host-provided incremental-BLOB table: each node's vector and bounded
//! adjacency list lives in one fixed-size block, addressed by row id. A
//! best-first beam search drives k-NN lookups; insertion discovers a new
//! vector's neighborhood via the same search and installs edges
//! bidirectionally under an angle-based (Robust Pruning) diversity test so
//! adjacency lists stay small without losing navigability.
//!
//! ## What this crate does not do
//!
//! Vector compression, multi-writer concurrency, graph repair on delete, and
//! update-in-place are all out of scope — see the module docs on
//! [`delete`] for why dangling edges are tolerated rather than repaired.
//! The host database engine and any SQL-facing virtual-table layer are
//! external collaborators; this crate only consumes the narrow [`host::Host`]
//! trait.
//!
//! ## Example
//!
//! ```rust
//! use diskann_core::{DiskAnnIndex, IndexConfig, Metric, RusqliteHost};
//!
//! let host = RusqliteHost::open_in_memory().unwrap();
//! let config = IndexConfig::new(4, Metric::L2).unwrap();
//! DiskAnnIndex::create(&host, "main", "demo", Some(config)).unwrap();
//!
//! let mut index = DiskAnnIndex::open(&host, "main", "demo").unwrap();
//! index.insert(&host, 1, &[1.0, 0.0, 0.0, 0.0]).unwrap();
//! index.insert(&host, 2, &[0.0, 1.0, 0.0, 0.0]).unwrap();
//!
//! let results = index.search(&host, &[1.0, 0.0, 0.0, 0.0], 1).unwrap();
//! assert_eq!(results[0].id, 1);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

/// Typed public entry points: create, open, insert, search, delete, drop, clear.
pub mod api;

/// On-disk node block layout and the operations that read and mutate a block in place.
pub mod block;

/// BLOB handle wrapper and the bounded, reference-counted LRU cache built on top of it.
pub mod blob;

/// Fixed-width little-endian integer and float codec for the block format.
pub mod codec;

/// Immutable per-index configuration.
pub mod config;

/// Back-edge cleanup and shadow-row removal for a deleted vector.
pub mod delete;

/// The unified error hierarchy returned by every public entry point.
pub mod error;

/// The narrow interface this crate requires of its embedded relational host, plus the `rusqlite` binding.
pub mod host;

/// Restricts caller-supplied names used in dynamic SQL to a safe identifier grammar.
pub mod ident;

/// Neighbor discovery and angle-based (Robust Pruning) bidirectional edge installation.
pub mod insert;

/// Create / open / drop / clear for an index's shadow and metadata tables.
pub mod lifecycle;

/// Distance kernels: squared L2, cosine, and negated dot product.
pub mod metric;

/// Best-first beam search over the on-disk graph.
pub mod search;

/// Sorted-buffer maintenance and the open-addressed visited-row-id set.
pub mod util;

pub use api::{DiskAnnIndex, SearchResult};
pub use config::IndexConfig;
pub use error::DiskAnnError;
pub use host::{Host, HostBlob, RusqliteHost};
pub use metric::Metric;

/// The crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version string.
///
/// # Example
///
/// ```rust
/// let version = diskann_core::version();
/// assert!(!version.is_empty());
/// ```
#[must_use]
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
