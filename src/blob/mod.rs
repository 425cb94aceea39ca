//! BLOB handle wrapper and LRU cache: the paging layer between
//! node blocks on disk and the in-memory buffers the search/insert/delete
//! algorithms mutate directly.

/// Bounded, reference-counted LRU cache of BLOB handles.
pub mod cache;
/// A single BLOB handle plus its page buffer.
pub mod handle;

pub use cache::BlobCache;
pub use handle::BlobHandle;
