//! On-disk node block layout (format V3) and the operations that read and
//! mutate a block buffer in place.
//!
//! A block is a fixed-size byte buffer (`config.block_size` bytes) holding
//! one node: its row id, its own vector, and up to `max_edges` neighbor
//! slots. The layout is:
//!
//! ```text
//! 0                 8        10       16
//! | row id (LE i64) | edges  | pad(6) | node vector (node_vector_bytes) | edge vectors... | edge metadata... |
//! ```
//!
//! Edge vector slots are packed contiguously starting right after the node
//! vector; edge metadata slots (reserved(4) | distance f32 LE(4) | target row
//! id i64 LE(8) = 16 bytes each) begin only after *all* vector slots (used or
//! not) — the two regions are not interleaved.
//!
//! Edge order is not a contract: insertion and pruning treat the edge array
//! as an unordered multiset up to `edge_count`.

/// Block layout arithmetic and in-place buffer operations.
pub mod ops;

pub use ops::NodeBlock;
