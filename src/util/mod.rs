//! Small, allocation-conscious primitives shared by the search and insert
//! paths: sorted-buffer maintenance and an open-addressed visited set.

/// Bounded ascending-sorted buffer maintenance.
pub mod sorted;
/// Open-addressed visited-row-id set.
pub mod visited;

pub use sorted::{distance_insert_idx, shift_delete, shift_insert};
pub use visited::VisitedSet;
