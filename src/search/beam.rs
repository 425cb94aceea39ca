//! Best-first beam search over the on-disk graph.
//!
//! Drives the bounded candidate queue and top-K result buffer. Conceptually,
//! a "node record" (`row_id`, `visited_flag`,
//! `next_in_visited_list`, `optional_blob_handle`) is realized here as two
//! separate vectors rather than one linked structure carrying a visited
//! flag: [`Candidate`] for entries still in the candidate queue (always
//! unvisited — once popped, an entry moves out of this vector entirely) and
//! [`VisitedNode`] for entries that have already been expanded. Both are
//! append/remove-at-front `Vec`s rather than an actual singly-linked list;
//! the beam width is small enough (tens to low hundreds of entries) that the
//! asymptotic difference never matters, and the invariants (each row id
//! appears at most once across {candidates, visited_list}; the visited set
//! contains exactly the visited list's row ids) hold identically either way.

use std::cell::RefCell;
use std::rc::Rc;

use crate::blob::{BlobCache, BlobHandle};
use crate::block::NodeBlock;
use crate::error::DiskAnnError;
use crate::host::Host;
use crate::metric::Metric;
use crate::util::{distance_insert_idx, shift_insert, VisitedSet};

/// One entry in the candidate queue or the top-K result buffer: a row id and
/// its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// The node's row id.
    pub row_id: i64,
    /// Distance from the query vector under the index's configured metric.
    pub distance: f32,
}

/// A node that has already been popped from the candidate queue and
/// expanded. Retains its own vector and a shared handle to its BLOB so that
/// callers driving a writable beam search (insert) can mutate it afterward
/// without re-reading it from disk.
pub struct VisitedNode<'h, H: Host> {
    /// The node's row id.
    pub row_id: i64,
    /// Distance from the query vector.
    pub distance: f32,
    /// The node's own vector, decoded once when it was visited.
    pub vector: Vec<f32>,
    /// Shared BLOB handle for this node. In writable mode this is the same
    /// `Rc` the cache holds, kept alive here via reference counting even if
    /// the cache itself later evicts its own entry.
    pub blob: Rc<RefCell<BlobHandle<'h, H>>>,
}

/// The result of one beam search: the top-K result buffer plus the full
/// visited list (consumed by insert for its two edge-installation phases;
/// search and delete discard it).
pub struct SearchOutcome<'h, H: Host> {
    /// Ascending-sorted, size-capped result buffer.
    pub top_results: Vec<Candidate>,
    /// Every node visited during this traversal, in visitation order.
    pub visited_list: Vec<VisitedNode<'h, H>>,
}

/// Runs one best-first beam search starting at `start_row`.
///
/// `cache` supplies BLOB handles for every row touched; in `writable` mode
/// the handle retained on each [`VisitedNode`] is the same reference-counted
/// handle the cache holds, so mutations insert performs after this call
/// returns are visible the next time anything reloads that row.
///
/// The optional `filter` gates entry into `top_results` only (the
/// *Filtered-DiskANN* property): rejected rows are still visited and
/// still contribute their outgoing edges to the traversal, they just never
/// make it into the returned result set.
///
/// # Errors
///
/// Propagates any host I/O error other than a dangling-edge "row not found",
/// which is caught internally and treated as an edge to silently drop.
#[allow(clippy::too_many_arguments)]
pub fn beam_search<'h, H: Host>(
    cache: &mut BlobCache<'h, H>,
    block: &NodeBlock,
    metric: Metric,
    query: &[f32],
    start_row: i64,
    max_candidates: usize,
    k: usize,
    writable: bool,
    filter: Option<&dyn Fn(i64) -> bool>,
) -> Result<SearchOutcome<'h, H>, DiskAnnError> {
    let mut candidates: Vec<Candidate> = Vec::with_capacity(max_candidates.min(64));
    let mut visited_list: Vec<VisitedNode<'h, H>> = Vec::new();
    let mut visited_set = VisitedSet::with_capacity_hint(max_candidates);
    let mut top_results: Vec<Candidate> = Vec::with_capacity(k.min(64));

    let start_handle = cache.get(start_row, writable)?;
    let d0 = {
        let h = start_handle.borrow();
        metric.distance(query, &block.vector(h.buffer()))
    };
    drop(start_handle);
    try_enqueue(&mut candidates, max_candidates, start_row, d0);

    while !candidates.is_empty() {
        let cur = candidates.remove(0);

        let handle = match cache.get(cur.row_id, writable) {
            Ok(h) => h,
            Err(e) if e.is_row_not_found() => {
                log::debug!("beam search: dangling edge to row {}, dropping", cur.row_id);
                continue;
            }
            Err(e) => return Err(e),
        };

        let edges: Vec<(i64, Vec<f32>)> = {
            let h = handle.borrow();
            let buf = h.buffer();
            (0..block.edge_count(buf) as u32)
                .map(|i| {
                    let (target, _distance, vector) = block.edge(buf, i);
                    (target, vector)
                })
                .collect()
        };
        let vector = {
            let h = handle.borrow();
            block.vector(h.buffer())
        };

        visited_set.insert(cur.row_id);
        if filter.map_or(true, |f| f(cur.row_id)) {
            try_enqueue(&mut top_results, k, cur.row_id, cur.distance);
        }
        visited_list.push(VisitedNode { row_id: cur.row_id, distance: cur.distance, vector, blob: handle });

        for (target, edge_vector) in edges {
            if visited_set.contains(target) || candidates.iter().any(|c| c.row_id == target) {
                continue;
            }
            let d_edge = metric.distance(query, &edge_vector);
            try_enqueue(&mut candidates, max_candidates, target, d_edge);
        }
    }

    Ok(SearchOutcome { top_results, visited_list })
}

/// Inserts `(row_id, distance)` into `buf` at the position
/// [`distance_insert_idx`] selects, if any, evicting the worst entry when
/// `buf` is already at `cap`.
fn try_enqueue(buf: &mut Vec<Candidate>, cap: usize, row_id: i64, distance: f32) {
    if cap == 0 {
        return;
    }
    let distances: Vec<f32> = buf.iter().map(|c| c.distance).collect();
    if let Some(idx) = distance_insert_idx(&distances, cap, distance) {
        shift_insert(buf, cap, idx, Candidate { row_id, distance });
    }
}
