//! Insert with angle-based (Robust Pruning / Vamana) edge installation
//! for the diskann_core index's node blocks.
//!
//! The algorithm runs beam search in writable mode to find the new vector's
//! neighborhood, then installs edges bidirectionally: the new node's own
//! adjacency list gets edges to the nodes it discovered (phase 1), and each
//! discovered node gets a back-edge to the new node (phase 2). Both phases
//! route every candidate edge through [`replace_edge_idx`] and
//! [`prune_edges`], which together implement the α-dominance test that
//! keeps adjacency lists small while preserving graph navigability.

use crate::blob::BlobCache;
use crate::block::NodeBlock;
use crate::config::MIN_DEGREE;
use crate::error::DiskAnnError;
use crate::host::Host;
use crate::metric::Metric;
use crate::search::beam_search;

/// Decides where (if anywhere) an edge to `new_id`/`new_vec` belongs in the
/// block currently addressed by `node_vector`'s owner.
///
/// Iterates existing edges in reverse order. An edge already targeting
/// `new_id` is reused in place (reinstating a previously pruned or dangling
/// edge). Otherwise, any existing edge that dominates the new one under the
/// α-test rejects it outright; among the rest, the edge with the largest
/// stored distance (the node's current *worst* neighbor) that the new edge
/// would improve upon is remembered as the replacement slot — replacing the
/// least useful existing edge is the only one of the two plausible readings
/// of "worst replacement candidate" that doesn't amount to picking an
/// arbitrary tie (see `DESIGN.md`).
///
/// Returns `None` if the new edge is dominated and the list has no room to
/// append it either.
#[must_use]
pub fn replace_edge_idx(
    block: &NodeBlock,
    metric: Metric,
    alpha: f32,
    buf: &[u8],
    node_vector: &[f32],
    new_id: i64,
    new_vec: &[f32],
) -> Option<u32> {
    let count = u32::from(block.edge_count(buf));
    let d_new = metric.distance(node_vector, new_vec);

    let mut replacement: Option<(u32, f32)> = None; // (index, d_old)
    for i in (0..count).rev() {
        if block.edge_target(buf, i) == new_id {
            return Some(i);
        }
        let d_old = block.edge_distance(buf, i);
        let (_, _, edge_vec) = block.edge(buf, i);
        let d_between = metric.distance(&edge_vec, new_vec);
        if d_new > alpha * d_between {
            return None;
        }
        if d_new < d_old && replacement.map_or(true, |(_, best)| d_old > best) {
            replacement = Some((i, d_old));
        }
    }

    if count < block.max_edges() {
        Some(count)
    } else {
        replacement.map(|(i, _)| i)
    }
}

/// Removes every edge `E` (other than `anchor_idx`) with
/// `dist(node, E) > alpha * dist(anchor, E)`, stopping once `edge_count`
/// reaches [`MIN_DEGREE`].
///
/// `dist(node, E)` is read directly from `E`'s own stored distance rather
/// than recomputed, since that's exactly what was computed when the edge
/// was installed.
pub fn prune_edges(block: &NodeBlock, metric: Metric, alpha: f32, buf: &mut [u8], anchor_idx: u32) {
    let (anchor_target, _anchor_dist, anchor_vec) = block.edge(buf, anchor_idx);
    let mut anchor_idx = anchor_idx;
    let mut i = 0u32;

    loop {
        let count = u32::from(block.edge_count(buf));
        if count <= MIN_DEGREE || i >= count {
            break;
        }
        if i == anchor_idx || block.edge_target(buf, i) == anchor_target {
            i += 1;
            continue;
        }

        let d_node = block.edge_distance(buf, i);
        let (_, _, e_vec) = block.edge(buf, i);
        let d_anchor_e = metric.distance(&anchor_vec, &e_vec);

        if d_node > alpha * d_anchor_e {
            let last = count - 1;
            block.delete_edge(buf, i);
            if anchor_idx == last {
                anchor_idx = i;
            }
            // slot `i` now holds whatever was swapped in from `last`; re-examine it.
        } else {
            i += 1;
        }
    }
}

/// Installs the forward edge new→`target` on the new node's own block, with
/// pruning, if [`replace_edge_idx`] admits it. Returns `true` if an edge was
/// installed.
pub fn install_forward_edge(
    block: &NodeBlock,
    metric: Metric,
    alpha: f32,
    new_buf: &mut [u8],
    new_vector: &[f32],
    target_id: i64,
    target_vector: &[f32],
) -> bool {
    let Some(idx) = replace_edge_idx(block, metric, alpha, new_buf, new_vector, target_id, target_vector) else {
        return false;
    };
    let dist = metric.distance(new_vector, target_vector);
    block.replace_edge(new_buf, idx, target_id, dist, target_vector);
    prune_edges(block, metric, alpha, new_buf, idx);
    true
}

/// Installs the back edge `owner`→new on `owner`'s own block, with pruning,
/// if [`replace_edge_idx`] admits it. Returns `true` if an edge was
/// installed.
pub fn install_back_edge(
    block: &NodeBlock,
    metric: Metric,
    alpha: f32,
    owner_buf: &mut [u8],
    owner_vector: &[f32],
    new_id: i64,
    new_vector: &[f32],
) -> bool {
    let Some(idx) = replace_edge_idx(block, metric, alpha, owner_buf, owner_vector, new_id, new_vector) else {
        return false;
    };
    let dist = metric.distance(owner_vector, new_vector);
    block.replace_edge(owner_buf, idx, new_id, dist, new_vector);
    prune_edges(block, metric, alpha, owner_buf, idx);
    true
}

/// Runs the full insert algorithm for a vector known not to collide
/// with an existing row id (the caller — [`crate::api::DiskAnnIndex::insert`]
/// — checks that before calling this).
///
/// If the shadow table is empty, this is the first insert: the new row is
/// created with zero edges and there is nothing to link. Otherwise, a
/// writable beam search from a random start row populates the visited list,
/// then edges are installed bidirectionally: phase 1 links the new node to
/// each node it discovered, phase 2 links each discovered node back to the
/// new node. Both phases route through [`replace_edge_idx`] and
/// [`prune_edges`].
///
/// Caller owns savepoint nesting: this function assumes any
/// necessary transaction has already been started.
///
/// # Errors
///
/// Propagates host I/O errors. Does not itself special-case a colliding row
/// id; `host.insert_zero_row` surfaces the host's own constraint-violation
/// error in that case.
pub fn insert_vector<'h, H: Host>(
    host: &'h H,
    table: &str,
    block: &NodeBlock,
    metric: Metric,
    alpha: f32,
    beam_width: usize,
    cache: &mut BlobCache<'h, H>,
    block_size: usize,
    id: i64,
    vector: &[f32],
) -> Result<(), DiskAnnError> {
    let Some(start_row) = host.random_row_id(table)? else {
        host.insert_zero_row(table, id, block_size)?;
        let handle = cache.get(id, true)?;
        let mut h = handle.borrow_mut();
        block.init(h.buffer_mut(), id, vector);
        h.flush()?;
        return Ok(());
    };

    let outcome = beam_search(cache, block, metric, vector, start_row, beam_width, 1, true, None)?;

    host.insert_zero_row(table, id, block_size)?;
    let new_handle = cache.get(id, true)?;
    {
        let mut h = new_handle.borrow_mut();
        block.init(h.buffer_mut(), id, vector);
    }

    // Phase 1: forward edges new -> visited.
    for visited in &outcome.visited_list {
        let mut h = new_handle.borrow_mut();
        if let Some(idx) = replace_edge_idx(block, metric, alpha, h.buffer(), vector, visited.row_id, &visited.vector) {
            let dist = metric.distance(vector, &visited.vector);
            block.replace_edge(h.buffer_mut(), idx, visited.row_id, dist, &visited.vector);
            prune_edges(block, metric, alpha, h.buffer_mut(), idx);
        }
    }
    new_handle.borrow_mut().flush()?;

    // Phase 2: back edges visited -> new.
    for visited in &outcome.visited_list {
        let mut h = visited.blob.borrow_mut();
        if let Some(idx) = replace_edge_idx(block, metric, alpha, h.buffer(), &visited.vector, id, vector) {
            let dist = metric.distance(&visited.vector, vector);
            block.replace_edge(h.buffer_mut(), idx, id, dist, vector);
            prune_edges(block, metric, alpha, h.buffer_mut(), idx);
        }
        h.flush()?;
    }

    Ok(())
}
