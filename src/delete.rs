//! Delete: drop a node and every back-edge pointing at it.
//!
//! This crate does not repair the graph after a delete:
//! neighbors that lose an edge to the deleted row are not reconnected to
//! each other or to anything else. The only cleanup performed is removing
//! the now-dangling back-edges so they don't accumulate as permanent dead
//! weight in every neighbor's adjacency list; any edge this pass misses
//! (because a neighbor row itself no longer exists) is left for search's
//! existing dangling-edge tolerance to shrug off.

use crate::block::NodeBlock;
use crate::blob::handle::BlobHandle;
use crate::error::DiskAnnError;
use crate::host::Host;

/// Deletes `row_id` from `table`, removing back-edges from every neighbor
/// it pointed to.
///
/// 1. Opens the target row read-only to collect its outgoing edge targets.
///    Returns [`DiskAnnError::NotFound`] if the row does not exist.
/// 2. For each neighbor, reopens its block writable, finds the back-edge
///    pointing at `row_id` (if any — it may already be gone from a prior
///    prune), deletes it in place, and flushes. A neighbor that no longer
///    exists is skipped (dangling-edge tolerance, same as search).
/// 3. Deletes the target row itself from `table`, verifying exactly one
///    row was removed.
///
/// # Errors
///
/// Returns [`DiskAnnError::NotFound`] if `row_id` is absent, or a host I/O
/// error.
pub fn delete<H: Host>(
    host: &H,
    table: &str,
    block: &NodeBlock,
    block_size: usize,
    row_id: i64,
) -> Result<(), DiskAnnError> {
    let targets = {
        let mut target_handle = BlobHandle::open(host, table, row_id, false, block_size)
            .map_err(|_| DiskAnnError::NotFound(format!("row {row_id} does not exist")))?;
        let buf = target_handle.buffer();
        let count = u32::from(block.edge_count(buf));
        (0..count).map(|i| block.edge_target(buf, i)).collect::<Vec<_>>()
    };

    for target in targets {
        let mut neighbor = match BlobHandle::open(host, table, target, true, block_size) {
            Ok(h) => h,
            Err(e) if e.is_row_not_found() => {
                log::debug!("delete {row_id}: neighbor row {target} already gone, skipping back-edge cleanup");
                continue;
            }
            Err(e) => return Err(e),
        };
        let buf = neighbor.buffer_mut();
        if let Some(idx) = block.find_edge(buf, row_id) {
            block.delete_edge(buf, idx);
            neighbor.flush()?;
        }
    }

    let changes = host.delete_row(table, row_id)?;
    if changes != 1 {
        return Err(DiskAnnError::NotFound(format!("row {row_id} does not exist")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RusqliteHost;

    fn setup(dims: u32, max_edges: u32) -> (RusqliteHost, NodeBlock) {
        let host = RusqliteHost::open_in_memory().unwrap();
        host.create_shadow_table("t").unwrap();
        let block = NodeBlock::new(dims, max_edges);
        (host, block)
    }

    fn write_node(host: &RusqliteHost, block: &NodeBlock, id: i64, vector: &[f32], edges: &[(i64, f32, &[f32])]) {
        let block_size = block.required_bytes();
        host.insert_zero_row("t", id, block_size).unwrap();
        let mut buf = vec![0u8; block_size];
        block.init(&mut buf, id, vector);
        for (i, (target, dist, vec)) in edges.iter().enumerate() {
            block.replace_edge(&mut buf, i as u32, *target, *dist, vec);
        }
        let mut h = BlobHandle::open(host, "t", id, true, block_size).unwrap();
        h.buffer_mut().copy_from_slice(&buf);
        h.flush().unwrap();
    }

    #[test]
    fn delete_missing_row_is_not_found() {
        let (host, block) = setup(2, 4);
        let err = delete(&host, "t", &block, block.required_bytes(), 99).unwrap_err();
        assert!(matches!(err, DiskAnnError::NotFound(_)));
    }

    #[test]
    fn delete_removes_the_row() {
        let (host, block) = setup(2, 4);
        write_node(&host, &block, 1, &[0.0, 0.0], &[]);
        delete(&host, "t", &block, block.required_bytes(), 1).unwrap();
        assert!(!host.row_exists("t", 1).unwrap());
    }

    #[test]
    fn delete_strips_back_edges_from_neighbors() {
        let (host, block) = setup(2, 4);
        write_node(&host, &block, 1, &[0.0, 0.0], &[(2, 1.0, &[1.0, 0.0])]);
        write_node(&host, &block, 2, &[1.0, 0.0], &[(1, 1.0, &[0.0, 0.0]), (3, 4.0, &[2.0, 0.0])]);
        write_node(&host, &block, 3, &[2.0, 0.0], &[]);

        delete(&host, "t", &block, block.required_bytes(), 1).unwrap();

        let h = BlobHandle::open(&host, "t", 2, false, block.required_bytes()).unwrap();
        let buf = h.buffer();
        assert_eq!(block.edge_count(buf), 1);
        assert_eq!(block.edge_target(buf, 0), 3);
    }

    #[test]
    fn delete_tolerates_neighbor_that_no_longer_exists() {
        let (host, block) = setup(2, 4);
        // Node 1 points at node 2, which was never actually written.
        write_node(&host, &block, 1, &[0.0, 0.0], &[(2, 1.0, &[1.0, 0.0])]);
        delete(&host, "t", &block, block.required_bytes(), 1).unwrap();
        assert!(!host.row_exists("t", 1).unwrap());
    }

    #[test]
    fn delete_leaves_unrelated_rows_untouched() {
        let (host, block) = setup(2, 4);
        write_node(&host, &block, 1, &[0.0, 0.0], &[]);
        write_node(&host, &block, 2, &[5.0, 5.0], &[]);
        delete(&host, "t", &block, block.required_bytes(), 1).unwrap();
        assert!(host.row_exists("t", 2).unwrap());
    }
}
