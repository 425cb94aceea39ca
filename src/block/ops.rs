//! Block layout arithmetic and buffer-level operations.

use crate::codec::{read_le16, read_le64, read_le_f32, write_le16, write_le_f32, write_le_i64};

const ROW_ID_OFFSET: usize = 0;
const EDGE_COUNT_OFFSET: usize = 8;
const HEADER_SIZE: usize = 16;
const EDGE_METADATA_SIZE: usize = 16;
const EDGE_METADATA_DISTANCE_OFFSET: usize = 4;
const EDGE_METADATA_ROW_ID_OFFSET: usize = 8;

/// Precomputed byte offsets for a block of a given dimensionality and edge
/// capacity. Cheap to construct; callers typically build one per
/// [`crate::config::IndexConfig`] and reuse it for every block.
#[derive(Debug, Clone, Copy)]
pub struct NodeBlock {
    dims: u32,
    max_edges: u32,
    node_vector_bytes: u32,
    edge_vector_bytes: u32,
}

impl NodeBlock {
    /// Builds the layout for `dims`-dimensional vectors and `max_edges`
    /// neighbor slots.
    #[must_use]
    pub fn new(dims: u32, max_edges: u32) -> Self {
        let node_vector_bytes = dims * 4;
        NodeBlock {
            dims,
            max_edges,
            node_vector_bytes,
            edge_vector_bytes: node_vector_bytes,
        }
    }

    /// Maximum edges this layout supports.
    #[must_use]
    pub fn max_edges(&self) -> u32 {
        self.max_edges
    }

    fn node_vector_offset(&self) -> usize {
        HEADER_SIZE
    }

    fn edge_vector_region_offset(&self) -> usize {
        HEADER_SIZE + self.node_vector_bytes as usize
    }

    fn edge_metadata_region_offset(&self) -> usize {
        self.edge_vector_region_offset() + (self.max_edges as usize) * (self.edge_vector_bytes as usize)
    }

    fn edge_vector_offset(&self, i: u32) -> usize {
        self.edge_vector_region_offset() + (i as usize) * (self.edge_vector_bytes as usize)
    }

    fn edge_metadata_offset(&self, i: u32) -> usize {
        self.edge_metadata_region_offset() + (i as usize) * EDGE_METADATA_SIZE
    }

    /// Total bytes this layout occupies at `max_edges` full occupancy. Used
    /// to validate that a configured `block_size` is large enough.
    #[must_use]
    pub fn required_bytes(&self) -> usize {
        self.edge_metadata_region_offset() + (self.max_edges as usize) * EDGE_METADATA_SIZE
    }

    /// Zeroes `buf`, writes the row id and edge count (0), and copies `vector`
    /// into the node-vector region.
    ///
    /// # Panics
    ///
    /// Panics if `vector.len() != dims` or `buf` is smaller than
    /// [`Self::required_bytes`].
    pub fn init(&self, buf: &mut [u8], row_id: i64, vector: &[f32]) {
        assert_eq!(vector.len(), self.dims as usize, "vector length must match configured dimensions");
        assert!(buf.len() >= self.required_bytes(), "buffer smaller than block layout requires");
        buf.fill(0);
        write_le_i64(buf, ROW_ID_OFFSET, row_id);
        write_le16(buf, EDGE_COUNT_OFFSET, 0);
        let off = self.node_vector_offset();
        for (i, x) in vector.iter().enumerate() {
            write_le_f32(buf, off + i * 4, *x);
        }
    }

    /// Reads the row id stored in the block header.
    #[must_use]
    pub fn row_id(&self, buf: &[u8]) -> i64 {
        read_le64(buf, ROW_ID_OFFSET) as i64
    }

    /// Reads the node's own vector as a borrowed `f32` view.
    ///
    /// Returns an owned `Vec` rather than a zero-copy slice: the on-disk
    /// bytes are little-endian regardless of host order, so a direct
    /// reinterpret cast is only safe on little-endian hosts. Decoding
    /// through [`crate::codec::read_le_f32`] keeps this correct everywhere.
    #[must_use]
    pub fn vector(&self, buf: &[u8]) -> Vec<f32> {
        let off = self.node_vector_offset();
        (0..self.dims as usize).map(|i| read_le_f32(buf, off + i * 4)).collect()
    }

    /// Reads the number of edges currently stored in the block.
    #[must_use]
    pub fn edge_count(&self, buf: &[u8]) -> u16 {
        read_le16(buf, EDGE_COUNT_OFFSET)
    }

    fn set_edge_count(&self, buf: &mut [u8], count: u16) {
        write_le16(buf, EDGE_COUNT_OFFSET, count);
    }

    /// Reads edge `i`'s target row id, stored distance, and vector.
    ///
    /// # Panics
    ///
    /// Panics if `i >= edge_count(buf)`.
    #[must_use]
    pub fn edge(&self, buf: &[u8], i: u32) -> (i64, f32, Vec<f32>) {
        assert!((i as u16) < self.edge_count(buf), "edge index out of range");
        let meta_off = self.edge_metadata_offset(i);
        let distance = read_le_f32(buf, meta_off + EDGE_METADATA_DISTANCE_OFFSET);
        let target = read_le64(buf, meta_off + EDGE_METADATA_ROW_ID_OFFSET) as i64;
        let vec_off = self.edge_vector_offset(i);
        let vector = (0..self.dims as usize).map(|j| read_le_f32(buf, vec_off + j * 4)).collect();
        (target, distance, vector)
    }

    /// Reads only edge `i`'s target row id, without decoding its vector.
    ///
    /// # Panics
    ///
    /// Panics if `i >= edge_count(buf)`.
    #[must_use]
    pub fn edge_target(&self, buf: &[u8], i: u32) -> i64 {
        assert!((i as u16) < self.edge_count(buf), "edge index out of range");
        let meta_off = self.edge_metadata_offset(i);
        read_le64(buf, meta_off + EDGE_METADATA_ROW_ID_OFFSET) as i64
    }

    /// Reads only edge `i`'s stored distance.
    ///
    /// # Panics
    ///
    /// Panics if `i >= edge_count(buf)`.
    #[must_use]
    pub fn edge_distance(&self, buf: &[u8], i: u32) -> f32 {
        assert!((i as u16) < self.edge_count(buf), "edge index out of range");
        let meta_off = self.edge_metadata_offset(i);
        read_le_f32(buf, meta_off + EDGE_METADATA_DISTANCE_OFFSET)
    }

    /// Linear scan for the edge slot whose target is `row_id`.
    #[must_use]
    pub fn find_edge(&self, buf: &[u8], row_id: i64) -> Option<u32> {
        (0..self.edge_count(buf) as u32).find(|&i| self.edge_target(buf, i) == row_id)
    }

    /// Writes edge slot `i`. If `i == edge_count`, appends (bumping the
    /// count); otherwise overwrites the existing slot in place.
    ///
    /// # Panics
    ///
    /// Panics if `i > edge_count(buf)` or if appending would exceed
    /// `max_edges`, or if `vector.len() != dims`.
    pub fn replace_edge(&self, buf: &mut [u8], i: u32, row_id: i64, distance: f32, vector: &[f32]) {
        assert_eq!(vector.len(), self.dims as usize, "edge vector length must match configured dimensions");
        let count = self.edge_count(buf);
        assert!(i as u16 <= count, "replace_edge index out of range");
        if i as u16 == count {
            assert!(count as u32 + 1 <= self.max_edges, "edge slots exhausted");
            self.set_edge_count(buf, count + 1);
        }

        let vec_off = self.edge_vector_offset(i);
        for (j, x) in vector.iter().enumerate() {
            write_le_f32(buf, vec_off + j * 4, *x);
        }
        let meta_off = self.edge_metadata_offset(i);
        write_le_f32(buf, meta_off + EDGE_METADATA_DISTANCE_OFFSET, distance);
        write_le_i64(buf, meta_off + EDGE_METADATA_ROW_ID_OFFSET, row_id);
    }

    /// Deletes edge `i` by swapping the last edge into its place and
    /// decrementing the count. O(1); edge order is not preserved.
    ///
    /// # Panics
    ///
    /// Panics if `i >= edge_count(buf)`.
    pub fn delete_edge(&self, buf: &mut [u8], i: u32) {
        let count = self.edge_count(buf);
        assert!((i as u16) < count, "delete_edge index out of range");
        let last = count - 1;
        if i as u16 != last {
            let (target, distance, vector) = self.edge(buf, last as u32);
            self.overwrite_edge_slot(buf, i, target, distance, &vector);
        }
        self.set_edge_count(buf, last);
    }

    fn overwrite_edge_slot(&self, buf: &mut [u8], i: u32, row_id: i64, distance: f32, vector: &[f32]) {
        let vec_off = self.edge_vector_offset(i);
        for (j, x) in vector.iter().enumerate() {
            write_le_f32(buf, vec_off + j * 4, *x);
        }
        let meta_off = self.edge_metadata_offset(i);
        write_le_f32(buf, meta_off + EDGE_METADATA_DISTANCE_OFFSET, distance);
        write_le_i64(buf, meta_off + EDGE_METADATA_ROW_ID_OFFSET, row_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> NodeBlock {
        NodeBlock::new(4, 8)
    }

    #[test]
    fn init_sets_row_id_and_vector_and_zero_edges() {
        let layout = layout();
        let mut buf = vec![0xAAu8; 4096];
        let v = [1.0, 2.0, 3.0, 4.0];
        layout.init(&mut buf, 42, &v);
        assert_eq!(layout.row_id(&buf), 42);
        assert_eq!(layout.edge_count(&buf), 0);
        assert_eq!(layout.vector(&buf), v.to_vec());
    }

    #[test]
    fn replace_edge_appends_then_overwrites() {
        let layout = layout();
        let mut buf = vec![0u8; 4096];
        layout.init(&mut buf, 1, &[0.0; 4]);

        layout.replace_edge(&mut buf, 0, 100, 1.5, &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(layout.edge_count(&buf), 1);
        let (target, dist, vec) = layout.edge(&buf, 0);
        assert_eq!(target, 100);
        assert_eq!(dist, 1.5);
        assert_eq!(vec, vec![1.0, 1.0, 1.0, 1.0]);

        layout.replace_edge(&mut buf, 0, 200, 2.5, &[2.0, 2.0, 2.0, 2.0]);
        assert_eq!(layout.edge_count(&buf), 1);
        let (target, dist, _) = layout.edge(&buf, 0);
        assert_eq!(target, 200);
        assert_eq!(dist, 2.5);
    }

    #[test]
    fn find_edge_locates_target() {
        let layout = layout();
        let mut buf = vec![0u8; 4096];
        layout.init(&mut buf, 1, &[0.0; 4]);
        layout.replace_edge(&mut buf, 0, 10, 0.1, &[0.0; 4]);
        layout.replace_edge(&mut buf, 1, 20, 0.2, &[0.0; 4]);
        assert_eq!(layout.find_edge(&buf, 20), Some(1));
        assert_eq!(layout.find_edge(&buf, 999), None);
    }

    #[test]
    fn delete_edge_swaps_with_last() {
        let layout = layout();
        let mut buf = vec![0u8; 4096];
        layout.init(&mut buf, 1, &[0.0; 4]);
        layout.replace_edge(&mut buf, 0, 10, 0.1, &[1.0; 4]);
        layout.replace_edge(&mut buf, 1, 20, 0.2, &[2.0; 4]);
        layout.replace_edge(&mut buf, 2, 30, 0.3, &[3.0; 4]);

        layout.delete_edge(&mut buf, 0);
        assert_eq!(layout.edge_count(&buf), 2);
        // slot 0 now holds what was slot 2 (30), slot 1 unchanged (20).
        let targets: Vec<i64> = (0..2).map(|i| layout.edge_target(&buf, i)).collect();
        assert!(targets.contains(&30));
        assert!(targets.contains(&20));
        assert!(!targets.contains(&10));
    }

    #[test]
    fn delete_last_edge_just_decrements() {
        let layout = layout();
        let mut buf = vec![0u8; 4096];
        layout.init(&mut buf, 1, &[0.0; 4]);
        layout.replace_edge(&mut buf, 0, 10, 0.1, &[1.0; 4]);
        layout.delete_edge(&mut buf, 0);
        assert_eq!(layout.edge_count(&buf), 0);
    }

    #[test]
    #[should_panic(expected = "edge slots exhausted")]
    fn replace_edge_panics_past_capacity() {
        let layout = NodeBlock::new(4, 1);
        let mut buf = vec![0u8; 4096];
        layout.init(&mut buf, 1, &[0.0; 4]);
        layout.replace_edge(&mut buf, 0, 10, 0.1, &[0.0; 4]);
        layout.replace_edge(&mut buf, 1, 20, 0.2, &[0.0; 4]);
    }

    #[test]
    fn required_bytes_fits_within_4kib_for_small_layouts() {
        let layout = NodeBlock::new(32, 64);
        assert!(layout.required_bytes() <= 4096);
    }
}
