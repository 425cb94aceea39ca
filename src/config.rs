//! Index configuration: the immutable parameters that govern a single
//! index's block layout and search/insert beam widths.
//!
//! A small, `Copy`-ish struct that is computed once (at `create`) or loaded
//! from storage (at `open`) and then carried unchanged for the handle's
//! lifetime.

use crate::error::DiskAnnError;
use crate::metric::Metric;

/// Edge-count floor enforced by [`crate::insert::prune_edges`].
///
/// Fixed, not configurable from metadata: changing it is a format-breaking
/// change and requires bumping `format_version`.
pub const MIN_DEGREE: u32 = 8;

/// Highest `format_version` this build knows how to open.
pub const SUPPORTED_FORMAT_VERSION: u32 = 3;

/// Default `pruning_alpha`, stored as fixed-point ×1000 (so 1300 == α 1.3).
pub const DEFAULT_PRUNING_ALPHA_X1000: u32 = 1300;

const BLOCK_ALIGN: u32 = 4096;

/// Bytes of fixed header + node vector preceding the edge region of a block.
const NODE_HEADER_BYTES: u32 = 16;

/// Bytes of fixed metadata trailing each edge's vector slot.
const EDGE_METADATA_BYTES: u32 = 16;

/// Immutable per-index configuration, loaded from or written to the
/// metadata table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Format version this configuration was created or opened under.
    pub format_version: u32,
    /// Vector dimensionality, 1..=16384.
    pub dimensions: u32,
    /// Distance metric.
    pub metric: Metric,
    /// Target adjacency cap per node.
    pub max_neighbors: u32,
    /// Beam width used by search.
    pub search_list_size: u32,
    /// Beam width used by insert.
    pub insert_list_size: u32,
    /// Bytes per node block (shadow-table BLOB size).
    pub block_size: u32,
    /// Robust-pruning α, fixed-point ×1000.
    pub pruning_alpha_x1000: u32,
}

impl IndexConfig {
    /// Builds a configuration with paper/production defaults, auto-sizing
    /// `block_size` to fit `max_neighbors` edges plus a 10% margin.
    ///
    /// # Errors
    ///
    /// Returns [`DiskAnnError::Invalid`] if `dimensions` is 0 or exceeds
    /// 16384.
    pub fn new(dimensions: u32, metric: Metric) -> Result<Self, DiskAnnError> {
        Self::with_params(dimensions, metric, 64, 100, 100, 0, DEFAULT_PRUNING_ALPHA_X1000)
    }

    /// Builds a configuration from explicit parameters.
    ///
    /// `block_size == 0` requests auto-sizing (rounded up to a 4 KiB
    /// boundary); a nonzero value is validated against the layout invariant
    /// and used as-is.
    ///
    /// # Errors
    ///
    /// Returns [`DiskAnnError::Invalid`] if `dimensions` is out of range, any
    /// beam/neighbor parameter is zero, or an explicitly supplied
    /// `block_size` is too small to hold `max_neighbors` edges.
    #[allow(clippy::too_many_arguments)]
    pub fn with_params(
        dimensions: u32,
        metric: Metric,
        max_neighbors: u32,
        search_list_size: u32,
        insert_list_size: u32,
        block_size: u32,
        pruning_alpha_x1000: u32,
    ) -> Result<Self, DiskAnnError> {
        if dimensions == 0 || dimensions > 16384 {
            return Err(DiskAnnError::Invalid(format!(
                "dimensions must be 1..=16384, got {dimensions}"
            )));
        }
        if max_neighbors == 0 || search_list_size == 0 || insert_list_size == 0 {
            return Err(DiskAnnError::Invalid(
                "max_neighbors, search_list_size, and insert_list_size must be nonzero".into(),
            ));
        }

        let node_vector_bytes = dimensions * 4;
        let minimum = minimum_block_size(node_vector_bytes, max_neighbors);

        let block_size = if block_size == 0 {
            round_up_to_4kib(minimum)
        } else {
            if block_size < minimum {
                return Err(DiskAnnError::Invalid(format!(
                    "block_size {block_size} too small: needs at least {minimum} bytes for \
                     {max_neighbors} neighbors at {dimensions} dimensions"
                )));
            }
            block_size
        };

        Ok(IndexConfig {
            format_version: SUPPORTED_FORMAT_VERSION,
            dimensions,
            metric,
            max_neighbors,
            search_list_size,
            insert_list_size,
            block_size,
            pruning_alpha_x1000,
        })
    }

    /// Bytes occupied by the node's own vector (`dimensions * 4`).
    #[must_use]
    pub fn node_vector_bytes(&self) -> u32 {
        self.dimensions * 4
    }

    /// Bytes occupied by one edge's vector slot (`dimensions * 4`; identical
    /// to `node_vector_bytes` since edges store float32 vectors too).
    #[must_use]
    pub fn edge_vector_bytes(&self) -> u32 {
        self.dimensions * 4
    }

    /// `NODE_HEADER_BYTES + node_vector_bytes`.
    #[must_use]
    pub fn node_overhead(&self) -> u32 {
        NODE_HEADER_BYTES + self.node_vector_bytes()
    }

    /// `edge_vector_bytes + EDGE_METADATA_BYTES`.
    #[must_use]
    pub fn edge_overhead(&self) -> u32 {
        self.edge_vector_bytes() + EDGE_METADATA_BYTES
    }

    /// Maximum edges a block of `block_size` bytes can hold, derived at open
    /// time: `(block_size - node_overhead) / edge_overhead`.
    ///
    /// # Panics
    ///
    /// Panics if `block_size < node_overhead`; this would mean the stored
    /// configuration is internally inconsistent (should have been rejected
    /// at `create`/`open`).
    #[must_use]
    pub fn max_edges(&self) -> u32 {
        let overhead = self.node_overhead();
        assert!(
            self.block_size >= overhead,
            "block_size {} smaller than node_overhead {overhead}",
            self.block_size
        );
        (self.block_size - overhead) / self.edge_overhead()
    }

    /// Effective pruning α as a float, resolving the
    /// `pruning_alpha_x1000 == 0` legacy fallback.
    ///
    /// For `format_version < 2`, a stored `0` means "not stored" and is
    /// treated as the default (1.3). At `format_version >= 2` a stored `0`
    /// is taken literally.
    #[must_use]
    pub fn pruning_alpha(&self) -> f32 {
        if self.pruning_alpha_x1000 == 0 && self.format_version < 2 {
            DEFAULT_PRUNING_ALPHA_X1000 as f32 / 1000.0
        } else {
            self.pruning_alpha_x1000 as f32 / 1000.0
        }
    }
}

/// `node_overhead + margin * edge_overhead`, where `margin = max_neighbors +
/// max_neighbors / 10`.
fn minimum_block_size(node_vector_bytes: u32, max_neighbors: u32) -> u32 {
    let node_overhead = NODE_HEADER_BYTES + node_vector_bytes;
    let edge_overhead = node_vector_bytes + EDGE_METADATA_BYTES;
    let margin = max_neighbors + max_neighbors / 10;
    node_overhead + margin * edge_overhead
}

fn round_up_to_4kib(n: u32) -> u32 {
    n.div_ceil(BLOCK_ALIGN) * BLOCK_ALIGN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_produces_4kib_aligned_block_size() {
        let cfg = IndexConfig::new(128, Metric::L2).unwrap();
        assert_eq!(cfg.block_size % BLOCK_ALIGN, 0);
        assert!(cfg.block_size >= minimum_block_size(128 * 4, 64));
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert!(IndexConfig::new(0, Metric::L2).is_err());
    }

    #[test]
    fn rejects_excessive_dimensions() {
        assert!(IndexConfig::new(16385, Metric::L2).is_err());
    }

    #[test]
    fn rejects_undersized_explicit_block_size() {
        let err = IndexConfig::with_params(128, Metric::L2, 64, 100, 100, 64, 1300);
        assert!(err.is_err());
    }

    #[test]
    fn accepts_adequately_sized_explicit_block_size() {
        let cfg = IndexConfig::with_params(8, Metric::L2, 8, 50, 50, 4096, 1300).unwrap();
        assert_eq!(cfg.block_size, 4096);
        assert!(cfg.max_edges() >= 8);
    }

    #[test]
    fn max_edges_never_overflows_block_size() {
        let cfg = IndexConfig::new(32, Metric::L2).unwrap();
        let used = cfg.node_overhead() + cfg.max_edges() * cfg.edge_overhead();
        assert!(used <= cfg.block_size);
    }

    #[test]
    fn legacy_zero_alpha_falls_back_to_default_pre_v2() {
        let mut cfg = IndexConfig::new(8, Metric::L2).unwrap();
        cfg.format_version = 1;
        cfg.pruning_alpha_x1000 = 0;
        assert_eq!(cfg.pruning_alpha(), DEFAULT_PRUNING_ALPHA_X1000 as f32 / 1000.0);
    }

    #[test]
    fn zero_alpha_is_literal_at_v2_and_later() {
        let mut cfg = IndexConfig::new(8, Metric::L2).unwrap();
        cfg.format_version = 2;
        cfg.pruning_alpha_x1000 = 0;
        assert_eq!(cfg.pruning_alpha(), 0.0);
    }

    #[test]
    fn node_and_edge_vector_bytes_match_for_float32_only() {
        let cfg = IndexConfig::new(16, Metric::Cosine).unwrap();
        assert_eq!(cfg.node_vector_bytes(), cfg.edge_vector_bytes());
        assert_eq!(cfg.node_vector_bytes(), 64);
    }
}
