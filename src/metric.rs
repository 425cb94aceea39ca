//! Distance kernels.
//!
//! All three kernels share one convention: **ascending distance means
//! closer**. For L2 and cosine this is natural. Dot-product similarity is
//! naturally *descending* (higher dot product = more similar), so the dot
//! kernel returns the negated dot product — this keeps every consumer
//! (candidate queues, top-K buffers, pruning comparisons) metric-agnostic; no
//! call site needs to know which direction "better" points.
//!
//! No SIMD dispatch: the scalar loops below are straightforward enough for
//! the compiler to autovectorize reasonably, and keeping this module free of
//! target-feature detection keeps the core portable.

use std::fmt;

/// Distance metric selector, stored in the metadata table as a small integer tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Squared Euclidean distance.
    L2,
    /// `1 - cosine_similarity`.
    Cosine,
    /// Negated dot product, so smaller is still closer.
    Dot,
}

impl Metric {
    /// Decodes the integer tag stored in the metadata table.
    ///
    /// # Errors
    ///
    /// Returns `None` if `tag` does not correspond to a known metric.
    #[must_use]
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Metric::L2),
            1 => Some(Metric::Cosine),
            2 => Some(Metric::Dot),
            _ => None,
        }
    }

    /// The integer tag persisted for this metric.
    #[must_use]
    pub fn tag(self) -> u32 {
        match self {
            Metric::L2 => 0,
            Metric::Cosine => 1,
            Metric::Dot => 2,
        }
    }

    /// Computes the distance between `a` and `b` under this metric.
    ///
    /// # Panics
    ///
    /// Panics if `a.len() != b.len()`; callers validate dimensionality before
    /// reaching this point.
    #[must_use]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "vectors must share dimensionality");
        match self {
            Metric::L2 => l2_squared(a, b),
            Metric::Cosine => cosine_distance(a, b),
            Metric::Dot => -dot(a, b),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Metric::L2 => "l2",
            Metric::Cosine => "cosine",
            Metric::Dot => "dot",
        };
        f.write_str(s)
    }
}

/// Squared Euclidean distance. Avoids the `sqrt` since only relative ordering matters.
#[must_use]
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Raw dot product `a . b`.
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `1 - cosine_similarity(a, b)`.
///
/// Zero vectors are treated as maximally dissimilar from everything
/// (including each other) rather than producing `NaN` from a `0/0` division.
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let num = dot(a, b);
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - (num / (norm_a * norm_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_zero_for_identical_vectors() {
        let v = [1.0, 2.0, 3.0];
        assert_eq!(l2_squared(&v, &v), 0.0);
    }

    #[test]
    fn l2_is_symmetric() {
        let a = [1.0, 0.0, -2.0];
        let b = [0.0, 3.0, 1.0];
        assert_eq!(l2_squared(&a, &b), l2_squared(&b, &a));
    }

    #[test]
    fn l2_matches_known_value() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert_eq!(l2_squared(&a, &b), 25.0);
    }

    #[test]
    fn cosine_zero_for_identical_direction() {
        let a = [1.0, 1.0];
        let b = [2.0, 2.0];
        assert!(cosine_distance(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_max_for_opposite_direction() {
        let a = [1.0, 0.0];
        let b = [-1.0, 0.0];
        assert!((cosine_distance(&a, &b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_zero_vector_is_finite() {
        let a = [0.0, 0.0];
        let b = [1.0, 0.0];
        assert_eq!(cosine_distance(&a, &b), 1.0);
        assert_eq!(cosine_distance(&a, &a), 1.0);
    }

    #[test]
    fn dot_metric_orders_ascending_toward_more_similar() {
        let q = [1.0, 0.0];
        let near = [1.0, 0.0];
        let far = [-1.0, 0.0];
        assert!(Metric::Dot.distance(&q, &near) < Metric::Dot.distance(&q, &far));
    }

    #[test]
    fn metric_tag_roundtrip() {
        for m in [Metric::L2, Metric::Cosine, Metric::Dot] {
            assert_eq!(Metric::from_tag(m.tag()), Some(m));
        }
        assert_eq!(Metric::from_tag(99), None);
    }
}
