//! Bounded ascending-sorted buffer maintenance for the candidate queue and
//! top-K result buffer.
//!
//! Both buffers are small (beam width / k, typically tens to low hundreds of
//! entries), so a linear scan for the insertion point plus a `Vec::insert`
//! shift is faster in practice than a heap and keeps the "sorted at every
//! observable moment" invariant trivially checkable.

/// Finds the index at which a new element with distance `new_dist` should be
/// inserted into `distances` (assumed sorted ascending) to keep it sorted,
/// given the buffer is capped at `cap` entries.
///
/// Returns `None` when `distances.len() == cap` and `new_dist` is not
/// strictly less than the current last (worst) element — the new entry
/// would not make the cut.
#[must_use]
pub fn distance_insert_idx(distances: &[f32], cap: usize, new_dist: f32) -> Option<usize> {
    if distances.len() >= cap {
        if let Some(&worst) = distances.last() {
            if new_dist >= worst {
                return None;
            }
        }
    }
    let idx = distances.partition_point(|&d| d <= new_dist);
    Some(idx)
}

/// Inserts `value` at `idx`, shifting later elements right. If this grows
/// `buf` beyond `cap`, the last (worst) element is popped and returned.
pub fn shift_insert<T>(buf: &mut Vec<T>, cap: usize, idx: usize, value: T) -> Option<T> {
    buf.insert(idx, value);
    if buf.len() > cap {
        buf.pop()
    } else {
        None
    }
}

/// Removes and returns the element at `idx`, shifting later elements left.
/// Order is preserved (unlike block edge deletion, which swaps with the
/// last element instead).
///
/// # Panics
///
/// Panics if `idx >= buf.len()`.
pub fn shift_delete<T>(buf: &mut Vec<T>, idx: usize) -> T {
    buf.remove(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_idx_into_empty_buffer() {
        assert_eq!(distance_insert_idx(&[], 4, 1.0), Some(0));
    }

    #[test]
    fn insert_idx_finds_middle_position() {
        let d = [1.0, 3.0, 5.0];
        assert_eq!(distance_insert_idx(&d, 10, 2.0), Some(1));
    }

    #[test]
    fn insert_idx_rejects_when_full_and_not_better() {
        let d = [1.0, 2.0, 3.0];
        assert_eq!(distance_insert_idx(&d, 3, 3.0), None);
        assert_eq!(distance_insert_idx(&d, 3, 5.0), None);
    }

    #[test]
    fn insert_idx_accepts_when_full_but_strictly_better() {
        let d = [1.0, 2.0, 3.0];
        assert_eq!(distance_insert_idx(&d, 3, 0.5), Some(0));
    }

    #[test]
    fn shift_insert_keeps_buffer_sorted_and_capped() {
        let mut buf = vec![1.0, 3.0, 5.0];
        let evicted = shift_insert(&mut buf, 3, 1, 2.0);
        assert_eq!(buf, vec![1.0, 2.0, 3.0]);
        assert_eq!(evicted, Some(5.0));
    }

    #[test]
    fn shift_insert_does_not_evict_below_capacity() {
        let mut buf = vec![1.0, 3.0];
        let evicted = shift_insert(&mut buf, 5, 1, 2.0);
        assert_eq!(buf, vec![1.0, 2.0, 3.0]);
        assert_eq!(evicted, None);
    }

    #[test]
    fn shift_delete_preserves_order_of_remainder() {
        let mut buf = vec![10, 20, 30];
        let removed = shift_delete(&mut buf, 1);
        assert_eq!(removed, 20);
        assert_eq!(buf, vec![10, 30]);
    }
}
