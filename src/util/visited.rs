//! Open-addressed, linear-probing hash set of row ids, sized to the beam
//! width: capacity ≥ 1.3 × `max_candidates`, minimum 256, rounded
//! up to a power of two so probing can use a mask instead of a modulo.
//!
//! The initial sizing is only a hint: a single traversal can expand more
//! distinct rows than `max_candidates` over its lifetime (bounded by graph
//! size, not beam width), so the table doubles and rehashes whenever it
//! crosses a load factor instead of refusing further inserts.

const MIN_CAPACITY: usize = 256;
const EMPTY: i64 = i64::MIN;
const MAX_LOAD_FACTOR: f64 = 0.7;

/// A fixed-capacity visited set for one beam search.
///
/// `i64::MIN` is reserved as the empty-slot sentinel; row ids equal to
/// `i64::MIN` are not representable, which matches SQLite's own `rowid`
/// range in practice (row ids here originate from caller-supplied vector
/// ids via `INTEGER PRIMARY KEY`, never from the sentinel).
pub struct VisitedSet {
    slots: Vec<i64>,
    mask: u64,
    len: usize,
}

impl VisitedSet {
    /// Builds a set sized for a beam of `max_candidates` entries.
    #[must_use]
    pub fn with_capacity_hint(max_candidates: usize) -> Self {
        let wanted = ((max_candidates as f64) * 1.3).ceil() as usize;
        let capacity = wanted.max(MIN_CAPACITY).next_power_of_two();
        VisitedSet {
            slots: vec![EMPTY; capacity],
            mask: (capacity - 1) as u64,
            len: 0,
        }
    }

    /// Number of distinct ids currently recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no ids are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn probe_start(&self, id: i64) -> usize {
        (hash_i64(id) & self.mask) as usize
    }

    /// True if `id` has already been recorded as visited.
    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        let mut i = self.probe_start(id);
        loop {
            match self.slots[i] {
                EMPTY => return false,
                v if v == id => return true,
                _ => i = (i + 1) & self.mask as usize,
            }
        }
    }

    /// Records `id` as visited. Returns `true` if it was newly inserted,
    /// `false` if it was already present.
    ///
    /// Grows (doubles and rehashes) before the load factor would otherwise
    /// be exceeded, so this never fails or panics on valid input regardless
    /// of how many distinct rows a traversal ends up expanding.
    pub fn insert(&mut self, id: i64) -> bool {
        if (self.len + 1) as f64 > self.slots.len() as f64 * MAX_LOAD_FACTOR {
            self.grow();
        }
        let mut i = self.probe_start(id);
        loop {
            match self.slots[i] {
                EMPTY => {
                    self.slots[i] = id;
                    self.len += 1;
                    return true;
                }
                v if v == id => return false,
                _ => i = (i + 1) & self.mask as usize,
            }
        }
    }

    fn grow(&mut self) {
        let new_capacity = self.slots.len() * 2;
        let old_slots = std::mem::replace(&mut self.slots, vec![EMPTY; new_capacity]);
        self.mask = (new_capacity - 1) as u64;
        self.len = 0;
        for id in old_slots {
            if id != EMPTY {
                self.insert_no_grow(id);
            }
        }
    }

    fn insert_no_grow(&mut self, id: i64) {
        let mut i = self.probe_start(id);
        loop {
            match self.slots[i] {
                EMPTY => {
                    self.slots[i] = id;
                    self.len += 1;
                    return;
                }
                v if v == id => return,
                _ => i = (i + 1) & self.mask as usize,
            }
        }
    }
}

fn hash_i64(v: i64) -> u64 {
    // Fibonacci hashing: spreads sequential row ids across slots.
    (v as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_at_least_256_and_a_power_of_two() {
        let set = VisitedSet::with_capacity_hint(1);
        assert!(set.slots.len() >= MIN_CAPACITY);
        assert!(set.slots.len().is_power_of_two());
    }

    #[test]
    fn capacity_scales_with_margin() {
        let set = VisitedSet::with_capacity_hint(1000);
        assert!(set.slots.len() as f64 >= 1.3 * 1000.0);
    }

    #[test]
    fn insert_then_contains() {
        let mut set = VisitedSet::with_capacity_hint(16);
        assert!(!set.contains(42));
        assert!(set.insert(42));
        assert!(set.contains(42));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn reinserting_same_id_is_a_no_op() {
        let mut set = VisitedSet::with_capacity_hint(16);
        assert!(set.insert(7));
        assert!(!set.insert(7));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn handles_collisions_via_linear_probing() {
        let mut set = VisitedSet::with_capacity_hint(4);
        let cap = set.slots.len() as i64;
        // Ids that collide modulo the table's power-of-two size still all
        // get recorded distinctly.
        for i in 0..cap {
            set.insert(i * cap);
        }
        for i in 0..cap {
            assert!(set.contains(i * cap));
        }
        assert_eq!(set.len() as i64, cap);
    }

    #[test]
    fn grows_past_its_initial_hint_without_panicking() {
        // Sized for a tiny beam, but the traversal below visits far more
        // distinct rows than that — this must grow rather than panic.
        let mut set = VisitedSet::with_capacity_hint(1);
        let initial_capacity = set.slots.len();
        for id in 0..(initial_capacity as i64 * 10) {
            assert!(set.insert(id));
        }
        assert!(set.slots.len() > initial_capacity);
        assert_eq!(set.len(), initial_capacity * 10);
        for id in 0..(initial_capacity as i64 * 10) {
            assert!(set.contains(id));
        }
    }

    #[test]
    fn reinserting_after_growth_still_reports_already_present() {
        let mut set = VisitedSet::with_capacity_hint(1);
        let initial_capacity = set.slots.len();
        for id in 0..(initial_capacity as i64 * 5) {
            set.insert(id);
        }
        assert!(!set.insert(0));
        assert_eq!(set.len(), initial_capacity * 5);
    }
}
