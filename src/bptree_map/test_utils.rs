use alloc::vec::Vec;

use super::BPlusTreeMap;
use crate::comparator::Comparator;

impl<K: Clone, V, C: Comparator<K>> BPlusTreeMap<K, V, C> {
    /// Asserts every structural invariant of the tree, panicking with a list of violations.
    ///
    /// Checked: key order within nodes, occupancy bounds, uniform leaf depth, separator
    /// keys equal to subtree minimums, parent back-references, the leaf chain and `len`.
    ///
    /// # Panics
    ///
    /// Panics if any invariant is violated.
    pub fn assert_invariants(&self) {
        self.raw.validate_invariants();
    }

    /// Keys of every node, level by level from the root down, nodes left to right.
    #[must_use]
    pub fn layers(&self) -> Vec<Vec<Vec<K>>> {
        self.raw.layers()
    }
}
