use core::borrow::Borrow;
use core::mem;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{InternalNode, LeafNode, Node, SearchResult};
use crate::comparator::Comparator;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::tracing_helpers::{debug_log, trace_log};

mod rebalance;

/// The core B+Tree backing `BPlusTreeMap`.
#[derive(Clone)]
pub(crate) struct RawBPlusTreeMap<K, V, C> {
    /// Arena storing all tree nodes.
    nodes: Arena<Node<K, V>>,
    /// Handle to the root node, if the tree is non-empty.
    root: Option<Handle>,
    /// Handle to the leftmost leaf, where every full scan starts.
    first_leaf: Option<Handle>,
    /// Number of levels: 0 when empty, 1 while the root is a leaf.
    height: usize,
    /// Total number of key-value pairs in the tree.
    len: usize,
    /// Bumped on every mutation; cursors compare against it.
    version: u64,
    config: Config,
    comparator: C,
}

/// Where a key lives, or would live, in the leaf level.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Slot {
    Occupied(Handle, usize),
    Vacant(Handle, usize),
}

impl<K, V, C> RawBPlusTreeMap<K, V, C> {
    /// Creates a new, empty tree. Does not allocate.
    pub(crate) const fn new(config: Config, comparator: C) -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            first_leaf: None,
            height: 0,
            len: 0,
            version: 0,
            config,
            comparator,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) const fn height(&self) -> usize {
        self.height
    }

    pub(crate) const fn version(&self) -> u64 {
        self.version
    }

    pub(crate) const fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) const fn comparator(&self) -> &C {
        &self.comparator
    }

    pub(crate) fn first_leaf(&self) -> Option<Handle> {
        self.first_leaf
    }

    /// Node storage, for iterators that walk the leaf chain.
    pub(crate) fn nodes(&self) -> &Arena<Node<K, V>> {
        &self.nodes
    }

    /// Number of live nodes.
    #[cfg(test)]
    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Removes every pair and releases every node.
    pub(crate) fn clear(&mut self) {
        debug_log!(len = self.len, height = self.height, "clearing tree");
        self.release_all();
        self.len = 0;
        self.version += 1;
    }

    fn release_all(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.first_leaf = None;
        self.height = 0;
    }

    /// Descends via first children until a leaf is reached.
    pub(crate) fn min_leaf(&self, mut handle: Handle) -> Handle {
        while let Node::Internal(internal) = self.nodes.get(handle) {
            handle = internal.child(0);
        }
        handle
    }

    /// Descends via last children until a leaf is reached.
    pub(crate) fn max_leaf(&self, mut handle: Handle) -> Handle {
        while let Node::Internal(internal) = self.nodes.get(handle) {
            handle = internal.child(internal.child_count() - 1);
        }
        handle
    }

    /// Returns the last key-value pair, found through the rightmost spine.
    pub(crate) fn last_key_value(&self) -> Option<(&K, &V)> {
        let leaf = self.nodes.get(self.max_leaf(self.root?)).as_leaf();
        let last = leaf.key_count().checked_sub(1)?;
        Some((leaf.key(last), leaf.value(last)))
    }

    pub(crate) fn first_key_value(&self) -> Option<(&K, &V)> {
        let leaf = self.nodes.get(self.first_leaf?).as_leaf();
        if leaf.key_count() == 0 {
            return None;
        }
        Some((leaf.key(0), leaf.value(0)))
    }

    /// Inserts `child` into `parent` at `index` and re-stamps the back-references of
    /// every child at or after `index`.
    fn attach_child(&mut self, parent: Handle, index: usize, key: K, child: Handle) {
        self.nodes.get_mut(parent).as_internal_mut().insert_child(index, key, child);
        self.restamp_children(parent, index);
    }

    /// Removes slot `index` from `parent`, re-stamping the children that shifted left.
    fn detach_child(&mut self, parent: Handle, index: usize) -> (K, Handle) {
        let removed = self.nodes.get_mut(parent).as_internal_mut().remove_child(index);
        self.restamp_children(parent, index);
        removed
    }

    /// Points children `from..` of `parent` back at their slot in `parent`.
    fn restamp_children(&mut self, parent: Handle, from: usize) {
        let count = self.nodes.get(parent).as_internal().child_count();
        for index in from..count {
            let child = self.nodes.get(parent).as_internal().child(index);
            self.nodes.get_mut(child).set_link(Some(parent), index);
        }
    }
}

impl<K: Clone, V, C> RawBPlusTreeMap<K, V, C> {
    /// Copies the first key of `handle` into its parent's separator, continuing upward
    /// while the node is the leftmost child (whose minimum is also its parent's minimum).
    fn update_separators(&mut self, mut handle: Handle) {
        loop {
            let node = self.nodes.get(handle);
            let Some(parent) = node.parent() else {
                return;
            };
            let child_index = node.child_index();
            let min_key = node.first_key().clone();
            self.nodes.get_mut(parent).as_internal_mut().set_key(child_index, min_key);
            if child_index != 0 {
                return;
            }
            handle = parent;
        }
    }

    /// Splits a node that reached `max_key_num` keys, cascading into full ancestors and
    /// growing a new root if the old root splits.
    fn split_node(&mut self, mut handle: Handle) {
        let half = self.config.min_key_num();
        let capacity = self.config.max_key_num();

        loop {
            debug_assert_eq!(self.nodes.get(handle).key_count(), capacity, "split of a non-full node");

            let sibling = match self.nodes.get_mut(handle) {
                Node::Leaf(leaf) => Node::Leaf(leaf.split_off(half, capacity)),
                Node::Internal(internal) => Node::Internal(internal.split_off(half, capacity)),
            };
            let is_leaf = sibling.is_leaf();
            let sibling = self.nodes.alloc(sibling);

            if is_leaf {
                self.nodes.get_mut(handle).as_leaf_mut().set_next(Some(sibling));
            } else {
                self.restamp_children(sibling, 0);
            }
            trace_log!(node = ?handle, ?sibling, is_leaf, "split node");

            let separator = self.nodes.get(sibling).first_key().clone();
            let node = self.nodes.get(handle);
            let Some(parent) = node.parent() else {
                self.grow_root(handle, separator, sibling);
                return;
            };

            let child_index = node.child_index();
            self.attach_child(parent, child_index + 1, separator, sibling);
            if self.nodes.get(parent).key_count() < capacity {
                return;
            }
            handle = parent;
        }
    }

    /// Replaces the root with a new internal node over the old root and its new sibling.
    fn grow_root(&mut self, old_root: Handle, separator: K, sibling: Handle) {
        let mut root = InternalNode::new(self.config.max_key_num());
        root.insert_child(0, self.nodes.get(old_root).first_key().clone(), old_root);
        root.insert_child(1, separator, sibling);

        let root = self.nodes.alloc(Node::Internal(root));
        self.restamp_children(root, 0);
        self.root = Some(root);
        self.height += 1;
        trace_log!(?root, height = self.height, "root split, tree grew");
    }

    /// Allocates the root leaf of an empty tree.
    fn plant_root(&mut self) -> Handle {
        let leaf = self.nodes.alloc(Node::Leaf(LeafNode::new(self.config.max_key_num())));
        self.root = Some(leaf);
        self.first_leaf = Some(leaf);
        self.height = 1;
        trace_log!(root = ?leaf, "planted root leaf");
        leaf
    }

    /// Inserts into a vacant slot of `leaf`, then restores every invariant.
    fn insert_at(&mut self, leaf: Handle, index: usize, key: K, value: V) {
        let node = self.nodes.get_mut(leaf).as_leaf_mut();
        node.insert(index, key, value);
        let full = node.key_count() == self.config.max_key_num();

        if full {
            self.split_node(leaf);
        }
        // The leaf keeps its lower half on split, so a new minimum is still at index 0.
        if index == 0 && self.root != Some(leaf) {
            self.update_separators(leaf);
        }

        self.len += 1;
        self.version += 1;
    }
}

impl<K: Clone, V, C> RawBPlusTreeMap<K, V, C> {
    /// Descends from the root to the leaf slot holding, or able to hold, `key`.
    ///
    /// A separator match in an internal node means the pair is the first entry of the
    /// leftmost leaf under that child, since separators are copies of subtree minimums.
    fn find_slot<Q>(&self, root: Handle, key: &Q) -> Slot
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        let mut handle = root;
        loop {
            let node = self.nodes.get(handle);
            match (node.locate(key, &self.comparator), node) {
                (SearchResult::Found(index), Node::Leaf(_)) => return Slot::Occupied(handle, index),
                (SearchResult::Found(index), Node::Internal(internal)) => {
                    return Slot::Occupied(self.min_leaf(internal.child(index)), 0);
                }
                (SearchResult::BeforeFirst, _) => return Slot::Vacant(self.min_leaf(handle), 0),
                (SearchResult::After(index), Node::Leaf(_)) => return Slot::Vacant(handle, index + 1),
                (SearchResult::After(index), Node::Internal(internal)) => handle = internal.child(index),
            }
        }
    }

    /// Returns the leaf and index storing `key`.
    pub(crate) fn search<Q>(&self, key: &Q) -> Option<(Handle, usize)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        match self.find_slot(self.root?, key) {
            Slot::Occupied(leaf, index) => Some((leaf, index)),
            Slot::Vacant(..) => None,
        }
    }

    pub(crate) fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        let (leaf, index) = self.search(key)?;
        let leaf = self.nodes.get(leaf).as_leaf();
        Some((leaf.key(index), leaf.value(index)))
    }

    pub(crate) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        let (leaf, index) = self.search(key)?;
        Some(self.nodes.get_mut(leaf).as_leaf_mut().value_mut(index))
    }

    /// Inserts a new pair, rejecting keys that are already present.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Result<()>
    where
        C: Comparator<K>,
    {
        let (leaf, index) = match self.root {
            None => (self.plant_root(), 0),
            Some(root) => match self.find_slot(root, &key) {
                Slot::Occupied(..) => return Err(Error::DuplicateKey),
                Slot::Vacant(leaf, index) => (leaf, index),
            },
        };
        self.insert_at(leaf, index, key, value);
        Ok(())
    }

    /// Inserts or overwrites, returning the previous value.
    pub(crate) fn set(&mut self, key: K, value: V) -> Option<V>
    where
        C: Comparator<K>,
    {
        let (leaf, index) = match self.root {
            None => (self.plant_root(), 0),
            Some(root) => match self.find_slot(root, &key) {
                Slot::Occupied(leaf, index) => {
                    let slot = self.nodes.get_mut(leaf).as_leaf_mut().value_mut(index);
                    let old = mem::replace(slot, value);
                    self.version += 1;
                    return Some(old);
                }
                Slot::Vacant(leaf, index) => (leaf, index),
            },
        };
        self.insert_at(leaf, index, key, value);
        None
    }

    /// Removes `key`, returning the stored pair.
    pub(crate) fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        let (leaf, index) = self.search(key)?;
        Some(self.remove_at(leaf, index))
    }

    /// Removes `key` only if it currently maps to a value equal to `value`.
    pub(crate) fn remove_pair<Q>(&mut self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
        V: PartialEq,
    {
        let Some((leaf, index)) = self.search(key) else {
            return false;
        };
        if self.nodes.get(leaf).as_leaf().value(index) != value {
            return false;
        }
        drop(self.remove_at(leaf, index));
        true
    }

    /// Removes and returns the smallest pair.
    pub(crate) fn pop_first(&mut self) -> Option<(K, V)> {
        let leaf = self.first_leaf?;
        Some(self.remove_at(leaf, 0))
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl<K: Clone, V, C: Comparator<K>> RawBPlusTreeMap<K, V, C> {
    /// Keys of every node, grouped by level from the root down.
    pub(crate) fn layers(&self) -> alloc::vec::Vec<alloc::vec::Vec<alloc::vec::Vec<K>>> {
        use alloc::vec::Vec;

        let mut layers = Vec::new();
        let mut level: Vec<Handle> = self.root.into_iter().collect();
        while !level.is_empty() {
            layers.push(level.iter().map(|&h| self.nodes.get(h).keys().to_vec()).collect());
            level = level
                .iter()
                .filter_map(|&h| match self.nodes.get(h) {
                    Node::Internal(internal) => Some(internal.children().iter().copied()),
                    Node::Leaf(_) => None,
                })
                .flatten()
                .collect();
        }
        layers
    }

    /// Validates all structural invariants, panicking with every violation found.
    pub(crate) fn validate_invariants(&self) {
        use alloc::format;
        use alloc::string::String;
        use alloc::vec::Vec;
        use core::cmp::Ordering;

        let Some(root) = self.root else {
            assert_eq!(self.len, 0, "empty tree should have len 0");
            assert_eq!(self.height, 0, "empty tree should have height 0");
            assert!(self.first_leaf.is_none(), "empty tree should have no first_leaf");
            assert!(self.nodes.is_empty(), "empty tree should own no nodes, found {}", self.nodes.len());
            return;
        };

        let mut errors: Vec<String> = Vec::new();
        let min = self.config.min_key_num();
        let max = self.config.max_key_num();

        let root_node = self.nodes.get(root);
        if root_node.parent().is_some() {
            errors.push(format!("root {root:?} has a parent"));
        }
        if let Node::Internal(internal) = root_node
            && internal.child_count() < 2
        {
            errors.push(format!("internal root {root:?} has {} children", internal.child_count()));
        }

        // Depth-first walk, collecting leaves left to right.
        let mut leaves: Vec<Handle> = Vec::new();
        let mut reachable = 0usize;
        let mut stack: Vec<(Handle, usize)> = alloc::vec![(root, 1)];
        while let Some((handle, depth)) = stack.pop() {
            reachable += 1;
            let node = self.nodes.get(handle);
            let keys = node.keys();

            if keys.windows(2).any(|w| self.comparator.compare(&w[0], &w[1]) != Ordering::Less) {
                errors.push(format!("keys not strictly ascending in {handle:?}"));
            }
            if keys.len() >= max {
                errors.push(format!("{handle:?} holds {} keys, split threshold is {max}", keys.len()));
            }
            if Some(handle) != self.root && keys.len() < min {
                errors.push(format!("{handle:?} holds {} keys, minimum is {min}", keys.len()));
            }

            match node {
                Node::Leaf(_) => {
                    if depth != self.height {
                        errors.push(format!("leaf {handle:?} at depth {depth}, height is {}", self.height));
                    }
                    leaves.push(handle);
                }
                Node::Internal(internal) => {
                    if internal.key_count() != internal.child_count() {
                        errors.push(format!("{handle:?} has mismatched key and child counts"));
                    }
                    for (index, &child) in internal.children().iter().enumerate().rev() {
                        let child_node = self.nodes.get(child);
                        if child_node.parent() != Some(handle) || child_node.child_index() != index {
                            errors.push(format!(
                                "{child:?} caches ({:?}, {}), expected ({handle:?}, {index})",
                                child_node.parent(),
                                child_node.child_index()
                            ));
                        }
                        let leftmost = self.nodes.get(self.min_leaf(child)).first_key();
                        if self.comparator.compare(internal.key(index), leftmost) != Ordering::Equal {
                            errors.push(format!("separator {index} of {handle:?} is not the minimum of {child:?}"));
                        }
                        stack.push((child, depth + 1));
                    }
                }
            }
        }

        if reachable != self.nodes.len() {
            errors.push(format!("{} nodes allocated, {reachable} reachable", self.nodes.len()));
        }
        if self.first_leaf != leaves.first().copied() {
            errors.push(format!("first_leaf is {:?}, expected {:?}", self.first_leaf, leaves.first()));
        }
        for (i, &leaf) in leaves.iter().enumerate() {
            let expected = leaves.get(i + 1).copied();
            let next = self.nodes.get(leaf).as_leaf().next();
            if next != expected {
                errors.push(format!("leaf {leaf:?} links to {next:?}, expected {expected:?}"));
            }
        }
        let stored: usize = leaves.iter().map(|&h| self.nodes.get(h).key_count()).sum();
        if stored != self.len {
            errors.push(format!("len is {}, leaves hold {stored}", self.len));
        }

        assert!(errors.is_empty(), "tree invariant violations:\n{}", errors.join("\n"));
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use crate::comparator::{Natural, from_fn};

    fn tree(min_degree: usize) -> RawBPlusTreeMap<i32, i32, Natural> {
        RawBPlusTreeMap::new(Config::new(min_degree).unwrap(), Natural)
    }

    fn ascending(min_degree: usize, keys: core::ops::RangeInclusive<i32>) -> RawBPlusTreeMap<i32, i32, Natural> {
        let mut tree = tree(min_degree);
        for k in keys {
            tree.insert(k, k * 10).unwrap();
            tree.validate_invariants();
        }
        tree
    }

    fn leaf_keys(tree: &RawBPlusTreeMap<i32, i32, Natural>) -> Vec<i32> {
        let mut keys = Vec::new();
        let mut leaf = tree.first_leaf;
        while let Some(handle) = leaf {
            let node = tree.nodes.get(handle).as_leaf();
            keys.extend_from_slice(node.keys());
            leaf = node.next();
        }
        keys
    }

    #[test]
    fn first_insert_plants_root_leaf() {
        let mut tree = tree(2);
        assert_eq!(tree.node_count(), 0);
        tree.insert(7, 70).unwrap();
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.layers(), vec![vec![vec![7]]]);
        tree.validate_invariants();
    }

    #[test]
    fn root_splits_when_full() {
        let tree = ascending(2, 1..=4);
        assert_eq!(tree.height(), 2);
        assert_eq!(tree.layers(), vec![vec![vec![1, 3]], vec![vec![1, 2], vec![3, 4]]]);
    }

    #[test]
    fn ascending_inserts_cascade_into_new_root() {
        let tree = ascending(2, 1..=10);
        assert_eq!(tree.height(), 3);
        assert_eq!(
            tree.layers(),
            vec![
                vec![vec![1, 5]],
                vec![vec![1, 3], vec![5, 7, 9]],
                vec![vec![1, 2], vec![3, 4], vec![5, 6], vec![7, 8], vec![9, 10]],
            ]
        );
        assert_eq!(leaf_keys(&tree), (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn new_minimum_rewrites_separators_up_the_left_spine() {
        let mut tree = ascending(2, 1..=10);
        tree.insert(0, 0).unwrap();
        tree.validate_invariants();
        assert_eq!(tree.layers()[0], vec![vec![0, 5]]);
        assert_eq!(tree.layers()[1][0], vec![0, 3]);
    }

    #[test]
    fn duplicate_is_rejected_without_side_effects() {
        let mut tree = ascending(2, 1..=10);
        let version = tree.version();
        // 5 is both a stored key and a separator at two levels.
        assert_eq!(tree.insert(5, 0), Err(Error::DuplicateKey));
        assert_eq!(tree.insert(6, 0), Err(Error::DuplicateKey));
        assert_eq!(tree.version(), version);
        assert_eq!(tree.len(), 10);
        assert_eq!(tree.get_key_value(&5), Some((&5, &50)));
        tree.validate_invariants();
    }

    #[test]
    fn separator_hit_descends_to_leftmost_leaf() {
        let tree = ascending(2, 1..=10);
        let (leaf, index) = tree.search(&5).unwrap();
        assert_eq!(index, 0);
        assert_eq!(tree.nodes.get(leaf).as_leaf().keys(), &[5, 6]);
        assert!(tree.search(&0).is_none());
        assert!(tree.search(&11).is_none());
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut tree = ascending(2, 1..=6);
        let nodes = tree.node_count();
        assert_eq!(tree.set(3, 333), Some(30));
        assert_eq!(tree.set(11, 110), None);
        assert_eq!(tree.get_key_value(&3), Some((&3, &333)));
        assert_eq!(tree.len(), 7);
        assert!(tree.node_count() >= nodes);
        tree.validate_invariants();
    }

    #[test]
    fn last_key_value_follows_right_spine() {
        let tree = ascending(2, 1..=10);
        assert_eq!(tree.last_key_value(), Some((&10, &100)));
        assert_eq!(tree.first_key_value(), Some((&1, &10)));
    }

    #[test]
    fn custom_comparator_orders_leaf_chain() {
        let mut tree = RawBPlusTreeMap::new(Config::new(2).unwrap(), from_fn(|a: &i32, b: &i32| b.cmp(a)));
        for k in 0..20 {
            tree.insert(k, k).unwrap();
            tree.validate_invariants();
        }
        let mut keys = Vec::new();
        let mut leaf = tree.first_leaf;
        while let Some(handle) = leaf {
            keys.extend_from_slice(tree.nodes.get(handle).as_leaf().keys());
            leaf = tree.nodes.get(handle).as_leaf().next();
        }
        assert_eq!(keys, (0..20).rev().collect::<Vec<_>>());
    }

    #[test]
    fn clear_releases_everything_and_bumps_version() {
        let mut tree = ascending(3, 1..=50);
        let version = tree.version();
        tree.clear();
        assert_eq!(tree.version(), version + 1);
        assert_eq!(tree.node_count(), 0);
        tree.validate_invariants();
        tree.insert(1, 1).unwrap();
        tree.validate_invariants();
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i32),
        Set(i32),
        Remove(i32),
        PopFirst,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0i32..400).prop_map(Op::Insert),
            1 => (0i32..400).prop_map(Op::Set),
            3 => (0i32..400).prop_map(Op::Remove),
            1 => Just(Op::PopFirst),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn invariants_hold_after_every_operation(
            min_degree in 2usize..6,
            ops in prop::collection::vec(op_strategy(), 0..400),
        ) {
            let mut tree = tree(min_degree);
            let mut model = alloc::collections::BTreeMap::new();

            for op in ops {
                match op {
                    Op::Insert(k) => {
                        let expected = if model.contains_key(&k) { Err(Error::DuplicateKey) } else { Ok(()) };
                        prop_assert_eq!(tree.insert(k, k), expected);
                        model.entry(k).or_insert(k);
                    }
                    Op::Set(k) => prop_assert_eq!(tree.set(k, -k), model.insert(k, -k)),
                    Op::Remove(k) => prop_assert_eq!(tree.remove_entry(&k), model.remove_entry(&k)),
                    Op::PopFirst => prop_assert_eq!(tree.pop_first(), model.pop_first()),
                }
                tree.validate_invariants();
            }

            prop_assert_eq!(leaf_keys(&tree), model.keys().copied().collect::<Vec<_>>());
        }
    }
}
