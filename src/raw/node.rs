use alloc::vec::Vec;
use core::borrow::Borrow;
use core::cmp::Ordering;

use smallvec::SmallVec;

use super::handle::Handle;
use crate::comparator::Comparator;
use crate::config::DEFAULT_MIN_DEGREE;

/// Child handles stay inline for trees built with the default degree.
pub(crate) const INLINE_CHILDREN: usize = DEFAULT_MIN_DEGREE * 2;

pub(crate) type Children = SmallVec<[Handle; INLINE_CHILDREN]>;

#[derive(Clone)]
pub(crate) enum Node<K, V> {
    Internal(InternalNode<K>),
    Leaf(LeafNode<K, V>),
}

// B+Tree: internal nodes hold one separator per child.
// keys[i] is a copy of the smallest key stored under children[i].
#[derive(Clone)]
pub(crate) struct InternalNode<K> {
    parent: Option<Handle>,
    child_index: usize,
    keys: Vec<K>,
    children: Children,
}

// B+Tree: leaves own the pairs and link to the next leaf in key order.
#[derive(Clone)]
pub(crate) struct LeafNode<K, V> {
    parent: Option<Handle>,
    child_index: usize,
    next: Option<Handle>,
    keys: Vec<K>,
    values: Vec<V>,
}

/// Outcome of [`locate`] within one node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SearchResult {
    /// The key is stored at this index.
    Found(usize),
    /// The key is absent; this is the index of the greatest key below it.
    After(usize),
    /// The key is smaller than every key in the node (or the node is empty).
    BeforeFirst,
}

/// Binary search for the greatest key `<= key`.
#[inline]
pub(crate) fn locate<K, Q, C>(keys: &[K], key: &Q, comparator: &C) -> SearchResult
where
    K: Borrow<Q>,
    Q: ?Sized,
    C: Comparator<Q> + ?Sized,
{
    let below = keys.partition_point(|k| comparator.compare(k.borrow(), key) == Ordering::Less);
    if below < keys.len() && comparator.compare(keys[below].borrow(), key) == Ordering::Equal {
        SearchResult::Found(below)
    } else if below == 0 {
        SearchResult::BeforeFirst
    } else {
        SearchResult::After(below - 1)
    }
}

impl<K, V> Node<K, V> {
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Returns the leaf node, panicking if this is not a leaf.
    pub(crate) fn as_leaf(&self) -> &LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the leaf node mutably, panicking if this is not a leaf.
    pub(crate) fn as_leaf_mut(&mut self) -> &mut LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the internal node, panicking if this is not internal.
    pub(crate) fn as_internal(&self) -> &InternalNode<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    /// Returns the internal node mutably, panicking if this is not internal.
    pub(crate) fn as_internal_mut(&mut self) -> &mut InternalNode<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    pub(crate) fn keys(&self) -> &[K] {
        match self {
            Node::Internal(internal) => &internal.keys,
            Node::Leaf(leaf) => &leaf.keys,
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys().len()
    }

    /// Smallest key under this node. Only valid for non-empty nodes.
    pub(crate) fn first_key(&self) -> &K {
        &self.keys()[0]
    }

    pub(crate) fn parent(&self) -> Option<Handle> {
        match self {
            Node::Internal(internal) => internal.parent,
            Node::Leaf(leaf) => leaf.parent,
        }
    }

    pub(crate) fn child_index(&self) -> usize {
        match self {
            Node::Internal(internal) => internal.child_index,
            Node::Leaf(leaf) => leaf.child_index,
        }
    }

    /// Updates the cached back-reference to the parent slot holding this node.
    pub(crate) fn set_link(&mut self, parent: Option<Handle>, child_index: usize) {
        let (p, i) = match self {
            Node::Internal(internal) => (&mut internal.parent, &mut internal.child_index),
            Node::Leaf(leaf) => (&mut leaf.parent, &mut leaf.child_index),
        };
        *p = parent;
        *i = child_index;
    }

    #[inline]
    pub(crate) fn locate<Q, C>(&self, key: &Q, comparator: &C) -> SearchResult
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q> + ?Sized,
    {
        locate(self.keys(), key, comparator)
    }
}

impl<K> InternalNode<K> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            parent: None,
            child_index: 0,
            keys: Vec::with_capacity(capacity),
            children: SmallVec::with_capacity(capacity),
        }
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Also the number of separators.
    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    pub(crate) fn set_key(&mut self, index: usize, key: K) {
        self.keys[index] = key;
    }

    #[inline]
    pub(crate) fn child(&self, index: usize) -> Handle {
        self.children[index]
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub(crate) fn children(&self) -> &[Handle] {
        &self.children
    }

    /// Inserts a separator and its child at `index`, shifting later slots right.
    ///
    /// The caller re-stamps the cached `child_index` of every child from `index` on.
    pub(crate) fn insert_child(&mut self, index: usize, key: K, child: Handle) {
        debug_assert!(index <= self.keys.len(), "insert_child index {index} out of bounds");
        self.keys.insert(index, key);
        self.children.insert(index, child);
    }

    /// Removes the separator and child at `index`, shifting later slots left.
    pub(crate) fn remove_child(&mut self, index: usize) -> (K, Handle) {
        debug_assert!(index < self.keys.len(), "remove_child index {index} out of bounds");
        (self.keys.remove(index), self.children.remove(index))
    }

    /// Moves slots `at..` into a new right sibling. Moved children still point at `self`.
    pub(crate) fn split_off(&mut self, at: usize, capacity: usize) -> InternalNode<K> {
        let mut right = InternalNode::new(capacity);
        right.keys.extend(self.keys.drain(at..));
        right.children.extend(self.children.drain(at..));
        right
    }

    /// Appends every slot of `right`. Moved children still point at `right`.
    pub(crate) fn merge_with_right(&mut self, mut right: InternalNode<K>) {
        self.keys.append(&mut right.keys);
        self.children.extend(right.children.drain(..));
    }
}

impl<K, V> LeafNode<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            parent: None,
            child_index: 0,
            next: None,
            keys: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// The leaf to the right of this one, if any.
    pub(crate) fn next(&self) -> Option<Handle> {
        self.next
    }

    pub(crate) fn set_next(&mut self, next: Option<Handle>) {
        self.next = next;
    }

    #[inline]
    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    #[inline]
    pub(crate) fn value(&self, index: usize) -> &V {
        &self.values[index]
    }

    #[inline]
    pub(crate) fn value_mut(&mut self, index: usize) -> &mut V {
        &mut self.values[index]
    }

    #[cfg(test)]
    pub(crate) fn values(&self) -> &[V] {
        &self.values
    }

    /// Inserts a pair at `index`, shifting later pairs right.
    pub(crate) fn insert(&mut self, index: usize, key: K, value: V) {
        debug_assert!(index <= self.keys.len(), "leaf insert index {index} out of bounds");
        self.keys.insert(index, key);
        self.values.insert(index, value);
    }

    /// Removes the pair at `index`, shifting later pairs left.
    pub(crate) fn remove(&mut self, index: usize) -> (K, V) {
        debug_assert!(index < self.keys.len(), "leaf remove index {index} out of bounds");
        (self.keys.remove(index), self.values.remove(index))
    }

    /// Moves pairs `at..` into a new right sibling, which inherits this leaf's `next`.
    ///
    /// `self.next` is left empty; the caller points it at the sibling once allocated.
    pub(crate) fn split_off(&mut self, at: usize, capacity: usize) -> LeafNode<K, V> {
        let mut right = LeafNode::new(capacity);
        right.keys.extend(self.keys.drain(at..));
        right.values.extend(self.values.drain(at..));
        right.next = self.next.take();
        right
    }

    /// Appends every pair of `right` and takes over its place in the leaf chain.
    pub(crate) fn merge_with_right(&mut self, mut right: LeafNode<K, V>) {
        self.keys.append(&mut right.keys);
        self.values.append(&mut right.values);
        self.next = right.next;
    }
}
