use super::super::handle::Handle;
use super::super::node::Node;
use super::RawBPlusTreeMap;
use crate::tracing_helpers::trace_log;

/// One slot moved between siblings during a rotation.
enum Moved<K, V> {
    Pair(K, V),
    Child(K, Handle),
}

impl<K: Clone, V, C> RawBPlusTreeMap<K, V, C> {
    /// Removes the pair at `index` of `leaf` and restores every invariant.
    pub(crate) fn remove_at(&mut self, leaf: Handle, index: usize) -> (K, V) {
        let removed = self.nodes.get_mut(leaf).as_leaf_mut().remove(index);
        self.len -= 1;
        self.version += 1;

        if self.len == 0 {
            trace_log!("last pair removed, releasing root");
            self.release_all();
            return removed;
        }
        if self.root == Some(leaf) {
            return removed;
        }

        if index == 0 {
            self.update_separators(leaf);
        }
        if self.nodes.get(leaf).key_count() < self.config.min_key_num() {
            self.rebalance(leaf);
        }
        removed
    }

    /// Fixes an underflowing non-root node by borrowing from a sibling, or merging with
    /// one and repeating on the parent if that leaves the parent short.
    ///
    /// The right sibling is preferred both as lender and as merge partner.
    fn rebalance(&mut self, mut handle: Handle) {
        let min = self.config.min_key_num();

        loop {
            let node = self.nodes.get(handle);
            let parent = node.parent().expect("rebalance called on the root");
            let child_index = node.child_index();

            let siblings = self.nodes.get(parent).as_internal();
            let right = (child_index + 1 < siblings.child_count()).then(|| siblings.child(child_index + 1));
            let left = child_index.checked_sub(1).map(|i| siblings.child(i));

            if let Some(right) = right
                && self.nodes.get(right).key_count() > min
            {
                self.rotate_left(handle, right, parent, child_index);
                return;
            }
            if let Some(left) = left
                && self.nodes.get(left).key_count() > min
            {
                self.rotate_right(handle, left, parent, child_index);
                return;
            }

            match (left, right) {
                (_, Some(right)) => self.merge_with_right(handle, right, parent),
                (Some(left), None) => self.merge_with_right(left, handle, parent),
                (None, None) => unreachable!("non-root node {handle:?} has no siblings"),
            }

            let remaining = self.nodes.get(parent).key_count();
            if self.root == Some(parent) {
                if remaining < 2 {
                    self.collapse_root(parent);
                }
                return;
            }
            if remaining >= min {
                return;
            }
            handle = parent;
        }
    }

    /// Moves the right sibling's first slot onto the end of `handle`.
    fn rotate_left(&mut self, handle: Handle, right: Handle, parent: Handle, child_index: usize) {
        let moved = self.take_slot(right, 0);
        let end = self.nodes.get(handle).key_count();
        self.put_slot(handle, end, moved);

        let separator = self.nodes.get(right).first_key().clone();
        self.nodes.get_mut(parent).as_internal_mut().set_key(child_index + 1, separator);
        trace_log!(node = ?handle, lender = ?right, "borrowed from right sibling");
    }

    /// Moves the left sibling's last slot onto the front of `handle`.
    fn rotate_right(&mut self, handle: Handle, left: Handle, parent: Handle, child_index: usize) {
        let last = self.nodes.get(left).key_count() - 1;
        let moved = self.take_slot(left, last);
        self.put_slot(handle, 0, moved);

        let separator = self.nodes.get(handle).first_key().clone();
        self.nodes.get_mut(parent).as_internal_mut().set_key(child_index, separator);
        trace_log!(node = ?handle, lender = ?left, "borrowed from left sibling");
    }

    fn take_slot(&mut self, handle: Handle, index: usize) -> Moved<K, V> {
        match self.nodes.get_mut(handle) {
            Node::Leaf(leaf) => {
                let (key, value) = leaf.remove(index);
                Moved::Pair(key, value)
            }
            Node::Internal(internal) => {
                let (key, child) = internal.remove_child(index);
                self.restamp_children(handle, index);
                Moved::Child(key, child)
            }
        }
    }

    fn put_slot(&mut self, handle: Handle, index: usize, moved: Moved<K, V>) {
        match moved {
            Moved::Pair(key, value) => self.nodes.get_mut(handle).as_leaf_mut().insert(index, key, value),
            Moved::Child(key, child) => self.attach_child(handle, index, key, child),
        }
    }

    /// Absorbs `right` into `left` (adjacent children of `parent`), drops `right` from
    /// the arena and removes its slot from `parent`.
    fn merge_with_right(&mut self, left: Handle, right: Handle, parent: Handle) {
        let absorbed = self.nodes.take(right);
        let right_index = absorbed.child_index();
        debug_assert_eq!(absorbed.parent(), Some(parent), "merging nodes with different parents");
        debug_assert!(
            self.nodes.get(left).key_count() + absorbed.key_count() < self.config.max_key_num(),
            "merged node would overflow"
        );

        let moved_children = match (self.nodes.get_mut(left), absorbed) {
            (Node::Leaf(left), Node::Leaf(right)) => {
                left.merge_with_right(right);
                None
            }
            (Node::Internal(left), Node::Internal(right)) => {
                let offset = left.child_count();
                left.merge_with_right(right);
                Some(offset)
            }
            _ => unreachable!("siblings {left:?} and {right:?} are at different depths"),
        };
        if let Some(offset) = moved_children {
            self.restamp_children(left, offset);
        }

        let (_, detached) = self.detach_child(parent, right_index);
        debug_assert_eq!(detached, right);
        trace_log!(node = ?left, absorbed = ?right, "merged siblings");
    }

    /// Replaces a root left with a single child by that child.
    fn collapse_root(&mut self, root: Handle) {
        let only = self.nodes.get(root).as_internal().child(0);
        self.nodes.free(root);
        self.nodes.get_mut(only).set_link(None, 0);
        self.root = Some(only);
        self.height -= 1;
        trace_log!(root = ?only, height = self.height, "root collapsed, tree shrank");
    }
}
