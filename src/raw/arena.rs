use alloc::vec::Vec;

use super::handle::Handle;

/// Slot storage for tree nodes.
///
/// Nodes refer to each other (children, parent, next leaf) by [`Handle`] rather than by
/// pointer. Taking a node out of the arena empties its slot, so a handle to a merged-away
/// node can never observe stale contents; any such access panics instead. Vacated slots
/// are reused last-in first-out.
#[derive(Clone)]
pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
    vacant: Vec<Handle>,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            vacant: Vec::new(),
        }
    }

    /// Number of live nodes.
    #[cfg(any(test, feature = "test-utils"))]
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores `node`, preferring the most recently vacated slot.
    pub(crate) fn alloc(&mut self, node: T) -> Handle {
        if let Some(handle) = self.vacant.pop() {
            let slot = &mut self.slots[handle.to_index()];
            debug_assert!(slot.is_none(), "vacant list holds live slot {handle:?}");
            *slot = Some(node);
            return handle;
        }

        let index = self.slots.len();
        assert!(index <= Handle::MAX, "`Arena::alloc()` - no handle left for slot {index}");
        self.slots.push(Some(node));
        Handle::from_index(index)
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        match self.slots.get(handle.to_index()) {
            Some(Some(node)) => node,
            _ => panic!("`Arena::get()` - no live node at {handle:?}"),
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        match self.slots.get_mut(handle.to_index()) {
            Some(Some(node)) => node,
            _ => panic!("`Arena::get_mut()` - no live node at {handle:?}"),
        }
    }

    /// Moves the node out, vacating its slot.
    pub(crate) fn take(&mut self, handle: Handle) -> T {
        let node = self
            .slots
            .get_mut(handle.to_index())
            .and_then(Option::take)
            .unwrap_or_else(|| panic!("`Arena::take()` - no live node at {handle:?}"));
        self.vacant.push(handle);
        node
    }

    /// Drops the node in place, vacating its slot.
    pub(crate) fn free(&mut self, handle: Handle) {
        drop(self.take(handle));
    }

    /// Drops every node and forgets all handles.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.vacant.clear();
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use proptest::prelude::*;

    #[test]
    fn merged_away_slot_is_recycled_for_next_split() {
        let mut arena: Arena<&str> = Arena::new();
        let left = arena.alloc("left");
        let right = arena.alloc("right");
        assert_eq!(arena.take(right), "right");
        assert_eq!(arena.len(), 1);

        let sibling = arena.alloc("sibling");
        assert_eq!(sibling, right);
        assert_eq!(*arena.get(left), "left");
        assert_eq!(*arena.get(sibling), "sibling");
    }

    #[test]
    #[should_panic(expected = "`Arena::get()` - no live node at #0")]
    fn stale_handle_panics() {
        let mut arena: Arena<u32> = Arena::new();
        let h = arena.alloc(1);
        arena.free(h);
        let _ = arena.get(h);
    }

    #[test]
    fn clear_restarts_numbering() {
        let mut arena: Arena<u8> = Arena::new();
        for n in 0..5 {
            arena.alloc(n);
        }
        arena.clear();
        assert!(arena.is_empty());
        assert_eq!(arena.alloc(9).to_index(), 0);
    }

    #[derive(Clone, Debug)]
    enum Step {
        Alloc(u16),
        Update(usize, u16),
        Take(usize),
        Clear,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            8 => any::<u16>().prop_map(Step::Alloc),
            3 => (any::<usize>(), any::<u16>()).prop_map(|(pick, v)| Step::Update(pick, v)),
            4 => any::<usize>().prop_map(Step::Take),
            1 => Just(Step::Clear),
        ]
    }

    proptest! {
        /// Live handles always resolve to the last value written, and a vacated handle
        /// is the next one handed out.
        #[test]
        fn handles_track_live_nodes(steps in prop::collection::vec(step(), 0..200)) {
            let mut arena: Arena<u16> = Arena::new();
            let mut live: BTreeMap<usize, u16> = BTreeMap::new();
            let mut last_vacated = None;

            for step in steps {
                match step {
                    Step::Alloc(v) => {
                        let handle = arena.alloc(v);
                        if let Some(expected) = last_vacated.take() {
                            prop_assert_eq!(handle, expected);
                        }
                        prop_assert!(live.insert(handle.to_index(), v).is_none());
                    }
                    Step::Update(pick, v) if !live.is_empty() => {
                        let index = *live.keys().nth(pick % live.len()).unwrap();
                        *arena.get_mut(Handle::from_index(index)) = v;
                        live.insert(index, v);
                    }
                    Step::Take(pick) if !live.is_empty() => {
                        let index = *live.keys().nth(pick % live.len()).unwrap();
                        let handle = Handle::from_index(index);
                        prop_assert_eq!(Some(arena.take(handle)), live.remove(&index));
                        last_vacated = Some(handle);
                    }
                    Step::Clear => {
                        arena.clear();
                        live.clear();
                        last_vacated = None;
                    }
                    Step::Update(..) | Step::Take(_) => {}
                }

                prop_assert_eq!(arena.len(), live.len());
                for (&index, &v) in &live {
                    prop_assert_eq!(*arena.get(Handle::from_index(index)), v);
                }
            }
        }
    }
}
