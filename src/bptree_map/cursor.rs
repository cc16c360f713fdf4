use super::BPlusTreeMap;
use crate::error::{Error, Result};
use crate::raw::Handle;

/// A detached position in a [`BPlusTreeMap`]'s leaf chain.
///
/// A `Cursor` holds no borrow of the map. Instead it remembers the map's
/// [`version`](BPlusTreeMap::version) at creation, and every call to [`next`](Self::next)
/// checks it: once the map has been modified, the cursor reports
/// [`Error::InvalidState`] and never yields again.
///
/// Passing a map other than the one that created the cursor is a logic error; it may
/// panic or yield arbitrary pairs, but never causes undefined behavior.
///
/// # Examples
///
/// ```
/// use leafchain::BPlusTreeMap;
///
/// let mut map = BPlusTreeMap::with_degree(2).unwrap();
/// map.extend((1..=6).map(|k| (k, k * 10)));
///
/// let mut cursor = map.cursor();
/// let mut seen = Vec::new();
/// while let Some((k, v)) = cursor.next(&map).unwrap() {
///     seen.push((*k, *v));
/// }
/// assert_eq!(seen.len(), 6);
/// assert_eq!(seen[0], (1, 10));
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cursor {
    snapshot: u64,
    leaf: Option<Handle>,
    index: usize,
}

impl Cursor {
    pub(super) const fn new(snapshot: u64, first_leaf: Option<Handle>) -> Self {
        Self {
            snapshot,
            leaf: first_leaf,
            index: 0,
        }
    }

    /// The map version this cursor was created against.
    #[must_use]
    pub const fn snapshot(&self) -> u64 {
        self.snapshot
    }

    /// Returns `true` if `map` has not been modified since the cursor was created.
    #[must_use]
    pub fn is_valid<K, V, C>(&self, map: &BPlusTreeMap<K, V, C>) -> bool {
        self.snapshot == map.version()
    }

    /// Advances to the next pair in key order.
    ///
    /// Returns `Ok(None)` once the last pair has been yielded, and keeps doing so.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if `map` was modified after the cursor was created. This is
    /// checked before the end-of-chain test, so an exhausted cursor still notices.
    pub fn next<'m, K, V, C>(&mut self, map: &'m BPlusTreeMap<K, V, C>) -> Result<Option<(&'m K, &'m V)>> {
        let current = map.version();
        if current != self.snapshot {
            return Err(Error::InvalidState {
                snapshot: self.snapshot,
                current,
            });
        }

        let Some(handle) = self.leaf else {
            return Ok(None);
        };
        let leaf = map.raw().nodes().get(handle).as_leaf();
        let item = (leaf.key(self.index), leaf.value(self.index));

        self.index += 1;
        if self.index >= leaf.key_count() {
            self.leaf = leaf.next();
            self.index = 0;
        }
        Ok(Some(item))
    }
}
