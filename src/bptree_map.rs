use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;
use core::ops::Index;

use crate::comparator::{Comparator, Natural};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::raw::{Arena, Handle, LeafNode, Node, RawBPlusTreeMap};
use crate::tracing_helpers::debug_log;

mod cursor;
#[cfg(any(test, feature = "test-utils"))]
mod test_utils;

pub use cursor::Cursor;

/// An ordered map based on a [B+Tree] with a chained leaf level.
///
/// Keys are kept in the order defined by the map's [`Comparator`] (by default [`Natural`],
/// i.e. the key type's [`Ord`]). Pairs live only in the leaves; internal nodes hold copies
/// of the smallest key below each child and are used purely for routing. Every leaf links
/// to its right neighbour, so a full scan never revisits internal nodes.
///
/// Lookups, insertions and removals touch a single root-to-leaf path and run in
/// O(log n). Iteration is O(n).
///
/// Unlike `std::collections::BTreeMap`, [`insert`](Self::insert) refuses to overwrite an
/// existing key; [`set`](Self::set) is the upserting variant.
///
/// It is a logic error for a key to be modified in such a way that its ordering relative to
/// any other key changes while it is in the map. The behavior resulting from such a logic
/// error is not specified, but will be encapsulated to the map that observed it and not
/// result in undefined behavior.
///
/// # Examples
///
/// ```
/// use leafchain::{BPlusTreeMap, Error};
///
/// let mut index = BPlusTreeMap::with_degree(2).unwrap();
/// for (id, name) in [(3, "carol"), (1, "alice"), (2, "bob")] {
///     index.insert(id, name).unwrap();
/// }
///
/// assert_eq!(index.get(&2), Some(&"bob"));
/// assert_eq!(index.insert(2, "bobby"), Err(Error::DuplicateKey));
/// assert_eq!(index.set(2, "bobby"), Some("bob"));
/// assert_eq!(index.fetch(&4), Err(Error::KeyNotFound));
///
/// let names: Vec<_> = index.values().copied().collect();
/// assert_eq!(names, ["alice", "bobby", "carol"]);
/// ```
///
/// [B+Tree]: https://en.wikipedia.org/wiki/B%2B_tree
pub struct BPlusTreeMap<K, V, C = Natural> {
    raw: RawBPlusTreeMap<K, V, C>,
}

/// An iterator over the entries of a `BPlusTreeMap`, in key order.
///
/// This `struct` is created by the [`iter`](BPlusTreeMap::iter) method on
/// [`BPlusTreeMap`]. It walks the leaf chain and borrows the map, so the map cannot be
/// modified while the iterator is alive. See [`Cursor`] for a detached alternative.
pub struct Iter<'a, K, V> {
    nodes: &'a Arena<Node<K, V>>,
    leaf: Option<Handle>,
    index: usize,
    remaining: usize,
}

/// An iterator over the keys of a `BPlusTreeMap`, in order.
///
/// This `struct` is created by the [`keys`](BPlusTreeMap::keys) method.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

/// An iterator over the values of a `BPlusTreeMap`, in key order.
///
/// This `struct` is created by the [`values`](BPlusTreeMap::values) method.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<K, V> BPlusTreeMap<K, V> {
    /// Makes a new, empty map ordered by `K`'s [`Ord`], using
    /// [`DEFAULT_MIN_DEGREE`](crate::DEFAULT_MIN_DEGREE).
    ///
    /// Does not allocate anything on its own; the root leaf is created by the first insert.
    ///
    /// # Examples
    ///
    /// ```
    /// use leafchain::BPlusTreeMap;
    ///
    /// let mut map = BPlusTreeMap::new();
    /// map.insert(1, "a").unwrap();
    /// assert_eq!(map.height(), 1);
    /// ```
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raw: RawBPlusTreeMap::new(
                match Config::new(crate::config::DEFAULT_MIN_DEGREE) {
                    Ok(config) => config,
                    Err(_) => unreachable!(),
                },
                Natural,
            ),
        }
    }

    /// Makes a new, empty map with minimum degree `min_degree`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDegree`] if `min_degree < 2` or `min_degree > MAX_MIN_DEGREE`.
    ///
    /// # Examples
    ///
    /// ```
    /// use leafchain::{BPlusTreeMap, Error};
    ///
    /// let map: BPlusTreeMap<u32, u32> = BPlusTreeMap::with_degree(2).unwrap();
    /// assert_eq!(map.min_degree(), 2);
    /// assert!(matches!(BPlusTreeMap::<u32, u32>::with_degree(1), Err(Error::InvalidDegree { .. })));
    /// ```
    pub fn with_degree(min_degree: usize) -> Result<Self> {
        Ok(Self::with_config(Config::new(min_degree)?, Natural))
    }

    /// Builds a map from `pairs` by inserting them one at a time.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateKey`] if two pairs share a key.
    ///
    /// # Examples
    ///
    /// ```
    /// use leafchain::{BPlusTreeMap, Error};
    ///
    /// let map = BPlusTreeMap::from_pairs([(2, 'b'), (1, 'a')]).unwrap();
    /// assert_eq!(map.first_key_value(), Some((&1, &'a')));
    ///
    /// assert_eq!(BPlusTreeMap::from_pairs([(1, 'a'), (1, 'b')]).unwrap_err(), Error::DuplicateKey);
    /// ```
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        K: Ord + Clone,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::from_pairs_with(Config::default(), Natural, pairs)
    }
}

impl<K, V, C> BPlusTreeMap<K, V, C> {
    /// Makes a new, empty map ordered by `comparator`, using the default degree.
    #[must_use]
    pub fn with_comparator(comparator: C) -> Self {
        Self::with_config(Config::default(), comparator)
    }

    /// Makes a new, empty map with an explicit shape and order.
    #[must_use]
    pub fn with_config(config: Config, comparator: C) -> Self {
        Self {
            raw: RawBPlusTreeMap::new(config, comparator),
        }
    }

    /// Returns the number of elements in the map.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the map contains no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Number of levels in the tree: 0 when empty, 1 while everything fits in one leaf.
    ///
    /// # Examples
    ///
    /// ```
    /// use leafchain::BPlusTreeMap;
    ///
    /// let mut map = BPlusTreeMap::with_degree(2).unwrap();
    /// assert_eq!(map.height(), 0);
    /// for k in 0..4 {
    ///     map.insert(k, ()).unwrap();
    /// }
    /// // The fourth key filled the root leaf and split it.
    /// assert_eq!(map.height(), 2);
    /// ```
    #[must_use]
    pub const fn height(&self) -> usize {
        self.raw.height()
    }

    /// The minimum degree `t` the map was built with.
    #[must_use]
    pub const fn min_degree(&self) -> usize {
        self.raw.config().min_degree()
    }

    /// The map's configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        self.raw.config()
    }

    /// The comparator ordering the map's keys.
    #[must_use]
    pub const fn comparator(&self) -> &C {
        self.raw.comparator()
    }

    /// Mutation counter, bumped by every insert, overwrite, removal and clear.
    ///
    /// Calls that leave the map untouched (a rejected duplicate, removing an absent key)
    /// do not change it.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.raw.version()
    }

    /// Clears the map, removing all elements and releasing every node.
    ///
    /// # Examples
    ///
    /// ```
    /// use leafchain::BPlusTreeMap;
    ///
    /// let mut a = BPlusTreeMap::new();
    /// a.insert(1, "a").unwrap();
    /// a.clear();
    /// assert!(a.is_empty());
    /// assert_eq!(a.height(), 0);
    /// ```
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Returns the first key-value pair in the map, the one with the minimum key.
    ///
    /// O(1): the first leaf is cached.
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.raw.first_key_value()
    }

    /// Returns the last key-value pair in the map, the one with the maximum key.
    ///
    /// O(log n): descends the rightmost spine.
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.raw.last_key_value()
    }

    /// Gets an iterator over the entries of the map, sorted by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use leafchain::BPlusTreeMap;
    ///
    /// let map = BPlusTreeMap::from_pairs([(3, "c"), (2, "b"), (1, "a")]).unwrap();
    ///
    /// for (key, value) in map.iter() {
    ///     println!("{key}: {value}");
    /// }
    ///
    /// let (first_key, first_value) = map.iter().next().unwrap();
    /// assert_eq!((*first_key, *first_value), (1, "a"));
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: self.raw.nodes(),
            leaf: self.raw.first_leaf(),
            index: 0,
            remaining: self.raw.len(),
        }
    }

    /// Gets an iterator over the keys of the map, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Gets an iterator over the values of the map, in order by key.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Starts a detached, version-checked walk over the map.
    ///
    /// The cursor does not borrow the map, so the map may be modified while the cursor
    /// exists; the next [`Cursor::next`] call then fails with [`Error::InvalidState`].
    ///
    /// # Examples
    ///
    /// ```
    /// use leafchain::{BPlusTreeMap, Error};
    ///
    /// let mut map = BPlusTreeMap::from_pairs([(1, "a"), (2, "b")]).unwrap();
    /// let mut cursor = map.cursor();
    /// assert_eq!(cursor.next(&map), Ok(Some((&1, &"a"))));
    ///
    /// map.insert(3, "c").unwrap();
    /// assert!(matches!(cursor.next(&map), Err(Error::InvalidState { .. })));
    /// ```
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.raw.version(), self.raw.first_leaf())
    }

    /// Returns `true` if any key maps to `value`. Scans every pair: O(n).
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values().any(|v| v == value)
    }

    pub(crate) fn raw(&self) -> &RawBPlusTreeMap<K, V, C> {
        &self.raw
    }
}

impl<K: Clone, V, C: Comparator<K>> BPlusTreeMap<K, V, C> {
    /// Builds a map with an explicit shape and order from `pairs`, inserting them one at
    /// a time.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateKey`] if two pairs share a key under `comparator`.
    pub fn from_pairs_with<I>(config: Config, comparator: C, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::with_config(config, comparator);
        for (key, value) in pairs {
            map.insert(key, value)?;
        }
        debug_log!(len = map.len(), height = map.height(), "bulk load complete");
        Ok(map)
    }

    /// Inserts a new key-value pair.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateKey`] if `key` is already present; the map is left unchanged and
    /// `key` and `value` are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use leafchain::{BPlusTreeMap, Error};
    ///
    /// let mut map = BPlusTreeMap::new();
    /// assert_eq!(map.insert(37, "a"), Ok(()));
    /// assert_eq!(map.insert(37, "b"), Err(Error::DuplicateKey));
    /// assert_eq!(map[&37], "a");
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        self.raw.insert(key, value)
    }

    /// Inserts `value` under `key`, overwriting and returning any previous value.
    ///
    /// An overwrite keeps the stored key and counts as a mutation for open cursors.
    ///
    /// # Examples
    ///
    /// ```
    /// use leafchain::BPlusTreeMap;
    ///
    /// let mut map = BPlusTreeMap::new();
    /// assert_eq!(map.set(37, "a"), None);
    /// assert_eq!(map.set(37, "b"), Some("a"));
    /// assert_eq!(map[&37], "b");
    /// ```
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        self.raw.set(key, value)
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, as long as the comparator
    /// orders the borrowed form the same way.
    ///
    /// # Examples
    ///
    /// ```
    /// use leafchain::BPlusTreeMap;
    ///
    /// let mut map = BPlusTreeMap::new();
    /// map.insert(String::from("one"), 1).unwrap();
    /// assert_eq!(map.get("one"), Some(&1));
    /// assert_eq!(map.get("two"), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.get_key_value(key).map(|(_, v)| v)
    }

    /// Returns the stored key and its value.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.get_key_value(key)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.get_mut(key)
    }

    /// Returns the value corresponding to the key, or [`Error::KeyNotFound`].
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`] if the key is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use leafchain::{BPlusTreeMap, Error};
    ///
    /// let map = BPlusTreeMap::from_pairs([("present", 1)]).unwrap();
    /// assert_eq!(map.fetch("present"), Ok(&1));
    /// assert_eq!(map.fetch("missing"), Err(Error::KeyNotFound));
    /// ```
    pub fn fetch<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.search(key).is_some()
    }

    /// Returns `true` if `key` is present and maps to a value equal to `value`.
    pub fn contains_pair<Q>(&self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
        V: PartialEq,
    {
        self.get(key) == Some(value)
    }

    /// Removes a key from the map, returning its value if it was present.
    ///
    /// Removing an absent key is not an error and leaves the map (and its version)
    /// untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use leafchain::BPlusTreeMap;
    ///
    /// let mut map = BPlusTreeMap::new();
    /// map.insert(1, "a").unwrap();
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes a key from the map, returning the stored key and value if present.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.raw.remove_entry(key)
    }

    /// Removes `key` only if it maps to a value equal to `value`. Returns whether a pair
    /// was removed.
    ///
    /// # Examples
    ///
    /// ```
    /// use leafchain::BPlusTreeMap;
    ///
    /// let mut map = BPlusTreeMap::from_pairs([(1, "a")]).unwrap();
    /// assert!(!map.remove_pair(&1, &"b"));
    /// assert!(map.remove_pair(&1, &"a"));
    /// assert!(map.is_empty());
    /// ```
    pub fn remove_pair<Q>(&mut self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
        V: PartialEq,
    {
        self.raw.remove_pair(key, value)
    }

    /// Removes and returns the first element in the map.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.raw.pop_first()
    }
}

impl<K, V> Default for BPlusTreeMap<K, V> {
    /// Creates an empty `BPlusTreeMap` ordered by `K`'s [`Ord`].
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone, C: Clone> Clone for BPlusTreeMap<K, V, C> {
    fn clone(&self) -> Self {
        Self { raw: self.raw.clone() }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for BPlusTreeMap<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Clone, V, C: Comparator<K>> Extend<(K, V)> for BPlusTreeMap<K, V, C> {
    /// Upserts every pair; later pairs overwrite earlier ones with the same key.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<'a, K, V, C> IntoIterator for &'a BPlusTreeMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, Q, V, C> Index<&Q> for BPlusTreeMap<K, V, C>
where
    K: Borrow<Q> + Clone,
    Q: ?Sized,
    C: Comparator<K> + Comparator<Q>,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the supplied key.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the map. Use [`BPlusTreeMap::fetch`] for a
    /// fallible lookup.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<'a, K: 'a, V: 'a> Iter<'a, K, V> {
    fn leaf_node(&self, handle: Handle) -> &'a LeafNode<K, V> {
        self.nodes.get(handle).as_leaf()
    }
}

impl<'a, K: 'a, V: 'a> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let leaf = self.leaf_node(self.leaf?);
        let item = (leaf.key(self.index), leaf.value(self.index));

        self.remaining -= 1;
        self.index += 1;
        if self.index >= leaf.key_count() {
            self.leaf = leaf.next();
            self.index = 0;
        }

        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            nodes: self.nodes,
            leaf: self.leaf,
            index: self.index,
            remaining: self.remaining,
        }
    }
}

impl<K, V> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").field("remaining", &self.remaining).finish()
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Keys {
            inner: self.inner.clone(),
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Keys<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Values {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V: fmt::Debug> fmt::Debug for Values<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}
