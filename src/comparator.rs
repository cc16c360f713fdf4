//! Key ordering used by [`BPlusTreeMap`](crate::BPlusTreeMap).
//!
//! A map orders its keys with a [`Comparator`]. The default, [`Natural`], defers to [`Ord`];
//! any other total order can be supplied at construction time, either as a type implementing
//! the trait or as a closure wrapped by [`from_fn`].
//!
//! ```
//! use leafchain::{BPlusTreeMap, comparator};
//!
//! let mut map = BPlusTreeMap::with_comparator(comparator::from_fn(|a: &i32, b: &i32| b.cmp(a)));
//! map.insert(1, "one").unwrap();
//! map.insert(3, "three").unwrap();
//! map.insert(2, "two").unwrap();
//!
//! let keys: Vec<_> = map.keys().copied().collect();
//! assert_eq!(keys, [3, 2, 1]);
//! ```

use core::cmp::Ordering;
use core::fmt;

/// A total order over `T`.
///
/// Implementations must be consistent for the lifetime of the map: if the relative order of
/// two stored keys changes, lookups and structural operations give unspecified (but memory
/// safe) results.
pub trait Comparator<T: ?Sized> {
    /// Compares `a` with `b`.
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Natural;

impl<T: ?Sized + Ord> Comparator<T> for Natural {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// A [`Comparator`] backed by a closure. Created by [`from_fn`].
#[derive(Clone, Copy)]
pub struct FnComparator<F>(F);

/// Wraps a comparison closure so it can order a map's keys.
pub const fn from_fn<T, F>(compare: F) -> FnComparator<F>
where
    T: ?Sized,
    F: Fn(&T, &T) -> Ordering,
{
    FnComparator(compare)
}

impl<T, F> Comparator<T> for FnComparator<F>
where
    T: ?Sized,
    F: Fn(&T, &T) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.0)(a, b)
    }
}

impl<F> fmt::Debug for FnComparator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnComparator")
    }
}

impl<T: ?Sized, C: Comparator<T> + ?Sized> Comparator<T> for &C {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        (**self).compare(a, b)
    }
}
