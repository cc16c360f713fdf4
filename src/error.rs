//! Errors reported by [`BPlusTreeMap`](crate::BPlusTreeMap) and its [`Cursor`](crate::Cursor).
//!
//! Every error is detected before the tree is touched, so a failed call always leaves the
//! map exactly as it was. Structural invariant violations are not errors: they indicate a
//! bug in this crate and panic.

use thiserror::Error;

/// Errors that can occur while building, mutating or walking a map.
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error {
    /// The key passed to [`insert`](crate::BPlusTreeMap::insert) (or to a bulk load) is
    /// already stored. Use [`set`](crate::BPlusTreeMap::set) to overwrite instead.
    #[error("an entry with the same key has already been added")]
    DuplicateKey,

    /// [`fetch`](crate::BPlusTreeMap::fetch) was called for a key that is not stored.
    ///
    /// `get`, `remove` and `contains_key` report absence through `Option`/`bool` instead.
    #[error("key not found")]
    KeyNotFound,

    /// A cursor was advanced after the map it walks was structurally modified.
    ///
    /// The cursor cannot be resumed; create a new one with
    /// [`cursor`](crate::BPlusTreeMap::cursor).
    #[error("map was modified after the cursor was created (cursor version {snapshot}, map version {current})")]
    InvalidState {
        /// Map version recorded when the cursor was created.
        snapshot: u64,
        /// Map version at the time of the failed call.
        current: u64,
    },

    /// The requested minimum degree cannot form a valid tree.
    #[error("minimum degree must be between 2 and 65536, got {min_degree}")]
    InvalidDegree {
        /// The rejected minimum degree.
        min_degree: usize,
    },
}

/// A `Result` alias using this crate's [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn messages_name_the_problem() {
        assert_eq!(Error::KeyNotFound.to_string(), "key not found");
        assert_eq!(
            Error::InvalidState { snapshot: 3, current: 5 }.to_string(),
            "map was modified after the cursor was created (cursor version 3, map version 5)"
        );
        assert_eq!(Error::InvalidDegree { min_degree: 1 }.to_string(), "minimum degree must be between 2 and 65536, got 1");
    }
}
