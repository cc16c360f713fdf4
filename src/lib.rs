//! An in-memory B+Tree ordered index for Rust.
//!
//! This crate provides [`BPlusTreeMap`], an ordered key-value map in which every pair
//! lives in a leaf and the leaves form a singly linked chain in key order. Internal nodes
//! carry one separator per child (a copy of that child's smallest key) and exist only to
//! route lookups.
//!
//! # Example
//!
//! ```
//! use leafchain::{BPlusTreeMap, Error};
//!
//! let mut stock = BPlusTreeMap::with_degree(2).unwrap();
//! for (sku, qty) in [(40, 1), (10, 5), (30, 0), (20, 2)] {
//!     stock.insert(sku, qty).unwrap();
//! }
//!
//! // Keys are unique; `insert` refuses to overwrite, `set` upserts.
//! assert_eq!(stock.insert(10, 9), Err(Error::DuplicateKey));
//! assert_eq!(stock.set(10, 9), Some(5));
//!
//! // Iteration walks the leaf chain in key order.
//! let skus: Vec<_> = stock.keys().copied().collect();
//! assert_eq!(skus, [10, 20, 30, 40]);
//!
//! // Four keys filled the root leaf, so it split.
//! assert_eq!(stock.height(), 2);
//!
//! assert_eq!(stock.remove(&30), Some(0));
//! assert_eq!(stock.fetch(&30), Err(Error::KeyNotFound));
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Pluggable ordering** - Any [`Comparator`], not just [`Ord`]
//! - **Detached cursors** - [`Cursor`] walks the map without borrowing it and reports
//!   [`Error::InvalidState`] once the map changes underneath it
//! - **`tracing`** (optional feature) - Splits, merges and rotations are logged at `trace`
//! - **`test-utils`** (optional feature) - Exposes `BPlusTreeMap::assert_invariants`
//!
//! # Implementation
//!
//! Nodes live in an arena and refer to each other by index. Each node caches its parent
//! and its position in the parent, so splits and merges can walk upward without a stack.
//! With minimum degree `t`, a node splits as soon as it holds `2t` keys and a non-root
//! node that drops below `t` keys borrows from or merges with a sibling.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod config;
mod error;
mod raw;
mod tracing_helpers;

pub mod bptree_map;
pub mod comparator;

pub use bptree_map::{BPlusTreeMap, Cursor};
pub use comparator::{Comparator, Natural};
pub use config::{Config, DEFAULT_MIN_DEGREE, MAX_MIN_DEGREE, MIN_DEGREE_LOWER_BOUND};
pub use error::{Error, Result};
