//! Zero-cost logging of structural tree events.
//!
//! With the `tracing` feature enabled these macros forward to the `tracing` crate; without
//! it they expand to nothing. Splits, merges, rotations and root changes are reported at
//! `trace` level, whole-tree events (clear, bulk load) at `debug`.
//!
//! ```bash
//! # Normal build - no logging code at all
//! cargo build --release
//!
//! # Observe rebalancing while running the tests
//! RUST_LOG=leafchain=trace cargo test --features tracing
//! ```

#![allow(unused_macros, unused_imports)]

/// Trace-level event. Compiles to nothing without the `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

/// Debug-level event. Compiles to nothing without the `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub(crate) use debug_log;
pub(crate) use trace_log;
