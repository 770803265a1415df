//! Memory manager - semispace heap and moving garbage collector.
//!
//! This component provides:
//! - Bump-pointer allocation out of a pair of equal-capacity semispaces
//! - A Cheney-style copying collector that relocates every live object and
//!   rewrites every reference to it (roots, fields, and native-frame slots)
//! - The root table for explicit VM-level roots
//! - The root chain protocol through which natively compiled frames report
//!   their live reference slots to the collector
//! - The write barrier hook for instance-variable stores
//!
//! Execution is single-threaded; a collection cycle is a synchronous pause
//! triggered inline by an allocation that cannot be satisfied. An allocation
//! that still fails after a full cycle is a fatal out-of-memory condition,
//! surfaced as [`HeapError::OutOfMemory`] and never retried.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod gc;
mod heap;
mod roots;

pub use config::HeapConfig;
pub use error::HeapError;
pub use heap::{GcStats, Heap};
pub use roots::{FrameRoots, RootIndex};
