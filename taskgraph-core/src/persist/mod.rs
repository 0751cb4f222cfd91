//! Position Persistence
//!
//! User drags are saved so a node stays where it was put.
//!
//! # Flow
//!
//! 1. A drag-stop is staged in a pending map keyed by node id, so repeated
//!    drags of one node inside the debounce window collapse to the last one.
//! 2. Each drag re-arms a single deadline.
//! 3. When the deadline passes, everything staged is written as pinned
//!    records in batches of at most 500, and the map is cleared.
//!
//! Writes are fire-and-forget: a failure is logged and dropped. Nothing is
//! retried.

mod debounce;
mod driver;
mod store;

pub use debounce::{DragStop, PositionPersistence};
pub use driver::FlushDriver;
pub use store::{
    check_batch, DependencySource, MemoryDependencySource, MemoryPositionStore, NodeType,
    PositionRecord, PositionStore,
};
