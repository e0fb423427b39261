//! Slice value operations.
//!
//! The store delegates the structured mutation (`merge`) and the change
//! detection used by bindings (`Equality`) to this module, so both can be
//! exercised without a store.

mod equality;
mod merge;

pub use equality::{ContentHash, Equality};
pub use merge::merge_value;
