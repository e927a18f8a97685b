//! Fixed-capacity LRU index
//!
//! Maps request fingerprints to derived filenames and evicts the
//! least-recently-used entry once the configured capacity is reached.
//! Recency is tracked by an arena-backed doubly-linked list whose links are
//! plain indices, so no node ever owns another.

mod index;
mod list;

pub use index::CacheIndex;
pub use list::{EvictionList, NodeRef};
