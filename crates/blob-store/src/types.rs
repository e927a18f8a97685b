//! Store types

use serde::{Deserialize, Serialize};

/// What a call to [`crate::BlobStore::persist`] did on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistOutcome {
    /// No blob existed under the name; a new one was written
    Created,
    /// The existing blob already held identical bytes; nothing was written
    Unchanged,
    /// The existing blob differed or could not be read and was replaced
    Overwritten,
}

impl PersistOutcome {
    /// Whether the call wrote to disk
    pub fn wrote(self) -> bool {
        !matches!(self, PersistOutcome::Unchanged)
    }
}

/// Statistics about the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub writes: u64,
    pub deduplicated: u64,
    pub write_failures: u64,
}
