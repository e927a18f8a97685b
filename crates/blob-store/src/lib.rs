//! Flat on-disk blob store
//!
//! Persists named byte blobs directly under a storage root. A persist whose
//! bytes already match the blob on disk is skipped, and every physical write
//! lands through a temporary file and a rename so readers never observe a
//! half-written blob.

mod error;
mod store;
mod types;

pub use error::{Result, StoreError};
pub use store::BlobStore;
pub use types::{PersistOutcome, StoreStats};
