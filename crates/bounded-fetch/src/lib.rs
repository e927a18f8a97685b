//! Bounded upstream fetch
//!
//! Retrieves a source image from an upstream host, forwarding the inbound
//! request headers, accepting only JPEG responses and refusing to buffer
//! more than a configured number of bytes.

pub mod error;
pub mod fetcher;

pub use error::{FetchError, Result};
pub use fetcher::{read_capped, BoundedFetcher, FetchConfig, CHUNK_SIZE, DEFAULT_MAX_BYTES};
