//! Image fill proxy library
//!
//! Fetches a JPEG from an upstream host, fill-resizes it to the requested
//! dimensions, stores the result on disk and remembers the mapping in a
//! bounded LRU index so identical requests skip the fetch and the resize.

pub mod config;
pub mod error;
pub mod fill;
pub mod request;
pub mod server;
pub mod transform;
pub mod types;

pub use config::ProxyConfig;
pub use error::{FillError, ProxyError, Result};
pub use fill::{FillOrchestrator, FillOutcome, Upstream};
pub use request::FillRequest;
pub use server::{create_router, start_server, ServerState, SharedState};
pub use transform::{ImageTransform, LanczosFill, TransformError};
pub use types::*;
