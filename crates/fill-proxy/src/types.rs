//! Response and statistics types for the fill proxy

use blob_store::StoreStats;
use serde::{Deserialize, Serialize};

/// Request-level counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FillStats {
    pub hits: u64,
    pub misses: u64,
    pub fills: u64,
    pub persist_failures: u64,
}

/// Occupancy of the in-memory index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub entries: usize,
    pub capacity: usize,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub index: IndexStats,
    pub store: StoreStats,
    pub requests: FillStats,
}
