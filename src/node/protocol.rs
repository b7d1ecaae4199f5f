//! Storage Node Protocol
//!
//! Endpoints and DTOs spoken by a storage node. Cluster managers call `/store`
//! and `/status`; clients call `/chunk/{id}` directly for download and delete.

use serde::{Deserialize, Serialize};

pub const ENDPOINT_STORE: &str = "/store";
/// Prefix for per-chunk fetch (`GET`) and delete (`DELETE`).
pub const ENDPOINT_CHUNK: &str = "/chunk";

/// Capacity snapshot returned by `/status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeStatusResponse {
    #[serde(default)]
    pub free_mb: u64,
    #[serde(default)]
    pub chunk_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreResponse {
    pub status: String,
    pub chunk_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// `deleted` when the chunk existed, `absent` otherwise.
    pub status: String,
    pub chunk_id: String,
}

pub fn chunk_url(node_address: &str, chunk_id: &str) -> String {
    format!("{}{}/{}", node_address, ENDPOINT_CHUNK, chunk_id)
}
