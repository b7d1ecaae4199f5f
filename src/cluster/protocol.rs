//! Cluster Manager Protocol
//!
//! DTOs returned by a cluster manager. The global balancer consumes
//! `ClusterStatusResponse` in its heartbeat and `ClusterUploadResponse` when it
//! forwards a chunk.

use super::types::NodeView;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ENDPOINT_NODE_HEARTBEATS: &str = "/node_heartbeats";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterStatusResponse {
    #[serde(default)]
    pub cluster_free_mb: u64,
    #[serde(default)]
    pub cluster_chunk_count: u64,
    #[serde(default)]
    pub active_nodes: usize,
    #[serde(default)]
    pub node_heartbeats: BTreeMap<String, NodeView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterUploadResponse {
    pub status: String,
    pub node: String,
    pub chunk_id: String,
}
