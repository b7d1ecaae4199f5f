//! Global Balancer Protocol
//!
//! DTOs returned by the global balancer to clients and dashboards.

use crate::health::HealthStatus;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ENDPOINT_HEARTBEATS: &str = "/heartbeats";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadChunkResponse {
    pub status: String,
    pub cluster: String,
    pub node: String,
    pub chunk_id: String,
}

/// One cluster as exposed by `/heartbeats`; `url` lets a dashboard drill down
/// into that cluster's `/node_heartbeats`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterHeartbeat {
    pub url: String,
    pub status: HealthStatus,
    pub free_mb: u64,
    pub last_seen: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancerStatusResponse {
    pub total_free_mb: u64,
    pub active_clusters: usize,
    pub clusters: BTreeMap<String, ClusterHeartbeat>,
}
