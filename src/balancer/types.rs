use crate::health::{HealthStatus, now_ms};

use serde::{Deserialize, Serialize};

/// Last-known aggregate capacity of one cluster.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterView {
    pub status: HealthStatus,
    /// Sum of free MB over the cluster's nodes.
    pub free_mb: u64,
    /// Unix millis of the last successful probe; 0 if never reached.
    pub last_seen: u64,
}

impl ClusterView {
    pub fn alive(free_mb: u64) -> Self {
        Self {
            status: HealthStatus::Alive,
            free_mb,
            last_seen: now_ms(),
        }
    }

    pub fn down(previous: Option<&ClusterView>) -> Self {
        Self {
            status: HealthStatus::Down,
            free_mb: 0,
            last_seen: previous.map(|v| v.last_seen).unwrap_or(0),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.status == HealthStatus::Alive
    }
}

/// Where a chunk ended up after passing through both tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedChunk {
    pub cluster: String,
    pub node: String,
    pub chunk_id: String,
}
