use crate::health::{HealthStatus, now_ms};
use crate::node::protocol::NodeStatusResponse;

use serde::{Deserialize, Serialize};

/// Last-known health and capacity of one storage node.
///
/// A view is always replaced as a whole, so a reader never observes fields
/// from two different probes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeView {
    pub status: HealthStatus,
    pub free_mb: u64,
    pub chunk_count: u64,
    /// Unix millis of the last successful probe; 0 if never reached.
    pub last_seen: u64,
}

impl NodeView {
    pub fn alive(report: NodeStatusResponse) -> Self {
        Self {
            status: HealthStatus::Alive,
            free_mb: report.free_mb,
            chunk_count: report.chunk_count,
            last_seen: now_ms(),
        }
    }

    /// A down node keeps its chunk count and last contact but offers no capacity.
    pub fn down(previous: Option<&NodeView>) -> Self {
        Self {
            status: HealthStatus::Down,
            free_mb: 0,
            chunk_count: previous.map(|v| v.chunk_count).unwrap_or(0),
            last_seen: previous.map(|v| v.last_seen).unwrap_or(0),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.status == HealthStatus::Alive
    }
}

/// A node chosen for one upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub address: String,
    pub score: f64,
    /// How many candidates shared the top band.
    pub tied: usize,
}

/// Where a chunk ended up after a successful forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChunk {
    pub node: String,
    pub chunk_id: String,
}
