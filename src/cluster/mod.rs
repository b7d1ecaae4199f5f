//! Cluster Manager Module
//!
//! Routes chunk uploads to storage nodes inside one cluster.
//!
//! ## Core Mechanisms
//! - **Heartbeat cache**: per-node `NodeView`s refreshed by one background task
//!   and read concurrently by request handlers (`DashMap`, whole-entry swaps).
//! - **Scoring**: `free_mb - 50 * chunk_count`, trading raw headroom against
//!   chunk density.
//! - **Tie band**: every node within `1e-3` of the best score is a candidate;
//!   one is drawn at random.
//!
//! Nodes not yet reached by the heartbeat are probed on demand at selection
//! time, which covers the window right after start-up.

pub mod handlers;
pub mod manager;
pub mod protocol;
pub mod selection;
pub mod types;


use axum::Router;
use axum::extract::{DefaultBodyLimit, Extension};
use axum::routing::{get, post};
use std::sync::Arc;

use crate::health::ENDPOINT_STATUS;
use crate::protocol::{ENDPOINT_UPLOAD_CHUNK, MAX_CHUNK_BODY};
use handlers::{handle_index, handle_node_heartbeats, handle_status, handle_upload_chunk};
use manager::ClusterManager;
use protocol::ENDPOINT_NODE_HEARTBEATS;

/// HTTP surface of a cluster manager.
pub fn router(manager: Arc<ClusterManager>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route(ENDPOINT_UPLOAD_CHUNK, post(handle_upload_chunk))
        .route(ENDPOINT_STATUS, get(handle_status))
        .route(ENDPOINT_NODE_HEARTBEATS, get(handle_node_heartbeats))
        .layer(DefaultBodyLimit::max(MAX_CHUNK_BODY))
        .layer(Extension(manager))
}
