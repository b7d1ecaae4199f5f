//! Global Balancer Module
//!
//! Entry point for chunk uploads. Keeps a heartbeat-fed view of every cluster
//! manager and forwards each chunk to the alive cluster with the most free
//! space. The chosen cluster then picks the storage node.

pub mod handlers;
pub mod protocol;
pub mod service;
pub mod types;


use axum::Router;
use axum::extract::{DefaultBodyLimit, Extension};
use axum::routing::{get, post};
use std::sync::Arc;

use crate::health::ENDPOINT_STATUS;
use crate::protocol::{ENDPOINT_UPLOAD_CHUNK, MAX_CHUNK_BODY};
use handlers::{handle_heartbeats, handle_index, handle_status, handle_upload_chunk};
use protocol::ENDPOINT_HEARTBEATS;
use service::GlobalBalancer;

/// HTTP surface of the global balancer.
pub fn router(balancer: Arc<GlobalBalancer>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route(ENDPOINT_UPLOAD_CHUNK, post(handle_upload_chunk))
        .route(ENDPOINT_HEARTBEATS, get(handle_heartbeats))
        .route(ENDPOINT_STATUS, get(handle_status))
        .layer(DefaultBodyLimit::max(MAX_CHUNK_BODY))
        .layer(Extension(balancer))
}
