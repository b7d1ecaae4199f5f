//! Storage Node Module
//!
//! The leaf of the topology. A storage node persists chunk blobs by id and
//! reports its capacity; it has no knowledge of files, clusters or placement.
//!
//! ## Contract
//! - **store**: idempotent overwrite of a chunk; a new id increases `chunk_count`.
//! - **fetch**: chunk bytes or not-found.
//! - **delete**: removes the chunk if present. Deleting an absent chunk succeeds,
//!   which keeps client-side delete retries safe.
//! - **status**: point-in-time `{free_mb, chunk_count}` snapshot.

pub mod handlers;
pub mod protocol;
pub mod store;


use axum::Router;
use axum::extract::{DefaultBodyLimit, Extension};
use axum::routing::{get, post};
use std::sync::Arc;

use crate::health::ENDPOINT_STATUS;
use crate::protocol::MAX_CHUNK_BODY;
use handlers::{handle_delete, handle_fetch, handle_index, handle_status, handle_store};
use protocol::ENDPOINT_STORE;
use store::ChunkStore;

/// HTTP surface of a storage node.
pub fn router(store: Arc<ChunkStore>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route(ENDPOINT_STORE, post(handle_store))
        .route("/chunk/:chunk_id", get(handle_fetch).delete(handle_delete))
        .route(ENDPOINT_STATUS, get(handle_status))
        .layer(DefaultBodyLimit::max(MAX_CHUNK_BODY))
        .layer(Extension(store))
}
