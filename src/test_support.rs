//! Helpers for tests that need real HTTP peers on loopback.

use crate::node::{self, store::ChunkStore};

use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Serves `router` on an ephemeral loopback port and returns its base URL.
pub async fn spawn_router(router: Router) -> (String, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Test server failed");
    });

    (format!("http://{}", addr), handle)
}

/// Starts a storage node backed by `dir`.
pub async fn spawn_node(dir: &Path, capacity_mb: u64) -> (String, Arc<ChunkStore>, JoinHandle<()>) {
    let store = Arc::new(
        ChunkStore::open(dir, capacity_mb)
            .await
            .expect("Failed to open chunk store"),
    );
    let (url, handle) = spawn_router(node::router(store.clone())).await;
    (url, store, handle)
}

/// An address nothing listens on.
pub async fn dead_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");
    drop(listener);
    format!("http://{}", addr)
}
