use super::manager::ClusterManager;
use super::protocol::{ClusterStatusResponse, ClusterUploadResponse};
use super::types::NodeView;
use crate::protocol::{ErrorResponse, read_chunk_upload};

use axum::response::{IntoResponse, Response};
use axum::{
    Json,
    extract::{Extension, Multipart},
    http::StatusCode,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub async fn handle_upload_chunk(
    Extension(manager): Extension<Arc<ClusterManager>>,
    multipart: Multipart,
) -> Response {
    let upload = match read_chunk_upload(multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            tracing::warn!("{}", e);
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e))).into_response();
        }
    };

    match manager.upload_chunk(upload.chunk_id, upload.data).await {
        Ok(stored) => (
            StatusCode::OK,
            Json(ClusterUploadResponse {
                status: "stored".to_string(),
                node: stored.node,
                chunk_id: stored.chunk_id,
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn handle_status(
    Extension(manager): Extension<Arc<ClusterManager>>,
) -> Json<ClusterStatusResponse> {
    Json(manager.status())
}

pub async fn handle_node_heartbeats(
    Extension(manager): Extension<Arc<ClusterManager>>,
) -> Json<BTreeMap<String, NodeView>> {
    Json(manager.node_heartbeats())
}

pub async fn handle_index() -> &'static str {
    "Cluster Manager is running"
}
