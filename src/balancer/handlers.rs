use super::protocol::{BalancerStatusResponse, ClusterHeartbeat, UploadChunkResponse};
use super::service::GlobalBalancer;
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
    Extension(balancer): Extension<Arc<GlobalBalancer>>,
    multipart: Multipart,
) -> Response {
    let upload = match read_chunk_upload(multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            tracing::warn!("{}", e);
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e))).into_response();
        }
    };

    match balancer.upload_chunk(upload.chunk_id, upload.data).await {
        Ok(placed) => Json(UploadChunkResponse {
            status: "stored".to_string(),
            cluster: placed.cluster,
            node: placed.node,
            chunk_id: placed.chunk_id,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn handle_heartbeats(
    Extension(balancer): Extension<Arc<GlobalBalancer>>,
) -> Json<BTreeMap<String, ClusterHeartbeat>> {
    Json(balancer.heartbeats())
}

pub async fn handle_status(
    Extension(balancer): Extension<Arc<GlobalBalancer>>,
) -> Json<BalancerStatusResponse> {
    Json(balancer.status())
}

pub async fn handle_index() -> &'static str {
    "Global Balancer is running"
}
