use super::protocol::{DeleteResponse, NodeStatusResponse, StoreResponse};
use super::store::ChunkStore;
use crate::error::StoreError;
use crate::protocol::{ErrorResponse, read_chunk_upload};

use axum::{
    Json,
    extract::{Extension, Multipart, Path},
    http::StatusCode,
};
use std::sync::Arc;

type ErrorReply = (StatusCode, Json<ErrorResponse>);

fn store_error(chunk_id: &str, e: StoreError) -> ErrorReply {
    match e {
        StoreError::InvalidChunkId(_) => {
            tracing::warn!("Rejected chunk id {:?}", chunk_id);
            (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.to_string())))
        }
        StoreError::Io(_) => {
            tracing::error!("Chunk {} I/O failure: {}", chunk_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            )
        }
    }
}

pub async fn handle_store(
    Extension(store): Extension<Arc<ChunkStore>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<StoreResponse>), ErrorReply> {
    let upload = match read_chunk_upload(multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            tracing::warn!("Bad store request: {}", e);
            return Err((StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e))));
        }
    };

    store
        .store(&upload.chunk_id, &upload.data)
        .await
        .map_err(|e| store_error(&upload.chunk_id, e))?;

    tracing::info!("Stored chunk {} ({} bytes)", upload.chunk_id, upload.data.len());
    Ok((
        StatusCode::OK,
        Json(StoreResponse {
            status: "stored".to_string(),
            chunk_id: upload.chunk_id,
        }),
    ))
}

pub async fn handle_fetch(
    Extension(store): Extension<Arc<ChunkStore>>,
    Path(chunk_id): Path<String>,
) -> Result<Vec<u8>, ErrorReply> {
    match store.fetch(&chunk_id).await {
        Ok(Some(bytes)) => Ok(bytes),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("Chunk {} not found", chunk_id))),
        )),
        Err(e) => Err(store_error(&chunk_id, e)),
    }
}

pub async fn handle_delete(
    Extension(store): Extension<Arc<ChunkStore>>,
    Path(chunk_id): Path<String>,
) -> Result<Json<DeleteResponse>, ErrorReply> {
    let existed = store
        .delete(&chunk_id)
        .await
        .map_err(|e| store_error(&chunk_id, e))?;

    if existed {
        tracing::info!("Deleted chunk {}", chunk_id);
    } else {
        tracing::debug!("Delete of absent chunk {}", chunk_id);
    }

    Ok(Json(DeleteResponse {
        status: if existed { "deleted" } else { "absent" }.to_string(),
        chunk_id,
    }))
}

pub async fn handle_status(Extension(store): Extension<Arc<ChunkStore>>) -> Json<NodeStatusResponse> {
    Json(store.status())
}

pub async fn handle_index() -> &'static str {
    "Storage node is running"
}
