//! Chunk Transfer Protocol
//!
//! Every tier accepts a chunk the same way: a `multipart/form-data` body with a
//! binary `chunk` part and a text `chunk_id` part. This module holds the shared
//! field names, the decoder used by the axum handlers, the encoder used by the
//! reqwest forwarders, and the JSON error bodies.

use crate::error::PlacementError;

use axum::Json;
use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

pub const FIELD_CHUNK: &str = "chunk";
pub const FIELD_CHUNK_ID: &str = "chunk_id";
/// Upload entry point exposed by both the global balancer and cluster managers.
pub const ENDPOINT_UPLOAD_CHUNK: &str = "/upload_chunk";
/// Request body cap for chunk uploads.
pub const MAX_CHUNK_BODY: usize = 64 * 1024 * 1024;

/// A decoded chunk upload.
#[derive(Debug)]
pub struct ChunkUpload {
    pub chunk_id: String,
    pub data: Vec<u8>,
}

/// Reads the `chunk` and `chunk_id` parts; unknown parts are ignored.
pub async fn read_chunk_upload(mut multipart: Multipart) -> Result<ChunkUpload, String> {
    let mut chunk_id: Option<String> = None;
    let mut data: Option<Vec<u8>> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(format!("Invalid multipart body: {}", e)),
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FIELD_CHUNK) => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read chunk: {}", e))?;
                data = Some(bytes.to_vec());
            }
            Some(FIELD_CHUNK_ID) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| format!("Failed to read chunk_id: {}", e))?;
                chunk_id = Some(text);
            }
            _ => {}
        }
    }

    match (chunk_id, data) {
        (Some(chunk_id), Some(data)) if !chunk_id.is_empty() => Ok(ChunkUpload { chunk_id, data }),
        _ => Err("Missing chunk or chunk_id".to_string()),
    }
}

/// Builds the multipart body for forwarding a chunk one tier down.
pub fn chunk_form(chunk_id: &str, data: Vec<u8>) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(data).file_name(chunk_id.to_string());
    reqwest::multipart::Form::new()
        .text(FIELD_CHUNK_ID, chunk_id.to_string())
        .part(FIELD_CHUNK, part)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// JSON body for a failed placement. Counts are present for unavailability,
/// `target` for forwarding failures.
#[derive(Debug, Serialize, Deserialize)]
pub struct PlacementErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configured: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reachable: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl IntoResponse for PlacementError {
    fn into_response(self) -> Response {
        let error = self.to_string();
        match self {
            PlacementError::Unavailable {
                configured,
                reachable,
                ..
            } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(PlacementErrorResponse {
                    error,
                    configured: Some(configured),
                    reachable: Some(reachable),
                    target: None,
                }),
            )
                .into_response(),
            PlacementError::Forwarding { target, .. } => (
                StatusCode::BAD_GATEWAY,
                Json(PlacementErrorResponse {
                    error,
                    configured: None,
                    reachable: None,
                    target: Some(target),
                }),
            )
                .into_response(),
        }
    }
}

/// Extracts a readable reason from a non-success response of a peer.
pub async fn failure_reason(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => format!("{} ({})", body.error, status),
        Err(_) => format!("peer answered {}", status),
    }
}
