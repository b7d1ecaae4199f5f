use super::client::DfsClient;
use crate::balancer::protocol::UploadChunkResponse;
use crate::error::{ClientError, MetadataError};
use crate::metadata::store::validate_filename;
use crate::metadata::types::FileMetadata;
use crate::node::protocol::chunk_url;
use crate::protocol::{ENDPOINT_UPLOAD_CHUNK, chunk_form, failure_reason};

use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Outcome of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub filename: String,
    pub metadata: FileMetadata,
    /// Set when the file is stored but the search index could not learn it.
    pub index_warning: Option<String>,
}

impl DfsClient {
    /// Uploads a file from disk under its own file name.
    pub async fn upload_file(&self, path: &Path) -> Result<UploadReport, ClientError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| MetadataError::InvalidFilename(path.display().to_string()))?;
        let data = tokio::fs::read(path).await?;
        self.upload(&filename, data).await
    }

    /// Splits `data` and places every chunk through the global balancer.
    ///
    /// Metadata is written only once every chunk is stored; on any failure the
    /// ids of the chunks that did not make it are returned instead.
    pub async fn upload(&self, filename: &str, data: Vec<u8>) -> Result<UploadReport, ClientError> {
        validate_filename(filename)?;
        if self.metadata.exists(filename).await? {
            return Err(ClientError::AlreadyExists(filename.to_string()));
        }

        let chunks = self.chunker.split(filename, &data);
        let chunk_ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
        tracing::info!("Uploading {} ({} bytes, {} chunks)", filename, data.len(), chunks.len());

        let permits = Arc::new(Semaphore::new(self.config.upload_parallelism.max(1)));
        let url = format!("{}{}", self.config.balancer_url, ENDPOINT_UPLOAD_CHUNK);
        let mut uploads = JoinSet::new();

        for chunk in chunks {
            let client = self.http_client.clone();
            let permits = permits.clone();
            let url = url.clone();
            let timeout = self.config.request_timeout;
            uploads.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let result = send_chunk(&client, &url, &chunk.id, chunk.data, timeout).await;
                (chunk.id, result)
            });
        }

        let mut metadata = FileMetadata::new();
        let mut failed = Vec::new();
        while let Some(joined) = uploads.join_next().await {
            match joined {
                Ok((chunk_id, Ok(placed))) => {
                    tracing::debug!("Chunk {} stored on {} ({})", chunk_id, placed.node, placed.cluster);
                    metadata.insert(chunk_id, placed.node);
                }
                Ok((chunk_id, Err(reason))) => {
                    tracing::warn!("Chunk {} of {} not stored: {}", chunk_id, filename, reason);
                    failed.push(chunk_id);
                }
                Err(e) => tracing::error!("Chunk upload task failed: {}", e),
            }
        }

        // Chunks whose task died never reported back.
        for id in &chunk_ids {
            if metadata.node_for(id).is_none() && !failed.contains(id) {
                failed.push(id.clone());
            }
        }

        if !failed.is_empty() {
            failed.sort();
            tracing::error!("Upload of {} failed for {} chunks", filename, failed.len());
            return Err(ClientError::UploadFailed {
                filename: filename.to_string(),
                failed,
            });
        }

        match self.metadata.create(filename, &metadata).await {
            Ok(()) => {}
            Err(MetadataError::AlreadyExists(_)) => {
                tracing::warn!("{} was stored concurrently; discarding this upload", filename);
                self.discard_chunks(filename, &metadata).await;
                return Err(ClientError::AlreadyExists(filename.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!("Stored {} as {} chunks", filename, metadata.len());

        let index_warning = match self.index.add(filename, &String::from_utf8_lossy(&data)) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("Search index not updated for {}: {}", filename, e);
                Some(e.to_string())
            }
        };

        Ok(UploadReport {
            filename: filename.to_string(),
            metadata,
            index_warning,
        })
    }
}

impl DfsClient {
    /// Best-effort removal of chunks placed by an upload that lost the race for
    /// its filename. Chunks the recorded winner also references are kept.
    async fn discard_chunks(&self, filename: &str, placed: &FileMetadata) {
        let winner = match self.metadata.load(filename).await {
            Ok(winner) => winner.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Keeping chunks of discarded upload {}: {}", filename, e);
                return;
            }
        };

        let mut deletes = JoinSet::new();
        for (chunk_id, node) in placed.iter() {
            if winner.node_for(chunk_id) == Some(node) {
                continue;
            }
            let client = self.http_client.clone();
            let url = chunk_url(node, chunk_id);
            let chunk_id = chunk_id.to_string();
            let timeout = self.config.request_timeout;
            deletes.spawn(async move {
                let removed = client
                    .delete(&url)
                    .timeout(timeout)
                    .send()
                    .await
                    .is_ok_and(|resp| resp.status().is_success());
                (chunk_id, removed)
            });
        }

        while let Some(joined) = deletes.join_next().await {
            if let Ok((chunk_id, false)) = joined {
                tracing::warn!("Orphaned chunk {} of discarded upload {}", chunk_id, filename);
            }
        }
    }
}

async fn send_chunk(
    client: &reqwest::Client,
    url: &str,
    chunk_id: &str,
    data: Vec<u8>,
    timeout: std::time::Duration,
) -> Result<UploadChunkResponse, String> {
    let response = client
        .post(url)
        .multipart(chunk_form(chunk_id, data))
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !response.status().is_success() {
        return Err(failure_reason(response).await);
    }

    response
        .json::<UploadChunkResponse>()
        .await
        .map_err(|e| format!("unreadable balancer reply: {}", e))
}
