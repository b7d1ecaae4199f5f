use super::client::DfsClient;
use crate::error::ClientError;
use crate::node::protocol::chunk_url;
use crate::protocol::failure_reason;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

impl DfsClient {
    /// Fetches every chunk of `filename` from the node recorded for it and
    /// writes the reassembled file into the download area.
    pub async fn download(&self, filename: &str) -> Result<PathBuf, ClientError> {
        let metadata = self
            .metadata
            .load(filename)
            .await?
            .ok_or_else(|| ClientError::NotFound(filename.to_string()))?;

        let permits = Arc::new(Semaphore::new(self.config.upload_parallelism.max(1)));
        let mut fetches = JoinSet::new();
        for (chunk_id, node) in metadata.iter() {
            let client = self.http_client.clone();
            let permits = permits.clone();
            let url = chunk_url(node, chunk_id);
            let chunk_id = chunk_id.to_string();
            let timeout = self.config.request_timeout;
            fetches.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let result = fetch_chunk(&client, &url, timeout).await;
                (chunk_id, result)
            });
        }

        let mut chunks: HashMap<String, Vec<u8>> = HashMap::new();
        let mut failures: Vec<(String, String)> = Vec::new();
        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok((chunk_id, Ok(bytes))) => {
                    chunks.insert(chunk_id, bytes);
                }
                Ok((chunk_id, Err(reason))) => failures.push((chunk_id, reason)),
                Err(e) => tracing::error!("Chunk fetch task failed: {}", e),
            }
        }

        failures.sort();
        if let Some((chunk_id, reason)) = failures.into_iter().next() {
            tracing::error!("Download of {} failed at chunk {}: {}", filename, chunk_id, reason);
            return Err(ClientError::DownloadFailed {
                filename: filename.to_string(),
                chunk_id,
                reason,
            });
        }

        tokio::fs::create_dir_all(self.config.chunk_dir()).await?;
        for (chunk_id, bytes) in &chunks {
            tokio::fs::write(self.cached_chunk_path(chunk_id), bytes).await?;
        }

        let bytes = self.chunker.reconstruct(&metadata.chunk_ids(), &chunks)?;

        tokio::fs::create_dir_all(self.config.download_dir()).await?;
        let target = self.download_path(filename);
        tokio::fs::write(&target, &bytes).await?;

        tracing::info!("Downloaded {} ({} bytes) to {}", filename, bytes.len(), target.display());
        Ok(target)
    }
}

async fn fetch_chunk(
    client: &reqwest::Client,
    url: &str,
    timeout: std::time::Duration,
) -> Result<Vec<u8>, String> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !response.status().is_success() {
        return Err(failure_reason(response).await);
    }

    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| e.to_string())
}
