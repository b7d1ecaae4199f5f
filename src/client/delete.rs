use super::client::DfsClient;
use crate::error::ClientError;
use crate::node::protocol::chunk_url;

use std::io::ErrorKind;
use std::path::Path;
use tokio::task::JoinSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Chunks and metadata are gone, but local cleanup was incomplete.
    DeletedWithWarning(String),
}

impl DfsClient {
    /// Deletes every chunk of `filename`, then its metadata and local copies.
    ///
    /// If any node fails to confirm, nothing else is touched and the failed
    /// chunk ids are returned; running the delete again is safe.
    pub async fn delete(&self, filename: &str) -> Result<DeleteOutcome, ClientError> {
        let metadata = self
            .metadata
            .load(filename)
            .await?
            .ok_or_else(|| ClientError::NotFound(filename.to_string()))?;

        let mut deletes = JoinSet::new();
        for (chunk_id, node) in metadata.iter() {
            let client = self.http_client.clone();
            let url = chunk_url(node, chunk_id);
            let chunk_id = chunk_id.to_string();
            let timeout = self.config.request_timeout;
            deletes.spawn(async move {
                let confirmed = match client.delete(&url).timeout(timeout).send().await {
                    Ok(resp) if resp.status().is_success() => true,
                    Ok(resp) => {
                        tracing::warn!("Delete of {} answered {}", chunk_id, resp.status());
                        false
                    }
                    Err(e) => {
                        tracing::warn!("Delete of {} failed: {}", chunk_id, e);
                        false
                    }
                };
                (chunk_id, confirmed)
            });
        }

        let mut confirmed = Vec::new();
        while let Some(joined) = deletes.join_next().await {
            match joined {
                Ok((chunk_id, true)) => confirmed.push(chunk_id),
                Ok((_, false)) => {}
                Err(e) => tracing::error!("Chunk delete task failed: {}", e),
            }
        }

        let mut failed: Vec<String> = metadata
            .chunk_ids()
            .into_iter()
            .filter(|id| !confirmed.contains(id))
            .collect();
        if !failed.is_empty() {
            failed.sort();
            tracing::error!("Couldn't delete {} chunks of {}: {:?}", failed.len(), filename, failed);
            return Err(ClientError::PartialDelete {
                filename: filename.to_string(),
                failed,
            });
        }

        self.metadata.remove(filename).await?;
        tracing::info!("Deleted {} ({} chunks)", filename, metadata.len());

        let mut warnings = Vec::new();
        for chunk_id in metadata.chunk_ids() {
            if let Err(e) = remove_if_present(&self.cached_chunk_path(&chunk_id)).await {
                warnings.push(format!("cached chunk {}: {}", chunk_id, e));
            }
        }
        if let Err(e) = remove_if_present(&self.download_path(filename)).await {
            warnings.push(format!("downloaded copy: {}", e));
        }
        if let Err(e) = self.index.remove(filename) {
            warnings.push(format!("Index cleanup failed: {}", e));
        }

        if warnings.is_empty() {
            Ok(DeleteOutcome::Deleted)
        } else {
            let warning = warnings.join("; ");
            tracing::warn!("Deleted {} with warnings: {}", filename, warning);
            Ok(DeleteOutcome::DeletedWithWarning(warning))
        }
    }
}

async fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
