use super::chunker::{Chunker, FixedSizeChunker};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::metadata::store::MetadataStore;
use crate::search::index::{DocumentIndex, TermIndex};

use std::path::PathBuf;
use std::sync::Arc;

/// Client of the tiered store, bound to one local workspace.
///
/// Uploads go through the global balancer; downloads and deletes talk to the
/// storage nodes recorded in each file's metadata.
pub struct DfsClient {
    pub(crate) config: ClientConfig,
    pub(crate) http_client: reqwest::Client,
    pub(crate) metadata: MetadataStore,
    pub(crate) chunker: Arc<dyn Chunker>,
    pub(crate) index: Arc<dyn DocumentIndex>,
}

impl DfsClient {
    /// Client with the fixed-size chunker and the on-disk term index.
    pub fn open(config: ClientConfig) -> Result<Self, ClientError> {
        let chunker = Arc::new(FixedSizeChunker::new(config.chunk_size));
        let index = Arc::new(TermIndex::open(&config.index_dir())?);
        Ok(Self::with_parts(config, chunker, index))
    }

    pub fn with_parts(
        config: ClientConfig,
        chunker: Arc<dyn Chunker>,
        index: Arc<dyn DocumentIndex>,
    ) -> Self {
        let metadata = MetadataStore::new(config.metadata_dir());
        Self {
            config,
            http_client: reqwest::Client::new(),
            metadata,
            chunker,
            index,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub async fn list(&self) -> Result<Vec<String>, ClientError> {
        Ok(self.metadata.list().await?)
    }

    /// Ranked filenames, limited to files that are still stored.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<(String, usize)>, ClientError> {
        let mut results = Vec::new();
        for (filename, score) in self.index.search(query, usize::MAX) {
            if results.len() == limit {
                break;
            }
            if self.metadata.exists(&filename).await? {
                results.push((filename, score));
            } else {
                tracing::debug!("Skipping {} in results: no metadata", filename);
            }
        }
        Ok(results)
    }

    pub(crate) fn cached_chunk_path(&self, chunk_id: &str) -> PathBuf {
        self.config.chunk_dir().join(chunk_id)
    }

    pub(crate) fn download_path(&self, filename: &str) -> PathBuf {
        self.config.download_dir().join(filename)
    }
}
