use super::protocol::NodeStatusResponse;
use crate::error::StoreError;

use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const MIB: u64 = 1024 * 1024;
const TEMP_PREFIX: &str = ".tmp-";
const MAX_CHUNK_ID_LEN: usize = 200;

/// On-disk chunk storage for one node.
///
/// Each chunk is a file named by its id inside `data_dir`. Sizes are mirrored in
/// memory so `status()` never touches the disk.
pub struct ChunkStore {
    data_dir: PathBuf,
    capacity_mb: u64,
    chunks: DashMap<String, u64>,
}

impl ChunkStore {
    /// Opens (creating if needed) `data_dir` and indexes the chunks already there.
    pub async fn open(data_dir: impl Into<PathBuf>, capacity_mb: u64) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await?;

        let chunks = DashMap::new();
        let mut entries = tokio::fs::read_dir(&data_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(TEMP_PREFIX) {
                // Leftover of an interrupted write.
                let _ = tokio::fs::remove_file(entry.path()).await;
                continue;
            }
            let metadata = entry.metadata().await?;
            if metadata.is_file() && validate_chunk_id(&name).is_ok() {
                chunks.insert(name, metadata.len());
            }
        }

        tracing::info!(
            "Opened chunk store at {} ({} chunks, capacity {} MB)",
            data_dir.display(),
            chunks.len(),
            capacity_mb
        );

        Ok(Self {
            data_dir,
            capacity_mb,
            chunks,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Writes `data` under `chunk_id`, replacing any previous content.
    pub async fn store(&self, chunk_id: &str, data: &[u8]) -> Result<(), StoreError> {
        let path = self.chunk_path(chunk_id)?;
        let temp = self
            .data_dir
            .join(format!("{}{}", TEMP_PREFIX, Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&temp, data).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        let previous = self.chunks.insert(chunk_id.to_string(), data.len() as u64);
        tracing::debug!(
            "Stored chunk {} ({} bytes, overwrite={})",
            chunk_id,
            data.len(),
            previous.is_some()
        );
        Ok(())
    }

    pub async fn fetch(&self, chunk_id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.chunk_path(chunk_id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the chunk. Returns whether it existed; absence is not an error.
    pub async fn delete(&self, chunk_id: &str) -> Result<bool, StoreError> {
        let path = self.chunk_path(chunk_id)?;
        let existed = match tokio::fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        self.chunks.remove(chunk_id);
        Ok(existed)
    }

    pub fn contains(&self, chunk_id: &str) -> bool {
        self.chunks.contains_key(chunk_id)
    }

    pub fn used_bytes(&self) -> u64 {
        self.chunks.iter().map(|entry| *entry.value()).sum()
    }

    pub fn status(&self) -> NodeStatusResponse {
        let used_mb = self.used_bytes().div_ceil(MIB);
        NodeStatusResponse {
            free_mb: self.capacity_mb.saturating_sub(used_mb),
            chunk_count: self.chunks.len() as u64,
        }
    }

    fn chunk_path(&self, chunk_id: &str) -> Result<PathBuf, StoreError> {
        validate_chunk_id(chunk_id)?;
        Ok(self.data_dir.join(chunk_id))
    }
}

/// Chunk ids become file names, so only a conservative alphabet is accepted.
pub fn validate_chunk_id(chunk_id: &str) -> Result<(), StoreError> {
    let valid = !chunk_id.is_empty()
        && chunk_id.len() <= MAX_CHUNK_ID_LEN
        && !chunk_id.starts_with('.')
        && chunk_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidChunkId(chunk_id.to_string()))
    }
}
