use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::ClientError;

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write;

/// Hex characters of the content digest kept in a chunk id.
const DIGEST_PREFIX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub data: Vec<u8>,
}

/// Anything that can hand back chunk bytes by id during reconstruction.
pub trait ChunkSource {
    fn chunk(&self, chunk_id: &str) -> Option<&[u8]>;
}

impl ChunkSource for HashMap<String, Vec<u8>> {
    fn chunk(&self, chunk_id: &str) -> Option<&[u8]> {
        self.get(chunk_id).map(Vec::as_slice)
    }
}

/// Splits files into ordered chunks and puts them back together.
pub trait Chunker: Send + Sync {
    /// Chunk ids must be unique to `filename`: nodes key blobs by id alone, so
    /// a shared id would let one file's delete remove another file's chunk.
    fn split(&self, filename: &str, data: &[u8]) -> Vec<Chunk>;

    fn reconstruct(
        &self,
        chunk_ids: &[String],
        source: &dyn ChunkSource,
    ) -> Result<Vec<u8>, ClientError>;
}

/// Fixed-size chunks named `{index:08}-{sha256(filename, chunk) prefix}`.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
}

impl FixedSizeChunker {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl Chunker for FixedSizeChunker {
    fn split(&self, filename: &str, data: &[u8]) -> Vec<Chunk> {
        if data.is_empty() {
            return vec![Chunk {
                id: chunk_id(filename, 0, data),
                data: Vec::new(),
            }];
        }

        data.chunks(self.chunk_size)
            .enumerate()
            .map(|(index, piece)| Chunk {
                id: chunk_id(filename, index, piece),
                data: piece.to_vec(),
            })
            .collect()
    }

    fn reconstruct(
        &self,
        chunk_ids: &[String],
        source: &dyn ChunkSource,
    ) -> Result<Vec<u8>, ClientError> {
        let mut out = Vec::new();
        for id in chunk_ids {
            let piece = source
                .chunk(id)
                .ok_or_else(|| ClientError::MissingChunk(id.clone()))?;
            out.extend_from_slice(piece);
        }
        Ok(out)
    }
}

/// The zero-padded index keeps lexical id order equal to file order.
pub fn chunk_id(filename: &str, index: usize, data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hasher.update([0u8]);
    hasher.update(data);
    let digest = hasher.finalize();
    let mut id = format!("{:08}-", index);
    for byte in digest.iter().take(DIGEST_PREFIX_LEN / 2) {
        let _ = write!(id, "{:02x}", byte);
    }
    id
}
