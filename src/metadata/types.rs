use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placement record of one file: chunk id -> address of the node holding it.
///
/// Serialized as a bare JSON object `{chunk_id: node_address, ...}`. Chunk ids
/// carry a zero-padded index prefix, so key order is file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileMetadata {
    chunks: BTreeMap<String, String>,
}

impl FileMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chunk_id: impl Into<String>, node: impl Into<String>) {
        self.chunks.insert(chunk_id.into(), node.into());
    }

    pub fn node_for(&self, chunk_id: &str) -> Option<&str> {
        self.chunks.get(chunk_id).map(String::as_str)
    }

    /// Chunk ids in reconstruction order.
    pub fn chunk_ids(&self) -> Vec<String> {
        self.chunks.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.chunks.iter().map(|(c, n)| (c.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl FromIterator<(String, String)> for FileMetadata {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            chunks: iter.into_iter().collect(),
        }
    }
}
