//! Error Taxonomy
//!
//! Typed errors for every failure a caller can act on. Services convert these
//! into HTTP responses; the client surfaces them verbatim so an operator can
//! decide whether a whole-operation retry makes sense.

use thiserror::Error;

/// Start-up configuration problems. These are logged and the process keeps
/// running in a degraded state instead of exiting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not valid JSON: {source}")]
    Unparseable {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{name} does not list any addresses")]
    Empty { name: &'static str },
    #[error("{name} contains an invalid address: {address:?}")]
    InvalidAddress { name: &'static str, address: String },
}

/// Failures of a single placement decision (node or cluster tier).
#[derive(Debug, Error)]
pub enum PlacementError {
    /// Selection found no alive candidate.
    #[error("No available {tier}s ({reachable} of {configured} reachable)")]
    Unavailable {
        tier: &'static str,
        configured: usize,
        reachable: usize,
    },
    /// The chosen target rejected the chunk or could not be reached.
    /// No failover to the next candidate is attempted.
    #[error("Forwarding chunk {chunk_id} to {target} failed: {reason}")]
    Forwarding {
        target: String,
        chunk_id: String,
        reason: String,
    },
}

/// Failures of the chunk store behind a storage node.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid chunk id {0:?}")]
    InvalidChunkId(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("invalid filename {0:?}")]
    InvalidFilename(String),
    #[error("metadata for {0} already exists")]
    AlreadyExists(String),
    #[error("metadata for {filename} is corrupt: {source}")]
    Corrupt {
        filename: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures reading or persisting the search index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("search index at {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("search index could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors returned by client-side file operations (upload, download, delete).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("No metadata for {0}")]
    NotFound(String),
    #[error("File {0} already exists")]
    AlreadyExists(String),
    #[error("Upload of {filename} failed for chunks {failed:?}")]
    UploadFailed {
        filename: String,
        failed: Vec<String>,
    },
    #[error("Couldn't delete chunks of {filename}: {failed:?}")]
    PartialDelete {
        filename: String,
        failed: Vec<String>,
    },
    #[error("Fetching chunk {chunk_id} of {filename} failed: {reason}")]
    DownloadFailed {
        filename: String,
        chunk_id: String,
        reason: String,
    },
    #[error("Chunk {0} missing during reconstruction")]
    MissingChunk(String),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
